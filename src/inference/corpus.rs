//! Corpus traversal: every `*.json` file below a folder, parsed in parallel,
//! folded in path order.
use std::path::{Path, PathBuf};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{CorpusError, LoadError};
use crate::path_de::read_json_file;
use super::{build_forest, SchemaForest};

/// Read and parse every `.json` file below `root`, recursively.
///
/// Files that cannot be read or parsed are skipped with a warning naming the
/// file, logged from the calling thread. The documents come back in sorted
/// path order regardless of parse scheduling.
pub fn read_corpus(root: &Path) -> Result<Vec<Value>, CorpusError> {
    if !root.is_dir() {
        return Err(CorpusError::MissingRoot(root.to_path_buf()));
    }
    let source_paths = json_files(root)?;
    let loaded: Vec<Result<Value, LoadError>> = source_paths
        .par_iter()
        .map(|path| read_json_file::<Value>(path))
        .collect();
    let mut documents = Vec::with_capacity(loaded.len());
    for result in loaded {
        match result {
            Ok(document) => documents.push(document),
            Err(error) => warn!(%error, "skipping corpus file"),
        }
    }
    info!(
        root = %root.display(),
        files = source_paths.len(),
        parsed = documents.len(),
        "read corpus"
    );
    Ok(documents)
}

/// Build a schema forest from every document below `root`.
pub fn build_from_dir(root: &Path) -> Result<SchemaForest, CorpusError> {
    let documents = read_corpus(root)?;
    Ok(build_forest(&documents))
}

fn json_files(root: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let pattern = format!(
        "{}/**/*.json",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let mut out = Vec::<PathBuf>::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(p) if p.is_file() => out.push(p),
            Ok(_) => {}
            Err(error) => warn!(%error, "skipping unreadable corpus entry"),
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::JsonType;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    fn write(root: &Path, rel: &str, contents: impl AsRef<[u8]>) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Shared buffer the test subscriber formats into.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
        (out, logs)
    }

    fn warnings(logs: &str) -> Vec<&str> {
        logs.lines().filter(|line| line.contains("WARN")).collect()
    }

    #[test]
    fn malformed_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.json", r#"{"Items": {"sword": {"dmg": 5}}}"#);
        write(dir.path(), "bad.json", r#"{"Items": {"bow": "#);

        let (forest, logs) = with_logs(|| build_from_dir(dir.path()).unwrap());
        let items = &forest["Items"];
        let bad = dir.path().join("bad.json");
        let warned = warnings(&logs);
        assert_eq!(warned.len(), 1, "{logs}");
        assert!(warned[0].contains(&bad.display().to_string()), "{logs}");
        assert!(items.child("sword").is_some());
        assert!(items.child("bow").is_none());
        assert_eq!(items.child("sword").unwrap().child("dmg").unwrap().ty, JsonType::Number);
    }

    #[test]
    fn unreadable_files_are_skipped_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.json", r#"{"Good": 1}"#);
        write(dir.path(), "binary.json", [0xff, 0xfe, 0x00, 0x7b]);
        std::fs::create_dir_all(dir.path().join("folder.json")).unwrap();

        let (docs, logs) = with_logs(|| read_corpus(dir.path()).unwrap());
        assert_eq!(docs, [json!({"Good": 1})]);

        let warned = warnings(&logs);
        assert_eq!(warned.len(), 1, "{logs}");
        let binary = dir.path().join("binary.json");
        assert!(warned[0].contains(&binary.display().to_string()), "{logs}");
        assert!(warned[0].contains("failed to read"), "{logs}");
    }

    #[test]
    fn traversal_recurses_and_ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/b/c/deep.json", r#"{"Deep": true}"#);
        write(dir.path(), "top.json", r#"{"Top": "x"}"#);
        write(dir.path(), "notes.txt", r#"{"Ignored": 1}"#);
        write(dir.path(), "a/readme.md", "# nothing");

        let docs = read_corpus(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.contains(&json!({"Deep": true})));
        assert!(docs.contains(&json!({"Top": "x"})));
    }

    #[test]
    fn documents_come_back_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["c.json", "a.json", "b.json"].iter().enumerate() {
            write(dir.path(), name, &format!(r#"{{"Order": {i}}}"#));
        }
        let forest = build_from_dir(dir.path()).unwrap();
        assert_eq!(
            forest["Order"].values(),
            Some(&[json!(1), json!(2), json!(0)][..])
        );
    }

    #[test]
    fn missing_root_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = build_from_dir(&missing);
        assert!(matches!(result, Err(CorpusError::MissingRoot(_))));
    }
}
