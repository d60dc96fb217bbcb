use std::path::Path;
use serde::de::DeserializeOwned;
use crate::errors::LoadError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str, origin: &Path) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let json_path = err.path().to_string();
            Err(LoadError::Json {
                path: origin.to_path_buf(),
                json_path,
                message: err.into_inner().to_string(),
            })
        }
    }
}

/// Read a whole file and deserialize it, keeping the failing JSON path.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_str_with_path(&source, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn error_names_the_failing_path() {
        let src = r#"{"a": {"b": "not a number"}}"#;
        let result = from_str_with_path::<BTreeMap<String, BTreeMap<String, u32>>>(src, Path::new("x.json"));
        match result {
            Err(LoadError::Json { json_path, .. }) => assert_eq!(json_path, "a.b"),
            other => panic!("expected a JSON error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_json_file::<serde_json::Value>(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
