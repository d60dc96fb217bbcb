//! CLI: generate schemas offline, query completion/hover, or serve the LSP.
use std::path::{Path, PathBuf};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::error;

use crate::errors::CorpusError;
use crate::inference::{corpus, SchemaForest};
use crate::items::ItemCatalog;
use crate::registry::SchemaRegistry;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// editor assistance for Hytale JSON: schema inference, completion and hover
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer a schema forest from every .json file below FOLDER and write it to schema/FILENAME
    Generate(GenerateArgs),
    /// print completion candidates at a byte offset as JSON
    Complete(QueryArgs),
    /// print item hover markdown at a byte offset
    Hover(QueryArgs),
    /// report whether a workspace is a Hytale project
    Detect(DetectArgs),
    /// run the language server over stdio
    Serve(ResourceSettings),
}

#[derive(Args, Debug, Clone)]
struct ResourceSettings {
    /// folder holding the persisted schema forests (and an optional categories.json)
    #[arg(long, default_value = "schema")]
    schema_dir: PathBuf,

    /// item metadata file (`items.<id>.name = ...` lines)
    #[arg(long, default_value = "data/server.lang")]
    lang_file: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// corpus root, searched recursively
    folder: PathBuf,

    /// output file name inside ./schema
    filename: String,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// JSON document to query; its path also selects the schema category
    file: PathBuf,

    /// cursor position as a byte offset into the file
    #[arg(long)]
    offset: usize,

    #[command(flatten)]
    resources: ResourceSettings,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// workspace root (current directory if omitted)
    workspace: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ResourceSettings {
    fn load_registry(&self) -> SchemaRegistry {
        SchemaRegistry::load(&self.schema_dir)
    }

    fn load_items(&self) -> ItemCatalog {
        ItemCatalog::load(&self.lang_file)
    }
}

impl QueryArgs {
    fn read_document(&self) -> anyhow::Result<String> {
        let text = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        anyhow::ensure!(
            self.offset <= text.len(),
            "offset {} is past the end of {} ({} bytes)",
            self.offset,
            self.file.display(),
            text.len(),
        );
        Ok(text)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let forest = match corpus::build_from_dir(&target.folder) {
                    Ok(forest) => forest,
                    Err(error @ CorpusError::MissingRoot(_)) => {
                        error!(%error, "writing an empty schema");
                        SchemaForest::new()
                    }
                    Err(error) => return Err(error.into()),
                };
                let out = Path::new("schema").join(&target.filename);
                write_forest(&out, &forest)?;
                eprintln!(
                    "{} {} ({} top-level keys)",
                    "wrote".green().bold(),
                    out.display(),
                    forest.len(),
                );
            }
            Command::Complete(target) => {
                let text = target.read_document()?;
                let registry = target.resources.load_registry();
                let items = target.resources.load_items();
                let document_path = target.file.to_string_lossy();
                let completions = crate::completion::complete(
                    &registry,
                    Some(&items),
                    &document_path,
                    &text,
                    target.offset,
                );
                println!("{}", serde_json::to_string_pretty(&completions)?);
            }
            Command::Hover(target) => {
                let text = target.read_document()?;
                let items = target.resources.load_items();
                match items.hover(&text, target.offset) {
                    Some((markdown, _)) => println!("{markdown}"),
                    None => eprintln!("{}", "no item under cursor".yellow()),
                }
            }
            Command::Detect(target) => {
                let workspace = match &target.workspace {
                    Some(path) => path.clone(),
                    None => std::env::current_dir().context("failed to resolve current directory")?,
                };
                if crate::project::is_hytale_project(Some(&workspace)) {
                    println!("{} {}", "hytale project:".green().bold(), workspace.display());
                } else {
                    println!("{} {}", "not a hytale project:".yellow().bold(), workspace.display());
                }
            }
            Command::Serve(resources) => {
                let registry = resources.load_registry();
                let items = resources.load_items();
                let runtime = tokio::runtime::Runtime::new()
                    .context("failed to start async runtime")?;
                runtime.block_on(crate::lsp::run_server(registry, items));
            }
        }
        Ok(())
    }
}

/// Log to stderr (stdout carries LSP traffic and command output).
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_forest(out: &Path, forest: &SchemaForest) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let source = serde_json::to_string_pretty(forest)?;
    std::fs::write(out, source).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_requires_both_arguments() {
        assert!(CommandLineInterface::try_parse_from(["hytale-assist", "generate"]).is_err());
        assert!(CommandLineInterface::try_parse_from(["hytale-assist", "generate", "corpus"]).is_err());
        assert!(
            CommandLineInterface::try_parse_from(["hytale-assist", "generate", "corpus", "Items.json"]).is_ok()
        );
    }

    #[test]
    fn query_defaults_resource_locations() {
        let cli = CommandLineInterface::try_parse_from([
            "hytale-assist", "complete", "Server/Item/Items/a.json", "--offset", "3",
        ])
        .unwrap();
        let Command::Complete(args) = cli.cmd else { panic!("expected complete") };
        assert_eq!(args.offset, 3);
        assert_eq!(args.resources.schema_dir, PathBuf::from("schema"));
        assert_eq!(args.resources.lang_file, PathBuf::from("data/server.lang"));
    }

    #[test]
    fn written_forest_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/Items.json");
        let forest = crate::inference::build_forest(&[serde_json::json!({"Items": {"a": 1}})]);
        write_forest(&out, &forest).unwrap();
        let back: SchemaForest = crate::path_de::read_json_file(&out).unwrap();
        assert_eq!(back, forest);
    }

    #[test]
    fn offset_past_end_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.json");
        std::fs::write(&file, "{}").unwrap();
        let args = QueryArgs {
            file,
            offset: 10,
            resources: ResourceSettings {
                schema_dir: PathBuf::from("schema"),
                lang_file: PathBuf::from("data/server.lang"),
            },
        };
        assert!(args.read_document().is_err());
    }
}
