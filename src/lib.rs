//! Editor assistance for Hytale data/modding JSON files.
//!
//! - [`inference`] learns a structural schema forest from a folder of example
//!   documents (offline, see the `generate` subcommand).
//! - [`syntax`] + [`path`] turn a live, possibly broken document and a cursor
//!   offset into a JSON path and the keys already written around it.
//! - [`completion`] walks a forest along that path and plans candidates.
//! - [`registry`], [`items`] and [`project`] are the collaborators the editor
//!   front end ([`lsp`]) needs: category selection, item metadata and the
//!   activation gate.

pub mod completion;
pub mod errors;
pub mod inference;
pub mod items;
pub mod path;
pub mod path_de;
pub mod project;
pub mod registry;
pub mod syntax;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "lsp")]
pub mod lsp;

pub use completion::{complete, plan, resolve_along_path, Completion, CompletionKind, Resolved};
pub use errors::{CorpusError, LoadError};
pub use inference::{build_forest, infer_type, merge_schema, JsonType, SchemaForest, SchemaNode, Shape};
pub use items::{Item, ItemCatalog};
pub use path::{completion_path_at, cursor_context, existing_keys_at, path_at, CursorContext, JsonPath, PathStep, Slot};
pub use registry::{Category, SchemaRegistry};
pub use syntax::SyntaxTree;
