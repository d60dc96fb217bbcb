//! Document category table: path fragment → schema forest, first match wins.
use std::path::Path;
use serde::Deserialize;
use tracing::{info, warn};

use crate::inference::SchemaForest;
use crate::path_de;

/// Built-in table, used when the schema folder has no `categories.json`.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Server/Item/Items", "Items.json"),
    ("Server/NPC/Roles", "Roles.json"),
];

pub const CATEGORY_TABLE_FILE: &str = "categories.json";

/// One row of `categories.json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CategoryEntry {
    pub pattern: String,
    pub schema: String,
}

#[derive(Clone, Debug)]
pub struct Category {
    pub pattern: String,
    pub name: String,
    pub forest: SchemaForest,
}

#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    categories: Vec<Category>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        pattern: impl Into<String>,
        name: impl Into<String>,
        forest: SchemaForest,
    ) -> &mut Self {
        self.categories.push(Category {
            pattern: pattern.into(),
            name: name.into(),
            forest,
        });
        self
    }

    /// Load every category whose schema file exists under `schema_dir`.
    ///
    /// Missing or broken schema files are skipped with a warning; a broken
    /// `categories.json` falls back to [`DEFAULT_CATEGORIES`].
    pub fn load(schema_dir: &Path) -> Self {
        let mut registry = Self::new();
        for entry in category_table(schema_dir) {
            let path = schema_dir.join(&entry.schema);
            match path_de::read_json_file::<SchemaForest>(&path) {
                Ok(forest) => {
                    let name = Path::new(&entry.schema)
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| entry.schema.clone());
                    registry.register(entry.pattern, name, forest);
                }
                Err(error) => warn!(%error, pattern = %entry.pattern, "skipping schema category"),
            }
        }
        info!(dir = %schema_dir.display(), categories = registry.len(), "loaded schema registry");
        registry
    }

    /// First category whose fragment occurs in `document_path`.
    pub fn select(&self, document_path: &str) -> Option<&Category> {
        let normalized = document_path.replace('\\', "/");
        self.categories
            .iter()
            .find(|category| normalized.contains(&category.pattern))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}

fn category_table(schema_dir: &Path) -> Vec<CategoryEntry> {
    let defaults = || {
        DEFAULT_CATEGORIES
            .iter()
            .map(|(pattern, schema)| CategoryEntry {
                pattern: (*pattern).to_owned(),
                schema: (*schema).to_owned(),
            })
            .collect::<Vec<_>>()
    };
    let table_path = schema_dir.join(CATEGORY_TABLE_FILE);
    if !table_path.is_file() {
        return defaults();
    }
    match path_de::read_json_file::<Vec<CategoryEntry>>(&table_path) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%error, "falling back to built-in category table");
            defaults()
        }
    }
}
