//! Item names and descriptions from the game's `.lang` resource.
//!
//! Lines look like `items.<id>.name = <value>` or
//! `items.<id>.description = <value>`; everything else is ignored.
use std::ops::Range;
use std::path::Path;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{error, info};

use crate::completion::{Completion, CompletionKind};

static ITEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^items\.([A-Za-z0-9_]+)\.(name|description)\s*=\s*(.+)$")
        .expect("item line pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Item {
    fn empty(id: &str) -> Self {
        Self { id: id.to_owned(), name: String::new(), description: String::new() }
    }

    pub fn hover_markdown(&self) -> String {
        format!("### {}\n\n{}", self.name, self.description)
    }

    pub fn completion(&self) -> Completion {
        Completion {
            label: self.id.clone(),
            kind: CompletionKind::Item,
            detail: Some(self.name.clone()),
            documentation: Some(self.description.clone()),
            filter_text: Some(format!("{} {}", self.id, self.name)),
            insert_text: self.id.clone(),
            sort_text: format!("2_{}", self.id),
            replace: None,
        }
    }
}

/// Items keyed by id, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    items: IndexMap<String, Item>,
}

impl ItemCatalog {
    pub fn parse(source: &str) -> Self {
        let mut items = IndexMap::<String, Item>::new();
        for line in source.lines() {
            let Some(caps) = ITEM_LINE.captures(line) else { continue };
            let (id, field, value) = (&caps[1], &caps[2], &caps[3]);
            let item = items.entry(id.to_owned()).or_insert_with(|| Item::empty(id));
            match field {
                "name" => item.name = value.to_owned(),
                _ => item.description = value.to_owned(),
            }
        }
        Self { items }
    }

    /// Read the catalog from disk; an unreadable file yields an empty catalog.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(source) => {
                let catalog = Self::parse(&source);
                info!(path = %path.display(), items = catalog.len(), "loaded item catalog");
                catalog
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to read item metadata");
                Self::default()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn completions(&self) -> Vec<Completion> {
        self.iter().map(Item::completion).collect()
    }

    /// Hover text and range for the identifier under `offset`.
    pub fn hover(&self, text: &str, offset: usize) -> Option<(String, Range<usize>)> {
        let range = word_at(text, offset)?;
        let item = self.get(&text[range.clone()])?;
        Some((item.hover_markdown(), range))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte range of the identifier touching `offset`.
pub fn word_at(text: &str, offset: usize) -> Option<Range<usize>> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word_char(c))
        .last()
        .map_or(offset, |(i, _)| i);
    let end = text[offset..]
        .char_indices()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(text.len(), |(i, _)| offset + i);
    (start < end).then_some(start..end)
}
