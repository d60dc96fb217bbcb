//! Schema-guided completion: walk a forest along the cursor path, then offer
//! either the literals known for that position or, when a key is being
//! written, the property names not yet written in the enclosing object.
use std::ops::Range;
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::inference::{infer_type, Children, JsonType, SchemaForest, SchemaNode};
use crate::items::ItemCatalog;
use crate::path::{cursor_context, CursorContext, PathStep, Slot};
use crate::registry::SchemaRegistry;
use crate::syntax::SyntaxTree;

/// How many known values a property's documentation previews.
const VALUE_PREVIEW_MAX: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Value,
    Property,
    Item,
}

/// One candidate, independent of any editor protocol.
///
/// `sort_text` orders literal values before property names before item names.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Completion {
    pub label: String,
    pub kind: CompletionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_text: Option<String>,
    pub insert_text: String,
    pub sort_text: String,
    /// Byte range the insert text replaces; insert at the cursor when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<Range<usize>>,
}

// ------------------------------- Navigation ------------------------------- //

/// Where a path walk stopped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolved<'a> {
    /// The category's forest: a plain key → schema mapping.
    Forest(&'a SchemaForest),
    Node(&'a SchemaNode),
    /// An index into an array of scalars: its literal set.
    Elements(&'a [Value]),
    /// An index into an array of objects: the flattened element fields.
    Fields(&'a Children),
}

impl<'a> Resolved<'a> {
    fn step(self, step: &PathStep) -> Option<Resolved<'a>> {
        match (self, step) {
            (Resolved::Node(node), PathStep::Key(key)) => node.child(key).map(Resolved::Node),
            (Resolved::Node(node), PathStep::Index(_)) if node.ty == JsonType::Array => {
                element_view(node)
            }
            (Resolved::Forest(map) | Resolved::Fields(map), PathStep::Key(key)) => {
                map.get(key).map(Resolved::Node)
            }
            (Resolved::Node(_), PathStep::Index(_))
            | (Resolved::Forest(_) | Resolved::Fields(_), PathStep::Index(_))
            | (Resolved::Elements(_), _) => None,
        }
    }

    /// Literal values offered at this position, if any.
    pub fn values(self) -> Option<&'a [Value]> {
        match self {
            Resolved::Node(node) => node.values(),
            Resolved::Elements(values) => Some(values),
            Resolved::Forest(_) | Resolved::Fields(_) => None,
        }
    }

    /// Candidate property names at this position, if any.
    pub fn properties(self) -> Option<&'a Children> {
        match self {
            Resolved::Forest(map) | Resolved::Fields(map) => Some(map),
            Resolved::Node(node) => node.children(),
            Resolved::Elements(_) => None,
        }
    }
}

fn element_view(node: &SchemaNode) -> Option<Resolved<'_>> {
    match (node.values(), node.children()) {
        (Some(values), _) if !values.is_empty() => Some(Resolved::Elements(values)),
        (_, Some(children)) => Some(Resolved::Fields(children)),
        _ => None,
    }
}

/// Walk `forest` along `path`, stopping at the first step that cannot be
/// followed (or an empty key). Returns the last position reached.
pub fn resolve_along_path<'a>(forest: &'a SchemaForest, path: &[PathStep]) -> Resolved<'a> {
    let mut current = Resolved::Forest(forest);
    for step in path {
        if step.is_empty() {
            break;
        }
        match current.step(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

// -------------------------------- Planning -------------------------------- //

/// Candidates for one cursor against one forest.
pub fn plan(forest: &SchemaForest, cursor: &CursorContext) -> Vec<Completion> {
    let resolved = resolve_along_path(forest, &cursor.path);

    if let Some(values) = resolved.values().filter(|v| !v.is_empty()) {
        return value_completions(values, cursor.replace.clone());
    }
    // a value is being written: names of the position's fields do not fit there
    if cursor.slot == Slot::Value {
        return Vec::new();
    }
    match resolved.properties() {
        Some(children) => property_completions(children, &cursor.existing_keys, cursor.replace.clone()),
        None => Vec::new(),
    }
}

fn value_completions(values: &[Value], replace: Option<Range<usize>>) -> Vec<Completion> {
    let mut literals: Vec<(String, JsonType)> = values
        .iter()
        .map(|v| (v.to_string(), infer_type(v)))
        .collect();
    literals.sort();
    literals.dedup_by(|a, b| a.0 == b.0);

    literals
        .into_iter()
        .enumerate()
        .map(|(rank, (literal, ty))| Completion {
            label: literal.clone(),
            kind: CompletionKind::Value,
            detail: Some(ty.to_string()),
            documentation: None,
            filter_text: Some(literal.clone()),
            insert_text: literal,
            sort_text: format!("0_{rank:05}"),
            replace: replace.clone(),
        })
        .collect()
}

fn property_completions(
    children: &Children,
    existing: &IndexSet<String>,
    replace: Option<Range<usize>>,
) -> Vec<Completion> {
    children
        .iter()
        .filter(|(name, _)| !existing.contains(name.as_str()))
        .map(|(name, child)| {
            let quoted = Value::String(name.clone()).to_string();
            Completion {
                label: name.clone(),
                kind: CompletionKind::Property,
                detail: Some(child.ty.to_string()),
                documentation: property_documentation(child),
                filter_text: Some(quoted.clone()),
                insert_text: quoted,
                sort_text: format!("1_{name}"),
                replace: replace.clone(),
            }
        })
        .collect()
}

fn property_documentation(child: &SchemaNode) -> Option<String> {
    let values = child.values().filter(|v| !v.is_empty())?;
    let mut preview: Vec<String> = values
        .iter()
        .take(VALUE_PREVIEW_MAX)
        .map(|v| format!("`{v}`"))
        .collect();
    if values.len() > VALUE_PREVIEW_MAX {
        preview.push(format!("… {} more", values.len() - VALUE_PREVIEW_MAX));
    }
    Some(format!("Known values: {}", preview.join(", ")))
}

// -------------------------------- Pipeline -------------------------------- //

/// Full request: pick the category for `document_path`, plan schema
/// candidates at `offset`, then append item candidates.
pub fn complete(
    registry: &SchemaRegistry,
    items: Option<&ItemCatalog>,
    document_path: &str,
    text: &str,
    offset: usize,
) -> Vec<Completion> {
    let mut out = Vec::new();

    match registry.select(document_path) {
        Some(category) => {
            let tree = SyntaxTree::parse(text);
            let cursor = cursor_context(&tree, offset);
            debug!(category = %category.name, path = ?cursor.path, "planning schema completions");
            out.extend(plan(&category.forest, &cursor));
        }
        None => debug!(document_path, "no schema category"),
    }

    if let Some(items) = items {
        out.extend(items.completions());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::build_forest;
    use serde_json::json;

    fn forest() -> SchemaForest {
        serde_json::from_value(json!({
            "a": {"type": "object", "children": {
                "b": {"type": "string", "values": ["y", "x"]},
                "c": {"type": "number", "values": [3]},
                "d": {"type": "object", "children": {}}
            }},
            "tags": {"type": "array", "values": ["fire", "ice"]},
            "drops": {"type": "array", "children": {
                "item": {"type": "string", "values": ["Bone"]},
                "count": {"type": "number"}
            }}
        }))
        .unwrap()
    }

    fn cursor_in(text_with_marker: &str) -> (String, usize) {
        let offset = text_with_marker.find('|').unwrap();
        (text_with_marker.replacen('|', "", 1), offset)
    }

    fn plan_at(text_with_marker: &str) -> Vec<Completion> {
        let (text, offset) = cursor_in(text_with_marker);
        let tree = SyntaxTree::parse(&text);
        plan(&forest(), &cursor_context(&tree, offset))
    }

    fn labels(items: &[Completion]) -> Vec<&str> {
        items.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn resolves_leaf_along_keys() {
        let forest = forest();
        let path = [PathStep::from("a"), PathStep::from("b")];
        let resolved = resolve_along_path(&forest, &path);
        assert_eq!(resolved.values(), Some(&[json!("y"), json!("x")][..]));
    }

    #[test]
    fn stops_at_last_reachable_node() {
        let forest = forest();
        let path = [PathStep::from("a"), PathStep::from("zzz"), PathStep::from("b")];
        assert!(matches!(
            resolve_along_path(&forest, &path),
            Resolved::Node(node) if node.children().is_some_and(|c| c.contains_key("b"))
        ));
        assert!(matches!(resolve_along_path(&forest, &[]), Resolved::Forest(_)));
        assert!(matches!(
            resolve_along_path(&forest, &[PathStep::from(0)]),
            Resolved::Forest(_)
        ));
    }

    #[test]
    fn empty_key_terminates_descent() {
        let forest = forest();
        let path = [PathStep::from("a"), PathStep::from(""), PathStep::from("b")];
        assert!(matches!(resolve_along_path(&forest, &path), Resolved::Node(n) if n.ty == JsonType::Object));
    }

    #[test]
    fn index_into_scalar_array_selects_element_values() {
        let forest = forest();
        let path = [PathStep::from("tags"), PathStep::from(1)];
        assert_eq!(
            resolve_along_path(&forest, &path),
            Resolved::Elements(&[json!("fire"), json!("ice")])
        );
    }

    #[test]
    fn index_into_object_array_selects_element_fields() {
        let forest = forest();
        let path = [PathStep::from("drops"), PathStep::from(0), PathStep::from("item")];
        let resolved = resolve_along_path(&forest, &path);
        assert_eq!(resolved.values(), Some(&[json!("Bone")][..]));

        let fields = resolve_along_path(&forest, &path[..2]);
        assert!(matches!(fields, Resolved::Fields(map) if map.contains_key("count")));
    }

    #[test]
    fn index_into_non_array_stops() {
        let forest = forest();
        let path = [PathStep::from("a"), PathStep::from(0)];
        assert!(matches!(resolve_along_path(&forest, &path), Resolved::Node(n) if n.ty == JsonType::Object));
    }

    #[test]
    fn offers_quoted_literals_sorted() {
        let items = plan_at(r#"{"a": {"b": "|"}}"#);
        assert_eq!(labels(&items), [r#""x""#, r#""y""#]);
        assert!(items.iter().all(|c| c.kind == CompletionKind::Value));
        assert!(items[0].sort_text < items[1].sort_text);
        assert!(items[0].replace.is_some());
    }

    #[test]
    fn offers_literals_after_a_bare_colon() {
        let items = plan_at(r#"{"a": {"c": |}}"#);
        assert_eq!(labels(&items), ["3"]);
        assert_eq!(items[0].detail.as_deref(), Some("number"));
    }

    #[test]
    fn excludes_keys_already_written() {
        let items = plan_at(r#"{"a": {"b": "x", | }}"#);
        assert_eq!(labels(&items), ["c", "d"]);
        assert!(items.iter().all(|c| c.kind == CompletionKind::Property));
        assert_eq!(items[0].insert_text, r#""c""#);
        assert_eq!(items[1].detail.as_deref(), Some("object"));
    }

    #[test]
    fn key_being_typed_is_still_offered() {
        let items = plan_at(r#"{"a": {"c": 1, "b|": 2}}"#);
        assert_eq!(labels(&items), ["b", "d"]);
        assert!(items[0].replace.is_some());
    }

    #[test]
    fn root_offers_forest_keys() {
        let items = plan_at(r#"{"tags": [], |}"#);
        assert_eq!(labels(&items), ["a", "drops"]);
    }

    #[test]
    fn array_positions_offer_element_completions() {
        assert_eq!(labels(&plan_at(r#"{"tags": ["|"]}"#)), [r#""fire""#, r#""ice""#]);
        assert_eq!(labels(&plan_at(r#"{"tags": [|]}"#)), [r#""fire""#, r#""ice""#]);
        assert_eq!(labels(&plan_at(r#"{"drops": [{"item": "Bone", |}]}"#)), ["count"]);
    }

    #[test]
    fn property_docs_preview_known_values() {
        let items = plan_at(r#"{"a": {|}}"#);
        let b = items.iter().find(|c| c.label == "b").unwrap();
        assert_eq!(b.documentation.as_deref(), Some(r#"Known values: `"y"`, `"x"`"#));
        let d = items.iter().find(|c| c.label == "d").unwrap();
        assert!(d.documentation.is_none());
    }

    #[test]
    fn broken_documents_degrade_quietly() {
        assert_eq!(labels(&plan_at("|")), ["a", "tags", "drops"]);
        assert_eq!(labels(&plan_at(r#"{"a": {"b": "x", "c": 1, "d": {}, |"#)), Vec::<&str>::new());
        assert!(!plan_at(r#"{"a": {|"#).is_empty());
    }

    #[test]
    fn value_slots_never_offer_property_names() {
        let forest: SchemaForest = serde_json::from_value(json!({
            "a": {"type": "object", "children": {
                "b": {"type": "string"},
                "c": {"type": "string"}
            }},
            "b": {"type": "number", "values": [1]}
        }))
        .unwrap();
        let plan_in = |marked: &str| {
            let (text, offset) = cursor_in(marked);
            plan(&forest, &cursor_context(&SyntaxTree::parse(&text), offset))
        };

        assert!(plan_in(r#"{"b": 1, "a": "|"}"#).is_empty());
        // the outer object's `b` does not hide the inner one
        assert_eq!(labels(&plan_in(r#"{"b": 1, "a": {|}}"#)), ["b", "c"]);
    }

    #[test]
    fn deeply_nested_documents_complete_to_nothing() {
        let mut registry = SchemaRegistry::new();
        registry.register("Server/Item/Items", "Items", forest());
        let depth = 10_000;
        let open = "[".repeat(depth);
        assert!(complete(&registry, None, "Server/Item/Items/x.json", &open, depth).is_empty());

        let closed = format!("{open}{}", "]".repeat(depth));
        assert!(complete(&registry, None, "Server/Item/Items/x.json", &closed, depth).is_empty());
    }

    #[test]
    fn pipeline_selects_category_and_appends_items() {
        let mut registry = SchemaRegistry::new();
        registry.register("Server/Item/Items", "Items", forest());
        let catalog = ItemCatalog::parse("items.Bone.name = Bone\n");

        let (text, offset) = cursor_in(r#"{"a": {"b": "|"}}"#);
        let out = complete(&registry, Some(&catalog), "mod/Server/Item/Items/x.json", &text, offset);
        let kinds: Vec<_> = out.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, [CompletionKind::Value, CompletionKind::Value, CompletionKind::Item]);

        let mut sorted = out.clone();
        sorted.sort_by(|a, b| a.sort_text.cmp(&b.sort_text));
        assert_eq!(sorted, out);

        let elsewhere = complete(&registry, Some(&catalog), "mod/Common/x.json", &text, offset);
        assert_eq!(labels(&elsewhere), ["Bone"]);
        assert!(complete(&registry, None, "mod/Common/x.json", &text, offset).is_empty());
    }

    #[test]
    fn built_forest_drives_completion_end_to_end() {
        let forest = build_forest(&[
            json!({"Quality": "Common", "Recipe": {"Input": [{"ItemId": "Wood", "Quantity": 2}]}}),
            json!({"Quality": "Rare"}),
        ]);
        let (text, offset) = cursor_in(r#"{"Quality": "C|", "Recipe": {"Input": [{}]}}"#);
        let tree = SyntaxTree::parse(&text);
        let values = plan(&forest, &cursor_context(&tree, offset));
        assert_eq!(labels(&values), [r#""Common""#, r#""Rare""#]);

        let (text, offset) = cursor_in(r#"{"Recipe": {"Input": [{|}]}}"#);
        let tree = SyntaxTree::parse(&text);
        let fields = plan(&forest, &cursor_context(&tree, offset));
        assert_eq!(labels(&fields), ["ItemId", "Quantity"]);
    }
}
