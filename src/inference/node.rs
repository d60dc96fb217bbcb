use std::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name → schema, in first-observed order.
pub type Children = IndexMap<String, SchemaNode>;

/// Top-level document key → schema root, for one document category.
pub type SchemaForest = IndexMap<String, SchemaNode>;

/// Observed JSON shape. Declaration order is the dominance order used by
/// [`super::join`]: containers win over scalars, `null` loses to everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node knows about its location beyond the type tag.
///
/// `Mixed` is the legal outcome of documents that disagree (an object in one
/// file, a string in another); `Unknown` is a location that only ever held
/// `null` or nested arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Shape {
    #[default]
    Unknown,
    Leaf { values: Vec<Value> },
    Container { children: Children },
    Mixed { children: Children, values: Vec<Value> },
}

impl Shape {
    pub fn from_parts(children: Option<Children>, values: Option<Vec<Value>>) -> Self {
        match (children, values) {
            (None, None) => Shape::Unknown,
            (None, Some(values)) => Shape::Leaf { values },
            (Some(children), None) => Shape::Container { children },
            (Some(children), Some(values)) => Shape::Mixed { children, values },
        }
    }

    pub fn into_parts(self) -> (Option<Children>, Option<Vec<Value>>) {
        match self {
            Shape::Unknown => (None, None),
            Shape::Leaf { values } => (None, Some(values)),
            Shape::Container { children } => (Some(children), None),
            Shape::Mixed { children, values } => (Some(children), Some(values)),
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Shape::Container { children } | Shape::Mixed { children, .. } => Some(children),
            Shape::Unknown | Shape::Leaf { .. } => None,
        }
    }

    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Shape::Leaf { values } | Shape::Mixed { values, .. } => Some(values),
            Shape::Unknown | Shape::Container { .. } => None,
        }
    }
}

/// Structural schema for one JSON location.
///
/// Persisted as `{"type": ..., "children": {...}, "values": [...]}` with the
/// last two omitted when absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSchemaNode", into = "RawSchemaNode")]
pub struct SchemaNode {
    pub ty: JsonType,
    pub shape: Shape,
}

impl SchemaNode {
    pub fn new(ty: JsonType, shape: Shape) -> Self {
        Self { ty, shape }
    }

    pub fn children(&self) -> Option<&Children> {
        self.shape.children()
    }

    pub fn values(&self) -> Option<&[Value]> {
        self.shape.values()
    }

    pub fn child(&self, key: &str) -> Option<&SchemaNode> {
        self.children()?.get(key)
    }
}

#[derive(Serialize, Deserialize)]
struct RawSchemaNode {
    #[serde(rename = "type")]
    ty: JsonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Children>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
}

impl From<RawSchemaNode> for SchemaNode {
    fn from(raw: RawSchemaNode) -> Self {
        SchemaNode::new(raw.ty, Shape::from_parts(raw.children, raw.values))
    }
}

impl From<SchemaNode> for RawSchemaNode {
    fn from(node: SchemaNode) -> Self {
        let (children, values) = node.shape.into_parts();
        RawSchemaNode { ty: node.ty, children, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persisted_form_omits_absent_parts() {
        let node = SchemaNode::new(JsonType::String, Shape::Leaf { values: vec![json!("x")] });
        let out = serde_json::to_value(&node).unwrap();
        assert_eq!(out, json!({"type": "string", "values": ["x"]}));
    }

    #[test]
    fn persisted_form_reads_back_into_variants() {
        let node: SchemaNode = serde_json::from_value(json!({
            "type": "object",
            "children": {"b": {"type": "string", "values": ["x", "y"]}},
            "values": ["stray"]
        })).unwrap();
        assert!(matches!(node.shape, Shape::Mixed { .. }));
        assert_eq!(node.child("b").and_then(|b| b.values()).map(|v| v.len()), Some(2));

        let bare: SchemaNode = serde_json::from_value(json!({"type": "null"})).unwrap();
        assert_eq!(bare.shape, Shape::Unknown);
    }

    #[test]
    fn containers_dominate_scalars() {
        assert!(JsonType::Object > JsonType::Array);
        assert!(JsonType::Array > JsonType::String);
        assert!(JsonType::Boolean > JsonType::Null);
    }
}
