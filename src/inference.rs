//! Structural schema inference over a corpus of example documents.
//!
//! Every observed value is turned into a one-sample schema ([`observe_value`])
//! and folded into the accumulated schema with [`join`]. Nothing is mutated in
//! place: each join returns a fresh node.
//!
//! - `type` joins to the dominant [`JsonType`], so the result does not depend
//!   on the order files are visited in.
//! - `children` join as a key union, recursing on shared keys.
//! - `values` join as a deduplicated union (first-seen order).
//! - Array elements that are objects are flattened onto the array node's own
//!   children; scalar elements feed the array node's value set.
pub mod corpus;
pub mod node;

use serde_json::{Map, Value};
use tracing::debug;

pub use node::{Children, JsonType, SchemaForest, SchemaNode, Shape};

// ------------------------------ Classify --------------------------------- //

pub fn infer_type(v: &Value) -> JsonType {
    match v {
        Value::Null => JsonType::Null,
        Value::Array(_) => JsonType::Array,
        Value::Object(_) => JsonType::Object,
        Value::String(_) => JsonType::String,
        Value::Number(_) => JsonType::Number,
        Value::Bool(_) => JsonType::Boolean,
    }
}

// ------------------------------ Observe ---------------------------------- //

pub fn observe_value(v: &Value) -> SchemaNode {
    match v {
        Value::Null => SchemaNode::new(JsonType::Null, Shape::Unknown),
        Value::Object(m) => observe_object(m),
        Value::Array(xs) => observe_array(xs),
        scalar => SchemaNode::new(
            infer_type(scalar),
            Shape::Leaf { values: vec![scalar.clone()] },
        ),
    }
}

fn observe_object(map: &Map<String, Value>) -> SchemaNode {
    let mut children = Children::new();
    for (k, v) in map {
        children.insert(k.clone(), observe_value(v));
    }
    SchemaNode::new(JsonType::Object, Shape::Container { children })
}

fn observe_array(xs: &[Value]) -> SchemaNode {
    let mut children: Option<Children> = None;
    let mut values: Option<Vec<Value>> = None;

    for el in xs {
        match el {
            Value::Object(m) => {
                let fields = children.get_or_insert_with(Children::new);
                for (k, v) in m {
                    let merged = merge_schema(fields.get(k), v);
                    fields.insert(k.clone(), merged);
                }
            }
            // nested arrays and nulls have no slot of their own
            Value::Array(_) | Value::Null => {}
            scalar => push_unique(values.get_or_insert_with(Vec::new), scalar),
        }
    }

    // empty arrays (or arrays of nulls) still read as containers
    if children.is_none() && values.is_none() {
        children = Some(Children::new());
    }

    SchemaNode::new(JsonType::Array, Shape::from_parts(children, values))
}

fn push_unique(values: &mut Vec<Value>, v: &Value) {
    if !values.contains(v) {
        values.push(v.clone());
    }
}

// -------------------------------- Join (⊔) -------------------------------- //

pub fn join(a: &SchemaNode, b: &SchemaNode) -> SchemaNode {
    let ty = a.ty.max(b.ty);

    let children = match (a.children(), b.children()) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => Some(join_children(x, y)),
    };

    let values = match (a.values(), b.values()) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.to_vec()),
        (Some(x), Some(y)) => Some(join_values(x, y)),
    };

    SchemaNode::new(ty, Shape::from_parts(children, values))
}

fn join_children(a: &Children, b: &Children) -> Children {
    let mut out = Children::with_capacity(a.len().max(b.len()));

    // merge keys from a
    for (k, na) in a {
        let merged = match b.get(k) {
            None => na.clone(),
            Some(nb) => join(na, nb),
        };
        out.insert(k.clone(), merged);
    }
    // add keys only in b
    for (k, nb) in b {
        if !out.contains_key(k) {
            out.insert(k.clone(), nb.clone());
        }
    }

    out
}

fn join_values(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut out = a.to_vec();
    for v in b {
        push_unique(&mut out, v);
    }
    out
}

/// Fold one observed value into an optional prior schema.
pub fn merge_schema(existing: Option<&SchemaNode>, value: &Value) -> SchemaNode {
    let observed = observe_value(value);
    match existing {
        None => observed,
        Some(prior) => join(prior, &observed),
    }
}

// ------------------------------- Front API -------------------------------- //

/// Accumulates one schema root per top-level document key.
#[derive(Debug, Default)]
pub struct Inference { forest: SchemaForest }

impl Inference {
    pub fn new() -> Self { Self::default() }

    pub fn observe_document(&mut self, doc: &Value) {
        let Value::Object(map) = doc else {
            debug!(kind = %infer_type(doc), "skipping document without top-level object");
            return;
        };
        for (k, v) in map {
            let merged = merge_schema(self.forest.get(k), v);
            self.forest.insert(k.clone(), merged);
        }
    }

    pub fn solve(self) -> SchemaForest {
        self.forest
    }
}

pub fn build_forest<'a, I>(documents: I) -> SchemaForest
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut inf = Inference::new();
    for doc in documents {
        inf.observe_document(doc);
    }
    inf.solve()
}

// ------------------------------- Tests ------------------------------------ //
