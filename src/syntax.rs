//! JSON syntax trees from tree-sitter, plus the few queries cursor analysis
//! needs on top of them.
//!
//! tree-sitter never fails a parse: broken input comes back as `ERROR` nodes
//! wrapping the tokens it could not place, and `MISSING` zero-width tokens
//! where it invented a closer. Open nodes (missing their closer) are treated
//! as reaching the cursor when it sits at their end, so typing at the end of
//! an unfinished document still lands inside it.
//!
//! Every walk here loops over children or a [`tree_sitter::TreeCursor`];
//! nothing recurses on document depth.
use tree_sitter::{Node, Parser, Tree};
use tracing::warn;

/// Node kinds of the JSON grammar.
pub mod kinds {
    pub const DOCUMENT: &str = "document";
    pub const OBJECT: &str = "object";
    pub const ARRAY: &str = "array";
    pub const PAIR: &str = "pair";
    pub const STRING: &str = "string";
    pub const STRING_CONTENT: &str = "string_content";
    pub const ESCAPE_SEQUENCE: &str = "escape_sequence";
    pub const NUMBER: &str = "number";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const NULL: &str = "null";
    pub const COMMENT: &str = "comment";
    pub const ERROR: &str = "ERROR";
}

/// Parsed text plus its tree. The tree is absent only when the grammar could
/// not be loaded, which every query treats as an empty document.
pub struct SyntaxTree {
    text: String,
    tree: Option<Tree>,
}

impl SyntaxTree {
    pub fn parse(text: &str) -> Self {
        let mut parser = Parser::new();
        let tree = match parser.set_language(&tree_sitter_json::LANGUAGE.into()) {
            Ok(()) => parser.parse(text, None),
            Err(error) => {
                warn!(%error, "failed to load the JSON grammar");
                None
            }
        };
        Self {
            text: text.to_owned(),
            tree,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The `document` node.
    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(Tree::root_node)
    }

    /// Source text of `node`.
    pub fn node_text(&self, node: Node<'_>) -> &str {
        self.text.get(node.byte_range()).unwrap_or_default()
    }

    /// Nodes from the root down to the deepest one at `offset`.
    ///
    /// A node holds `offset` when it starts at or before it and ends after it,
    /// or ends exactly at it while still open. Among siblings the first such
    /// node wins. The walk stops at literals (it does not enter strings).
    pub fn chain_at(&self, offset: usize) -> Vec<Node<'_>> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let mut chain = vec![root];
        let mut current = root;
        while !is_leaf(current) {
            let mut cursor = current.walk();
            let next = current
                .named_children(&mut cursor)
                .find(|child| child.kind() != kinds::COMMENT && holds(*child, offset));
            match next {
                Some(child) => {
                    chain.push(child);
                    current = child;
                }
                None => break,
            }
        }
        chain
    }

    /// Deepest node at `offset`; `None` when only the document holds it.
    pub fn node_at_offset(&self, offset: usize) -> Option<Node<'_>> {
        self.chain_at(offset)
            .pop()
            .filter(|node| node.kind() != kinds::DOCUMENT)
    }

    /// Decoded value of a `string` node (or of bare string content left in an
    /// `ERROR`). An unterminated string yields what was typed so far.
    pub fn string_value(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            kinds::STRING => {}
            kinds::STRING_CONTENT => return Some(decode(self.node_text(node))),
            _ => return None,
        }
        let raw = self.node_text(node);
        let inner = raw.strip_prefix('"').unwrap_or(raw);
        let inner = match is_closed(node) {
            true => inner.strip_suffix('"').unwrap_or(inner),
            false => inner,
        };
        Some(decode(inner))
    }

    /// Key of a `pair`, decoded.
    pub fn pair_key(&self, pair: Node<'_>) -> Option<String> {
        pair.child_by_field_name("key")
            .filter(|key| !key.is_missing())
            .and_then(|key| self.string_value(key))
    }
}

/// Whether `node` has everything that ends it: the closing `}`/`]`/`"` of a
/// container or string, a value for a pair. `ERROR` nodes are never closed.
pub fn is_closed(node: Node<'_>) -> bool {
    if node.is_missing() {
        return false;
    }
    let closer = match node.kind() {
        kinds::OBJECT => "}",
        kinds::ARRAY => "]",
        kinds::STRING => "\"",
        kinds::PAIR => {
            return node
                .child_by_field_name("value")
                .is_some_and(|value| value.kind() != kinds::PAIR && is_closed(value));
        }
        kinds::ERROR => return false,
        _ => return node.end_byte() > node.start_byte(),
    };
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.len() >= 2
        && children
            .last()
            .is_some_and(|last| last.kind() == closer && !last.is_missing())
}

/// Strings, numbers and the three keywords.
pub fn is_leaf(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        kinds::STRING
            | kinds::STRING_CONTENT
            | kinds::NUMBER
            | kinds::TRUE
            | kinds::FALSE
            | kinds::NULL
    )
}

fn holds(node: Node<'_>, offset: usize) -> bool {
    !node.is_missing()
        && node.start_byte() <= offset
        && (offset < node.end_byte() || (offset == node.end_byte() && !is_closed(node)))
}

fn decode(inner: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{inner}\"")).unwrap_or_else(|_| inner.to_owned())
}
