//! Cursor → JSON path, and the keys already written around the cursor.
use std::fmt;
use std::ops::Range;
use indexmap::IndexSet;
use serde::Serialize;

use tree_sitter::Node;

use crate::syntax::{is_leaf, kinds, SyntaxTree};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl PathStep {
    pub fn is_empty(&self) -> bool {
        matches!(self, PathStep::Key(k) if k.is_empty())
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(k) => write!(f, "{k:?}"),
            PathStep::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_owned())
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

pub type JsonPath = Vec<PathStep>;

/// What the cursor is choosing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Slot {
    /// A property name, or nothing yet, inside an object.
    #[default]
    Property,
    /// A value: after a colon, on a literal value, or among array elements.
    Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Part {
    /// On the key itself.
    Key,
    /// Past the colon, before any value.
    Pending,
    /// On or inside the value.
    Value,
}

#[derive(Clone, Debug, PartialEq)]
struct Member {
    key: String,
    part: Part,
}

/// One container enclosing the cursor.
#[derive(Clone, Debug, PartialEq)]
enum Frame {
    Object {
        keys: IndexSet<String>,
        member: Option<Member>,
    },
    Array {
        index: usize,
        on_element: bool,
    },
}

struct Location {
    /// Outermost first.
    frames: Vec<Frame>,
    leaf: Option<Range<usize>>,
}

// ————————————————————————————————————————————————————————————————————————————
// FRAMES
// ————————————————————————————————————————————————————————————————————————————

/// Containers from the root to the cursor.
///
/// Well-formed regions are read off the tree: `pair` nodes name the member,
/// arrays count the commas before the cursor. Inside `ERROR` nodes the tokens
/// before the cursor are replayed in order (`{`/`[` open a frame, closers pop
/// only what the replay opened, `,` and `:` move within the member), so the
/// path survives whatever shape error recovery chose.
fn locate(tree: &SyntaxTree, offset: usize) -> Location {
    let chain = tree.chain_at(offset);
    let mut frames = Vec::new();

    for (i, &node) in chain.iter().enumerate() {
        let next = chain.get(i + 1).copied();
        let boundary = next.map_or(offset, |n| n.start_byte());
        match node.kind() {
            kinds::OBJECT => {
                value_started(&mut frames);
                frames.push(Frame::Object {
                    keys: object_keys(tree, node),
                    member: None,
                });
                replay(tree, node, boundary, &mut frames);
            }
            kinds::ARRAY => {
                value_started(&mut frames);
                frames.push(Frame::Array {
                    index: 0,
                    on_element: next.is_some(),
                });
                replay(tree, node, boundary, &mut frames);
            }
            kinds::PAIR => enter_pair(tree, node, next, offset, &mut frames),
            kinds::DOCUMENT | kinds::ERROR => replay(tree, node, boundary, &mut frames),
            _ => {
                let parent = i.checked_sub(1).map(|p| chain[p].kind());
                if !matches!(parent, Some(kinds::PAIR | kinds::ARRAY)) {
                    apply(tree, node, &mut frames, 0);
                }
            }
        }
    }

    let leaf = chain
        .last()
        .filter(|node| is_leaf(**node))
        .map(|node| node.byte_range());
    Location { frames, leaf }
}

fn object_keys(tree: &SyntaxTree, object: Node<'_>) -> IndexSet<String> {
    let mut keys = IndexSet::new();
    let mut cursor = object.walk();
    for child in object.named_children(&mut cursor) {
        match child.kind() {
            kinds::PAIR => keys.extend(tree.pair_key(child)),
            kinds::ERROR => {
                let mut inner = child.walk();
                keys.extend(
                    child
                        .named_children(&mut inner)
                        .filter(|n| n.kind() == kinds::PAIR)
                        .filter_map(|pair| tree.pair_key(pair)),
                );
            }
            _ => {}
        }
    }
    keys
}

fn enter_pair(
    tree: &SyntaxTree,
    pair: Node<'_>,
    next: Option<Node<'_>>,
    offset: usize,
    frames: &mut [Frame],
) {
    let Some(Frame::Object { member, .. }) = frames.last_mut() else {
        return;
    };
    let Some(key) = tree.pair_key(pair) else {
        *member = None;
        return;
    };
    let on_key = match (next, pair.child_by_field_name("key")) {
        (Some(next), Some(key_node)) => next.id() == key_node.id(),
        _ => false,
    };
    let part = if on_key || !colon_before(pair, offset) {
        Part::Key
    } else if next.is_some() {
        Part::Value
    } else {
        Part::Pending
    };
    *member = Some(Member { key, part });
}

fn colon_before(pair: Node<'_>, offset: usize) -> bool {
    let mut cursor = pair.walk();
    let found = pair
        .children(&mut cursor)
        .any(|c| c.kind() == ":" && !c.is_missing() && c.end_byte() <= offset);
    found
}

/// A pair with a colon and no real value.
fn awaits_value(pair: Node<'_>) -> bool {
    colon_before(pair, pair.end_byte())
        && pair
            .child_by_field_name("value")
            .is_none_or(|value| value.is_missing())
}

/// Replay the children of `node` that end before `boundary`, descending into
/// nested `ERROR` nodes. A container's own opening token is skipped.
fn replay(tree: &SyntaxTree, node: Node<'_>, boundary: usize, frames: &mut Vec<Frame>) {
    let base = frames.len();
    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return;
    }
    let opener = matches!(node.kind(), kinds::OBJECT | kinds::ARRAY)
        && matches!(cursor.node().kind(), "{" | "[");
    if opener && !cursor.goto_next_sibling() {
        return;
    }
    loop {
        let token = cursor.node();
        if token.start_byte() >= boundary {
            return;
        }
        let before = token.end_byte() <= boundary;
        if before && token.kind() == kinds::ERROR && cursor.goto_first_child() {
            continue;
        }
        if before && !token.is_missing() {
            apply(tree, token, frames, base);
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() || cursor.node().id() == node.id() {
                return;
            }
        }
    }
}

/// Effect of one complete token or node on the frames. Frames below `base`
/// belong to the caller and are never popped.
fn apply(tree: &SyntaxTree, token: Node<'_>, frames: &mut Vec<Frame>, base: usize) {
    match token.kind() {
        "{" => {
            value_started(frames);
            frames.push(Frame::Object {
                keys: IndexSet::new(),
                member: None,
            });
        }
        "[" => {
            value_started(frames);
            frames.push(Frame::Array {
                index: 0,
                on_element: false,
            });
        }
        "}" => {
            if frames.len() > base && matches!(frames.last(), Some(Frame::Object { .. })) {
                frames.pop();
            }
        }
        "]" => {
            if frames.len() > base && matches!(frames.last(), Some(Frame::Array { .. })) {
                frames.pop();
            }
        }
        "," => match frames.last_mut() {
            Some(Frame::Object { member, .. }) => *member = None,
            Some(Frame::Array { index, .. }) => *index += 1,
            None => {}
        },
        ":" => {
            if let Some(Frame::Object { member: Some(member), .. }) = frames.last_mut() {
                if member.part == Part::Key {
                    member.part = Part::Pending;
                }
            }
        }
        kinds::STRING | kinds::STRING_CONTENT => {
            if let Some(text) = tree.string_value(token) {
                string_seen(frames, text);
            }
        }
        kinds::PAIR => {
            if let Some(Frame::Object { keys, member }) = frames.last_mut() {
                *member = None;
                if let Some(key) = tree.pair_key(token) {
                    keys.insert(key.clone());
                    if awaits_value(token) {
                        *member = Some(Member {
                            key,
                            part: Part::Pending,
                        });
                    }
                }
            }
        }
        kinds::OBJECT | kinds::ARRAY | kinds::NUMBER | kinds::TRUE | kinds::FALSE | kinds::NULL => {
            value_started(frames)
        }
        _ => {}
    }
}

/// A string outside any pair: a key when the object awaits one, a value
/// after a colon.
fn string_seen(frames: &mut [Frame], text: String) {
    let Some(Frame::Object { keys, member }) = frames.last_mut() else {
        return;
    };
    match member {
        None => {
            keys.insert(text.clone());
            *member = Some(Member {
                key: text,
                part: Part::Key,
            });
        }
        Some(member) if member.part == Part::Pending => member.part = Part::Value,
        Some(_) => {}
    }
}

fn value_started(frames: &mut [Frame]) {
    if let Some(Frame::Object { member: Some(member), .. }) = frames.last_mut() {
        if member.part == Part::Pending {
            member.part = Part::Value;
        }
    }
}

fn steps(frames: &[Frame], completion: bool) -> JsonPath {
    let mut path = JsonPath::new();
    for (i, frame) in frames.iter().enumerate() {
        let innermost = i + 1 == frames.len();
        match frame {
            Frame::Object { member: Some(member), .. } => {
                let include = match member.part {
                    Part::Value => true,
                    Part::Key => !(completion && innermost),
                    Part::Pending => completion || !innermost,
                };
                if include {
                    path.push(PathStep::Key(member.key.clone()));
                }
            }
            Frame::Object { member: None, .. } => {}
            Frame::Array { index, on_element } => {
                if *on_element || completion || !innermost {
                    path.push(PathStep::Index(*index));
                }
            }
        }
    }
    path
}

fn nearest_keys(frames: &[Frame]) -> Option<&IndexSet<String>> {
    frames.iter().rev().find_map(|frame| match frame {
        Frame::Object { keys, .. } => Some(keys),
        Frame::Array { .. } => None,
    })
}

fn slot_of(frames: &[Frame]) -> Slot {
    match frames.last() {
        Some(Frame::Object { member: Some(member), .. }) if member.part != Part::Key => Slot::Value,
        Some(Frame::Array { .. }) => Slot::Value,
        _ => Slot::Property,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// QUERIES
// ————————————————————————————————————————————————————————————————————————————

/// Path to the deepest node at `offset`: a key for every member crossed, an
/// index for every array element crossed. On a key the path ends with that
/// key. Empty when no container holds the cursor.
pub fn path_at(tree: &SyntaxTree, offset: usize) -> JsonPath {
    steps(&locate(tree, offset).frames, false)
}

/// Keys written in the nearest object around `offset`.
pub fn existing_keys_at(tree: &SyntaxTree, offset: usize) -> IndexSet<String> {
    nearest_keys(&locate(tree, offset).frames)
        .cloned()
        .unwrap_or_default()
}

/// The path completion should walk at `offset`.
///
/// Differs from [`path_at`] in three places: on a key it stops at the
/// enclosing object (a name is being chosen), after a colon with no value yet
/// it steps into that member, and between array elements it steps into the
/// element about to be written.
pub fn completion_path_at(tree: &SyntaxTree, offset: usize) -> JsonPath {
    steps(&locate(tree, offset).frames, true)
}

/// Everything the planner needs to know about the cursor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CursorContext {
    pub path: JsonPath,
    pub slot: Slot,
    /// Keys already written in the enclosing object, minus the key being
    /// typed. Empty in a value slot.
    pub existing_keys: IndexSet<String>,
    /// Byte range of the literal under the cursor, replaced by a chosen candidate.
    pub replace: Option<Range<usize>>,
}

pub fn cursor_context(tree: &SyntaxTree, offset: usize) -> CursorContext {
    let Location { frames, leaf } = locate(tree, offset);
    let slot = slot_of(&frames);
    let existing_keys = match slot {
        Slot::Value => IndexSet::new(),
        Slot::Property => {
            let mut keys = nearest_keys(&frames).cloned().unwrap_or_default();
            if let Some(Frame::Object { member: Some(member), .. }) = frames.last() {
                if member.part == Part::Key {
                    keys.shift_remove(&member.key);
                }
            }
            keys
        }
    };
    CursorContext {
        path: steps(&frames, true),
        slot,
        existing_keys,
        replace: leaf,
    }
}
