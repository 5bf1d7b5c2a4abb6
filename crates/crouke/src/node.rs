//! Objectified node: one XML element as a navigable field mapping

use indexmap::map::Keys;
use indexmap::IndexMap;

/// Reserved field name for an element's own text content
pub const TEXT_FIELD: &str = "text";

/// One field of a [`Node`]
///
/// A repeated child tag is promoted from `Node` to `List` on its second
/// occurrence; XML attributes and element text are stored as `Text`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Field {
    Node(Node),
    List(Vec<Node>),
    Text(String),
}

impl Field {
    /// Returns true if this field is a single child node
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    /// Returns true if this field is a list of child nodes
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns true if this field is plain text
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns the child node if this is a single node, None otherwise
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the node list if this is a list, None otherwise
    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Self::List(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Returns the text value if this is text, None otherwise
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Child nodes regardless of cardinality
    ///
    /// A single node yields one element, a list yields all of them and a
    /// text field yields nothing. Callers that must not assume cardinality
    /// from the document iterate this instead of matching.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        let slice: &[Node] = match self {
            Self::Node(node) => std::slice::from_ref(node),
            Self::List(nodes) => nodes,
            Self::Text(_) => &[],
        };
        slice.iter()
    }
}

impl From<Node> for Field {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<String> for Field {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// An objectified XML element
///
/// A single concrete type for every tag: `kind` carries the tag name (or
/// the category override at the root) and `fields` maps child tags,
/// attributes and the reserved [`TEXT_FIELD`] to their values in insertion
/// order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Node {
    kind: String,
    fields: IndexMap<String, Field>,
}

impl Node {
    /// Creates an empty node of the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: IndexMap::new(),
        }
    }

    /// The tag name this node was classified as
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the field with the given name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Returns true if a field with the given name exists
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields on this node
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if this node carries no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in insertion order
    pub fn field_names(&self) -> Keys<'_, String, Field> {
        self.fields.keys()
    }

    /// Fields in insertion order
    pub fn fields(&self) -> indexmap::map::Iter<'_, String, Field> {
        self.fields.iter()
    }

    /// The node's own text content, if any
    pub fn text(&self) -> Option<&str> {
        self.get(TEXT_FIELD).and_then(Field::as_text)
    }

    /// First child node under the given field, tolerating either cardinality
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.get(name).and_then(|field| field.nodes().next())
    }

    /// All child nodes under the given field, tolerating either cardinality
    pub fn children(&self, name: &str) -> impl Iterator<Item = &Node> {
        self.get(name).into_iter().flat_map(Field::nodes)
    }

    /// Appends a child node under its field key, promoting to a list on the
    /// second occurrence of the same key
    ///
    /// An existing text field under the same key is replaced, not promoted.
    pub fn push_child(&mut self, name: impl Into<String>, child: Self) {
        match self.fields.entry(name.into()) {
            indexmap::map::Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                let mut nodes = match std::mem::replace(slot, Field::List(Vec::new())) {
                    Field::Node(first) => vec![first],
                    Field::List(list) => list,
                    Field::Text(_) => Vec::new(),
                };
                nodes.push(child);
                *slot = Field::List(nodes);
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(Field::Node(child));
            }
        }
    }

    /// Sets a text field, replacing any existing field of the same name
    ///
    /// Returns the replaced field so the caller can report the collision.
    /// Text fields never promote to lists.
    pub fn set_text(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<Field> {
        self.fields.insert(name.into(), Field::Text(value.into()))
    }
}
