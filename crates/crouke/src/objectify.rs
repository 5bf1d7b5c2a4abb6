//! Schema-less XML-to-node conversion
//!
//! Turns a parsed element tree into a [`Node`] graph. No schema is
//! consulted: a repeated child tag is promoted from a single node to an
//! ordered list on its second occurrence, attributes become text fields
//! and an element's own text lands under the reserved `text` field.
//!
//! Field keys share one namespace. Children are inserted first in document
//! order, attributes after them, the element text last; the later writer
//! wins and each overwrite is reported as a warning. Attributes and text
//! never promote to lists.

use tracing::warn;

use crate::error::{Error, ErrorKind, Result};
use crate::node::{Node, TEXT_FIELD};
use crate::xml::{Element, Parser};

/// Objectifies an XML document, naming the root node `category_tag`
///
/// The override is deliberate: callers dispatch on the category they
/// requested, not on whatever root tag the server chose. Fails with
/// [`ErrorKind::MalformedContent`] when the bytes are not well-formed XML;
/// no partial tree is produced.
pub fn objectify(bytes: &[u8], category_tag: &str) -> Result<Node> {
    let root = Parser::new(bytes).parse().map_err(|err| {
        Error::with_source(
            ErrorKind::MalformedContent,
            format!("malformed content: {err}"),
            err,
        )
    })?;
    Ok(build_node(&root, category_tag))
}

/// Objectifies an XML document held in a string
pub fn objectify_str(content: &str, category_tag: &str) -> Result<Node> {
    objectify(content.as_bytes(), category_tag)
}

/// Builds one node from an element, classifying it as `kind`
fn build_node(element: &Element, kind: &str) -> Node {
    let mut node = Node::new(kind);

    for child in element.elements() {
        node.push_child(child.name.clone(), build_node(child, &child.name));
    }

    for (name, value) in &element.attributes {
        if node.set_text(name.clone(), value.clone()).is_some() {
            warn!(tag = %element.name, field = %name, "attribute overwrites child field");
        }
    }

    let mut text = String::new();
    for segment in element.text_segments() {
        text.push_str(segment);
    }
    if !text.is_empty() {
        let replaced = node.set_text(TEXT_FIELD, text);
        if replaced.is_some() {
            warn!(tag = %element.name, "text content overwrites existing field");
        }
    }

    node
}
