//! XML data model

use indexmap::IndexMap;

/// XML element: tag name, ordered attributes, ordered children
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Child>,
}

impl Element {
    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Child::Element(el) => Some(el),
            Child::Text(_) => None,
        })
    }

    /// Direct text segments in document order
    pub fn text_segments(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|c| match c {
            Child::Text(text) => Some(text.as_str()),
            Child::Element(_) => None,
        })
    }
}

/// One child of an element: a nested element or a text segment
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(Element),
    Text(String),
}
