//! Typed operations over the fixed `/V1/` URL-pattern API
//!
//! Wraps a [`Client`] with the endpoint conventions of the content feeds:
//! the `status`/`data` response envelope, the `x`-joined category ids of
//! the list endpoint and the local re-sort of entries.

use std::str::FromStr;

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;

use crate::client::{Client, RawResponse};
use crate::error::{Error, ErrorKind, Result, Span};
use crate::node::{Field, Node};

/// URL template for the category list
pub const CATEGORIES_URL: &str = "/V1/CATEGORIES/";
/// URL template for a content listing: joined category ids, sort mode, page
pub const LIST_URL: &str = "/V1/LIST/{}/{}/{}";
/// URL template for one content item
pub const CONTENT_URL: &str = "/V1/GET/{}/";
/// URL template for voting on a content item
pub const VOTE_URL: &str = "/V1/VOTE/{}/{}";

const CATEGORY_SEPARATOR: char = 'x';
const STATUS_OK: &str = "ok";

/// Server-side sort mode of the list endpoint
///
/// The server's ordering is not trusted; [`Feed::list`] re-sorts locally
/// with the same key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortMode {
    /// Ascending by change timestamp
    #[default]
    New,
    /// Ascending by name
    Alpha,
    /// Descending by score
    High,
    /// Descending by download count
    Down,
}

impl SortMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Alpha => "alpha",
            Self::High => "high",
            Self::Down => "down",
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Self::New),
            "alpha" => Ok(Self::Alpha),
            "high" => Ok(Self::High),
            "down" => Ok(Self::Down),
            other => Err(Error::with_message(
                ErrorKind::InvalidToken,
                Span::empty(),
                format!("unknown sort mode {other:?}"),
            )),
        }
    }
}

/// A vote on a content item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Vote {
    Good,
    Bad,
}

impl Vote {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vote {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "good" => Ok(Self::Good),
            "bad" => Ok(Self::Bad),
            other => Err(Error::with_message(
                ErrorKind::InvalidToken,
                Span::empty(),
                format!("unknown vote {other:?}"),
            )),
        }
    }
}

/// One content category
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// One entry of a content listing
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Entry {
    pub id: String,
    pub changed: i64,
    pub name: String,
    pub score: i64,
    pub downloads: i64,
}

/// Field name to decoded text of one content item, in document order
pub type ContentDetails = IndexMap<String, Option<String>>;

/// The default landing view: every category, first listing page, full
/// content of each listed entry
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrontPage {
    pub categories: Vec<Category>,
    pub contents: Vec<ContentDetails>,
}

/// Feed operations over one client
#[derive(Debug)]
pub struct Feed {
    client: Client,
}

impl Feed {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The wrapped client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Lists all categories
    ///
    /// A non-`ok` envelope status yields an empty list, matching the
    /// protocol's observable behavior; transport errors propagate.
    pub fn categories(&self) -> Result<Vec<Category>> {
        let root = self.client.get(CATEGORIES_URL, &[])?;
        let Some(data) = envelope_data(&root)? else {
            return Ok(Vec::new());
        };

        let mut categories = Vec::new();
        for node in data.children("category") {
            let id = node
                .get("id")
                .and_then(Field::as_text)
                .ok_or_else(|| missing_field("category.id"))?;
            let name = node.text().unwrap_or_default();
            categories.push(Category {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
        Ok(categories)
    }

    /// Lists content entries for the given categories, re-sorted locally
    pub fn list(&self, category_ids: &[&str], sort: SortMode, page: u32) -> Result<Vec<Entry>> {
        let joined = join_categories(category_ids);
        let page = page.to_string();
        let root = self.client.get(LIST_URL, &[&joined, sort.as_str(), &page])?;
        let Some(data) = envelope_data(&root)? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for node in data.children("entry") {
            entries.push(Entry {
                id: text_field(node, "id")?.to_string(),
                changed: numeric_field(node, "changed")?,
                name: text_field(node, "name")?.to_string(),
                score: numeric_field(node, "score")?,
                downloads: numeric_field(node, "downloads")?,
            });
        }
        sort_entries(&mut entries, sort);
        Ok(entries)
    }

    /// Ids of [`Self::list`] in sorted order
    pub fn list_ids(&self, category_ids: &[&str], sort: SortMode, page: u32) -> Result<Vec<String>> {
        Ok(self
            .list(category_ids, sort, page)?
            .into_iter()
            .map(|entry| entry.id)
            .collect())
    }

    /// Full content fields of one item
    ///
    /// Exposes the direct element children of `data`, each with its text
    /// percent-decoded and lossily read as UTF-8.
    pub fn content(&self, content_id: &str) -> Result<ContentDetails> {
        let root = self.client.get(CONTENT_URL, &[content_id])?;
        let Some(data) = envelope_data(&root)? else {
            return Ok(ContentDetails::new());
        };

        let mut details = ContentDetails::new();
        for (name, field) in data.fields() {
            if field.is_text() {
                continue;
            }
            let text = field
                .nodes()
                .next()
                .and_then(Node::text)
                .map(decode_content_text);
            details.insert(name.clone(), text);
        }
        Ok(details)
    }

    /// Casts a vote and returns the response status text verbatim
    pub fn vote(&self, content_id: &str, vote: Vote) -> Result<String> {
        let root = self.client.get(VOTE_URL, &[content_id, vote.as_str()])?;
        let status = status_text(&root)?;
        Ok(status.to_string())
    }

    /// Probes the login by fetching the category list on the raw path
    ///
    /// Returns true iff the server answered 2xx; transport errors propagate.
    pub fn verify_login(&self) -> Result<bool> {
        let response: RawResponse = self.client.get_raw(CATEGORIES_URL, &[])?;
        Ok(response.is_success())
    }

    /// Builds the front page: all categories, plus the content of every
    /// entry on the requested listing page, fetched sequentially
    pub fn front_page(&self, sort: SortMode, page: u32) -> Result<FrontPage> {
        let categories = self.categories()?;
        let ids: Vec<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        let entry_ids = self.list_ids(&ids, sort, page)?;

        let mut contents = Vec::with_capacity(entry_ids.len());
        for id in &entry_ids {
            contents.push(self.content(id)?);
        }
        Ok(FrontPage {
            categories,
            contents,
        })
    }
}

/// Joins category ids with the list endpoint's separator
fn join_categories(ids: &[&str]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(CATEGORY_SEPARATOR);
        }
        out.push_str(id);
    }
    out
}

/// Re-sorts entries with the requested mode's key
///
/// `new` sorts ascending by change timestamp; `alpha` ascending by name;
/// `high` and `down` descending by score and downloads. Stable, so equal
/// keys keep server order.
pub fn sort_entries(entries: &mut [Entry], sort: SortMode) {
    match sort {
        SortMode::New => entries.sort_by_key(|e| e.changed),
        SortMode::Alpha => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        SortMode::High => entries.sort_by_key(|e| std::cmp::Reverse(e.score)),
        SortMode::Down => entries.sort_by_key(|e| std::cmp::Reverse(e.downloads)),
    }
}

/// Status text of the response envelope
fn status_text(root: &Node) -> Result<&str> {
    root.child("status")
        .and_then(Node::text)
        .ok_or_else(|| missing_field("status"))
}

/// The envelope payload, or None when the status is not `ok`
fn envelope_data(root: &Node) -> Result<Option<&Node>> {
    if status_text(root)? != STATUS_OK {
        return Ok(None);
    }
    root.child("data").map(Some).ok_or_else(|| missing_field("data"))
}

fn missing_field(name: &str) -> Error {
    Error::new(
        ErrorKind::MissingField {
            field: name.to_string(),
        },
        Span::empty(),
    )
}

fn text_field<'a>(node: &'a Node, name: &str) -> Result<&'a str> {
    node.child(name)
        .and_then(Node::text)
        .ok_or_else(|| missing_field(name))
}

fn numeric_field(node: &Node, name: &str) -> Result<i64> {
    let text = text_field(node, name)?;
    text.trim().parse().map_err(|_| {
        Error::with_message(
            ErrorKind::InvalidNumber,
            Span::empty(),
            format!("entry field {name} is not numeric: {text:?}"),
        )
    })
}

/// Percent-decodes content text, reading the result lossily as UTF-8
fn decode_content_text(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, changed: i64, name: &str, score: i64, downloads: i64) -> Entry {
        Entry {
            id: id.to_string(),
            changed,
            name: name.to_string(),
            score,
            downloads,
        }
    }

    #[test]
    fn test_sort_mode_round_trip() -> Result<()> {
        for mode in [SortMode::New, SortMode::Alpha, SortMode::High, SortMode::Down] {
            assert_eq!(mode.as_str().parse::<SortMode>()?, mode);
        }
        assert!("best".parse::<SortMode>().is_err());
        Ok(())
    }

    #[test]
    fn test_vote_round_trip() -> Result<()> {
        assert_eq!("good".parse::<Vote>()?, Vote::Good);
        assert_eq!("bad".parse::<Vote>()?, Vote::Bad);
        assert!("meh".parse::<Vote>().is_err());
        Ok(())
    }

    #[test]
    fn test_join_categories() {
        assert_eq!(join_categories(&[]), "");
        assert_eq!(join_categories(&["1"]), "1");
        assert_eq!(join_categories(&["1", "2", "17"]), "1x2x17");
    }

    #[test]
    fn test_sort_new_ascending_by_changed() {
        let mut entries = vec![
            entry("a", 300, "a", 0, 0),
            entry("b", 100, "b", 0, 0),
            entry("c", 200, "c", 0, 0),
        ];
        sort_entries(&mut entries, SortMode::New);
        let changed: Vec<_> = entries.iter().map(|e| e.changed).collect();
        assert_eq!(changed, vec![100, 200, 300]);
    }

    #[test]
    fn test_sort_alpha_ascending_by_name() {
        let mut entries = vec![
            entry("1", 0, "zebra", 0, 0),
            entry("2", 0, "apple", 0, 0),
            entry("3", 0, "mango", 0, 0),
        ];
        sort_entries(&mut entries, SortMode::Alpha);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_sort_high_and_down_descending() {
        let mut entries = vec![
            entry("1", 0, "a", 10, 5),
            entry("2", 0, "b", 30, 1),
            entry("3", 0, "c", 20, 9),
        ];
        sort_entries(&mut entries, SortMode::High);
        let scores: Vec<_> = entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![30, 20, 10]);

        sort_entries(&mut entries, SortMode::Down);
        let downloads: Vec<_> = entries.iter().map(|e| e.downloads).collect();
        assert_eq!(downloads, vec![9, 5, 1]);
    }

    #[test]
    fn test_decode_content_text() {
        assert_eq!(decode_content_text("a%20theme%2Fpack"), "a theme/pack");
        assert_eq!(decode_content_text("plain"), "plain");
        // Invalid UTF-8 after decoding is read lossily, not rejected.
        assert_eq!(decode_content_text("%FF"), "\u{fffd}");
    }
}
