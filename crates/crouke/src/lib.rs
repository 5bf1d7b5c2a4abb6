//! Crouke - client library for opendesktop.org-family content feeds
//!
//! The core is a schema-less XML-to-object mapper paired with a blocking
//! HTTP content fetcher: responses are parsed into a dynamically navigable
//! [`Node`] graph whose root is classified by the category segment of the
//! request URL, and a typed [`Feed`] layer wraps the fixed `/V1/` endpoint
//! patterns.
//!
//! # Quick Start
//!
//! ```
//! use crouke::objectify_str;
//! # fn main() -> Result<(), crouke::Error> {
//! let xml = "<ocs><status>ok</status><data><category id=\"1\">Wallpapers</category></data></ocs>";
//! let root = objectify_str(xml, "CATEGORIES")?;
//! assert_eq!(root.kind(), "CATEGORIES");
//! let status = root.child("status").and_then(|n| n.text());
//! assert_eq!(status, Some("ok"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod cursor;

pub mod xml;
pub use xml::{Child as XmlChild, Element as XmlElement, Parser as XmlParser};

pub mod node;
pub use node::{Field, Node, TEXT_FIELD};

pub mod objectify;
pub use objectify::{objectify as objectify_bytes, objectify_str};

pub mod client;
pub use client::handler::{FailureLog, Handler, HttpHandler, Request, TracingFailureLog, Verb};
pub use client::{Client, Credentials, RawResponse, RequestOptions, DEFAULT_TIMEOUT};

pub mod feed;
pub use feed::{Category, ContentDetails, Entry, Feed, FrontPage, SortMode, Vote};

pub mod config;
pub use config::Config;
