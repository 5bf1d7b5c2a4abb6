//! Recursive-descent XML parser over a byte cursor
//!
//! Covers the subset content feeds actually ship: elements, attributes,
//! entity-encoded text, CDATA (captured as text), comments, processing
//! instructions and DOCTYPE (skipped). Input must be UTF-8.

use indexmap::IndexMap;

use crate::cursor::Cursor;
use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::xml::model::{Child, Element};

const BOM: &[u8] = b"\xef\xbb\xbf";
const COMMENT_OPEN: &[u8] = b"<!--";
const COMMENT_CLOSE: &[u8] = b"-->";
const CDATA_OPEN: &[u8] = b"<![CDATA[";
const CDATA_CLOSE: &[u8] = b"]]>";
const PI_CLOSE: &[u8] = b"?>";

/// XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Parser<'a> {
    /// Create a new XML parser
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(input),
        }
    }

    /// Parse a whole document and return its root element
    pub fn parse(&mut self) -> Result<Element> {
        if self.cursor.starts_with(BOM) {
            self.cursor.advance_by(BOM.len());
        }
        self.skip_misc()?;

        if self.cursor.current() != Some(b'<') {
            return Err(self.error_here("expected document root element"));
        }
        let root = self.parse_element()?;

        self.skip_misc()?;
        if !self.cursor.is_eof() {
            return Err(self.error_here("trailing content after root element"));
        }

        Ok(root)
    }

    /// Skip whitespace, comments, PIs and DOCTYPE between markup
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(COMMENT_OPEN) {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(PI_CLOSE)?;
            } else if self.cursor.starts_with(b"<!") && !self.cursor.starts_with(CDATA_OPEN) {
                self.cursor.advance_by(2);
                self.skip_until(b">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self) -> Result<Element> {
        self.expect_byte(b'<')?;
        if self.cursor.current() == Some(b'/') {
            return Err(self.error_here("unexpected closing tag"));
        }

        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        if self.cursor.consume(b'/') {
            self.expect_byte(b'>')?;
            return Ok(Element {
                name,
                attributes,
                children: Vec::new(),
            });
        }
        self.expect_byte(b'>')?;

        let children = self.parse_children(&name)?;
        Ok(Element {
            name,
            attributes,
            children,
        })
    }

    /// Parse element content up to and including the matching closing tag
    fn parse_children(&mut self, open_name: &str) -> Result<Vec<Child>> {
        let mut children = Vec::new();
        loop {
            match self.cursor.current() {
                None => {
                    return Err(self.error_here(&format!("unterminated element <{open_name}>")));
                }
                Some(b'<') if self.cursor.peek(1) == Some(b'/') => {
                    self.cursor.advance_by(2);
                    let close_pos = self.cursor.position();
                    let close_name = self.parse_name()?;
                    if close_name != open_name {
                        return Err(Error::with_message(
                            ErrorKind::Expected {
                                expected: format!("</{open_name}>"),
                                found: format!("</{close_name}>"),
                            },
                            Span::new(close_pos, self.cursor.position()),
                            "mismatched closing tag",
                        ));
                    }
                    self.cursor.skip_whitespace();
                    self.expect_byte(b'>')?;
                    return Ok(children);
                }
                Some(b'<') if self.cursor.starts_with(COMMENT_OPEN) => {
                    self.skip_comment()?;
                }
                Some(b'<') if self.cursor.starts_with(CDATA_OPEN) => {
                    let text = self.parse_cdata()?;
                    if !text.is_empty() {
                        children.push(Child::Text(text));
                    }
                }
                Some(b'<') if self.cursor.peek(1) == Some(b'!') => {
                    self.cursor.advance_by(2);
                    self.skip_until(b">")?;
                }
                Some(b'<') if self.cursor.peek(1) == Some(b'?') => {
                    self.cursor.advance_by(2);
                    self.skip_until(PI_CLOSE)?;
                }
                Some(b'<') => {
                    children.push(Child::Element(self.parse_element()?));
                }
                Some(_) => {
                    if let Some(text) = self.parse_text()? {
                        children.push(Child::Text(text));
                    }
                }
            }
        }
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();
        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input in tag")),
            }

            let name_pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(Error::with_message(
                    ErrorKind::InvalidToken,
                    Span::new(name_pos, self.cursor.position()),
                    format!("duplicate attribute {name}"),
                ));
            }
            attrs.insert(name, value);
        }
        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                return self.decode_entities(self.to_utf8(raw)?);
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated attribute value"))
    }

    /// Collect raw text up to the next markup; whitespace-only runs are dropped
    fn parse_text(&mut self) -> Result<Option<String>> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = self.to_utf8(raw)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.decode_entities(text).map(Some)
    }

    /// CDATA content is taken verbatim, without entity decoding
    fn parse_cdata(&mut self) -> Result<String> {
        self.cursor.advance_by(CDATA_OPEN.len());
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(CDATA_CLOSE) {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance_by(CDATA_CLOSE.len());
                return Ok(self.to_utf8(raw)?.to_string());
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated CDATA section"))
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        match self.cursor.current() {
            Some(b) if is_name_start(b) => self.cursor.advance(),
            _ => return Err(self.error_here("expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }
        Ok(self.to_utf8(self.cursor.slice_from(start))?.to_string())
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.cursor.advance_by(COMMENT_OPEN.len());
        self.skip_until(COMMENT_CLOSE)
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                self.cursor.advance_by(pattern.len());
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            let found = match self.cursor.current() {
                Some(b) => format!("{:?}", char::from(b)),
                None => "end of input".to_string(),
            };
            let pos = self.cursor.position();
            Err(Error::with_message(
                ErrorKind::Expected {
                    expected: format!("{:?}", char::from(expected)),
                    found,
                },
                Span::new(pos, pos),
                "unexpected token",
            ))
        }
    }

    fn to_utf8(&self, bytes: &'a [u8]) -> Result<&'a str> {
        std::str::from_utf8(bytes).map_err(|_| self.error_here("invalid utf-8"))
    }

    fn error_here(&self, message: &str) -> Error {
        let pos = self.cursor.position();
        Error::with_message(
            ErrorKind::InvalidToken,
            Span::new(Pos::new(pos.offset, pos.line, pos.col), pos),
            message.to_string(),
        )
    }

    fn decode_entities(&self, input: &str) -> Result<String> {
        if !input.contains('&') {
            return Ok(input.to_string());
        }

        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars();
        while let Some(ch) = chars.next() {
            if ch != '&' {
                result.push(ch);
                continue;
            }

            let mut entity = String::new();
            let mut terminated = false;
            for next in chars.by_ref() {
                if next == ';' {
                    terminated = true;
                    break;
                }
                entity.push(next);
            }

            let decoded = if terminated {
                decode_entity(&entity)
            } else {
                None
            };
            match decoded {
                Some(ch) => result.push(ch),
                None => return Err(self.error_here(&format!("invalid xml entity &{entity};"))),
            }
        }
        Ok(result)
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => decode_numeric_entity(entity),
    }
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b':')
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || b.is_ascii_digit() || matches!(b, b'-' | b'.')
}
