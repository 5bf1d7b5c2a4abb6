//! Error types for crouke

use std::fmt;
use thiserror::Error;

/// Position in source input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.start.offset == 0 && self.start.line == 0 && self.end.offset == 0
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexical or structural problem in XML or croukerc input
    InvalidToken,
    /// A specific construct was required but something else was found
    Expected { expected: String, found: String },
    /// A numeric field failed to parse
    InvalidNumber,
    /// Response body was not well-formed XML
    MalformedContent,
    /// Transport or downstream handler failure
    RequestHandling,
    /// Every handler in a verb chain failed
    HandlersExhausted { attempts: usize },
    /// Non-2xx status where structured content was expected
    UnexpectedStatus { code: u16 },
    /// URL without a `/V1/<segment>` category, or template/param mismatch
    InvalidUrl,
    /// Response envelope or entry lacked a required field
    MissingField { field: String },
    /// Filesystem failure while loading configuration
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid token"),
            Self::Expected { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::InvalidNumber => write!(f, "invalid number"),
            Self::MalformedContent => write!(f, "malformed content"),
            Self::RequestHandling => write!(f, "request handling failed"),
            Self::HandlersExhausted { attempts } => {
                write!(f, "all {attempts} handlers failed")
            }
            Self::UnexpectedStatus { code } => {
                write!(f, "unexpected http status {code}")
            }
            Self::InvalidUrl => write!(f, "invalid url"),
            Self::MissingField { field } => write!(f, "missing field: {field}"),
            Self::Io => write!(f, "io failure"),
        }
    }
}

/// Main error type for crouke
#[derive(Error, Debug)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
            source: None,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error carrying the underlying cause
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            span: Span::empty(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create error at specific position
    pub fn at(kind: ErrorKind, offset: usize, line: u32, col: u32) -> Self {
        let pos = Pos::new(offset, line, col);
        Self::new(kind, Span::new(pos, pos))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "error at {}: {}", self.span.start, self.message)
        }
    }
}

/// Result type alias for crouke
pub type Result<T> = std::result::Result<T, Error>;
