//! croukerc configuration parsing
//!
//! Line-oriented `KEY = value` format: `#` comments, blank lines,
//! backslash-newline continuation, case-insensitive keys. `SITES` is a
//! comma-separated list with optional surrounding quotes; `FEED_UPDATE`
//! and `NOTIFY` are intervals in seconds; `TEMP_DIR` is a path. Unknown
//! keys are ignored, later duplicates win.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, ErrorKind, Result, Span};

/// Parsed croukerc contents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Config {
    /// Content servers; may be empty, consumers requiring one fail
    /// explicitly
    pub sites: Vec<String>,
    /// Feed refresh interval in seconds
    pub feed_update: Option<u64>,
    /// Notification interval in seconds
    pub notify: Option<u64>,
    /// Download staging directory
    pub temp_dir: Option<PathBuf>,
}

impl Config {
    /// Parses croukerc text
    pub fn parse(input: &str) -> Result<Self> {
        let mut config = Self::default();

        let mut lines = input.lines().enumerate();
        while let Some((index, line)) = lines.next() {
            // Continuation: a trailing backslash joins the next line.
            let mut logical = line.to_string();
            while let Some(stripped) = logical.strip_suffix('\\') {
                let next = lines.next().map(|(_, l)| l).unwrap_or_default();
                logical = format!("{stripped}{next}");
            }

            let trimmed = logical.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let line_no = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
            let (key, value) = trimmed.split_once('=').ok_or_else(|| {
                Error::with_message(
                    ErrorKind::Expected {
                        expected: "KEY = value".to_string(),
                        found: trimmed.to_string(),
                    },
                    line_span(line_no),
                    format!("line {line_no}: missing '='"),
                )
            })?;
            let key = key.trim().to_uppercase();
            let value = value.trim();

            match key.as_str() {
                "SITES" => config.sites = parse_sites(value),
                "FEED_UPDATE" => config.feed_update = Some(parse_seconds(value, &key, line_no)?),
                "NOTIFY" => config.notify = Some(parse_seconds(value, &key, line_no)?),
                "TEMP_DIR" => config.temp_dir = Some(PathBuf::from(value)),
                other => debug!(key = %other, line = line_no, "ignoring unknown croukerc key"),
            }
        }

        Ok(config)
    }

    /// Loads and parses a croukerc file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::with_source(
                ErrorKind::Io,
                format!("failed to read {}", path.display()),
                err,
            )
        })?;
        Self::parse(&contents)
    }

    /// First configured site, if any
    pub fn first_site(&self) -> Option<&str> {
        self.sites.first().map(String::as_str)
    }
}

fn parse_sites(value: &str) -> Vec<String> {
    value
        .trim_matches('"')
        .split(',')
        .map(str::trim)
        .filter(|site| !site.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_seconds(value: &str, key: &str, line_no: u32) -> Result<u64> {
    value.parse().map_err(|_| {
        Error::with_message(
            ErrorKind::InvalidNumber,
            line_span(line_no),
            format!("line {line_no}: {key} is not an unsigned integer: {value:?}"),
        )
    })
}

fn line_span(line_no: u32) -> Span {
    let pos = crate::error::Pos::new(0, line_no, 1);
    Span::new(pos, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_rc() -> Result<()> {
        let config = Config::parse(
            "# crouke configuration\n\
             SITES = \"api.example.org, mirror.example.org\"\n\
             FEED_UPDATE = 1800\n\
             notify = 600\n\
             TEMP_DIR = /tmp/crouke\n",
        )?;
        assert_eq!(config.sites, vec!["api.example.org", "mirror.example.org"]);
        assert_eq!(config.feed_update, Some(1800));
        assert_eq!(config.notify, Some(600));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/crouke")));
        Ok(())
    }

    #[test]
    fn test_continuation_lines_joined() -> Result<()> {
        let config = Config::parse("SITES = \"a.example.org,\\\n b.example.org\"\n")?;
        assert_eq!(config.sites, vec!["a.example.org", "b.example.org"]);
        Ok(())
    }

    #[test]
    fn test_empty_input_is_valid() -> Result<()> {
        let config = Config::parse("")?;
        assert!(config.sites.is_empty());
        assert_eq!(config.first_site(), None);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_ignored_duplicates_win() -> Result<()> {
        let config = Config::parse("COLOR = blue\nNOTIFY = 1\nNOTIFY = 2\n")?;
        assert_eq!(config.notify, Some(2));
        Ok(())
    }

    #[test]
    fn test_unquoted_single_site() -> Result<()> {
        let config = Config::parse("sites = api.example.org\n")?;
        assert_eq!(config.first_site(), Some("api.example.org"));
        Ok(())
    }

    #[test]
    fn test_missing_equals_positioned() {
        let err = Config::parse("SITES = x\nbogus line\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Expected { .. }));
        assert_eq!(err.span().start.line, 2);
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = Config::parse("FEED_UPDATE = soon\n").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidNumber);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/croukerc").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Io);
    }
}
