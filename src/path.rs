// Author: Dustin Pilgrim
// License: MIT

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CairnError, Result};

static SIMPLE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("simple key pattern is valid"));

/// A dot-separated sequence of keys locating a value inside an object tree.
///
/// The empty path stands for the root object; it can be built with
/// [`ConfigPath::root`] but never parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigPath {
    keys: Vec<String>,
}

impl ConfigPath {
    pub fn root() -> Self {
        Self { keys: Vec::new() }
    }

    /// Single-element path. The key is taken literally, dots included.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            keys: vec![key.into()],
        }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `a.b."c.d"` style expressions.
    ///
    /// Quoted segments may contain dots and use `\"` / `\\` escapes.
    pub fn parse(expr: &str) -> Result<Self> {
        let bad = |message: &str| CairnError::BadPath {
            path: expr.to_string(),
            message: message.to_string(),
        };

        if expr.trim().is_empty() {
            return Err(bad("path is empty"));
        }

        let mut keys = Vec::new();
        let mut current = String::new();
        let mut quoted_segment = false;
        let mut chars = expr.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '"' => {
                    quoted_segment = true;
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some(c @ ('"' | '\\')) => current.push(c),
                                Some(other) => {
                                    return Err(bad(&format!("unsupported escape '\\{}'", other)));
                                }
                                None => return Err(bad("unterminated escape")),
                            },
                            Some(c) => current.push(c),
                            None => return Err(bad("unterminated quoted key")),
                        }
                    }
                }
                '.' => {
                    if current.is_empty() && !quoted_segment {
                        return Err(bad("empty key between dots"));
                    }
                    keys.push(std::mem::take(&mut current));
                    quoted_segment = false;
                }
                c if c.is_whitespace() => {
                    return Err(bad("whitespace is only allowed inside quoted keys"));
                }
                c => current.push(c),
            }
        }

        if current.is_empty() && !quoted_segment {
            return Err(bad("path ends with a dot"));
        }
        keys.push(current);

        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.keys.last().map(String::as_str)
    }

    /// Everything after the first key; the root path for a single key.
    pub fn remainder(&self) -> ConfigPath {
        Self {
            keys: self.keys.iter().skip(1).cloned().collect(),
        }
    }

    pub fn parent(&self) -> Option<ConfigPath> {
        if self.keys.is_empty() {
            return None;
        }
        Some(Self {
            keys: self.keys[..self.keys.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, key: &str) -> ConfigPath {
        let mut keys = self.keys.clone();
        keys.push(key.to_string());
        Self { keys }
    }

    pub fn prepend(&self, prefix: &ConfigPath) -> ConfigPath {
        let mut keys = prefix.keys.clone();
        keys.extend(self.keys.iter().cloned());
        Self { keys }
    }

    /// Drops the first `start` keys.
    pub fn sub_path(&self, start: usize) -> ConfigPath {
        Self {
            keys: self.keys.iter().skip(start).cloned().collect(),
        }
    }

    pub fn starts_with(&self, prefix: &ConfigPath) -> bool {
        self.keys.starts_with(&prefix.keys)
    }

    /// Renders the path back to an expression that [`ConfigPath::parse`] accepts.
    pub fn render(&self) -> String {
        self.keys
            .iter()
            .map(|k| render_key(k))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Quotes a single key unless it only holds simple characters.
pub(crate) fn render_key(key: &str) -> String {
    if SIMPLE_KEY.is_match(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

pub(crate) fn quote(s: &str) -> String {
    // serialising a str cannot fail
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl FromStr for ConfigPath {
    type Err = CairnError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigPath::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let p = ConfigPath::parse("server.http.port").unwrap();
        assert_eq!(p.keys(), &["server", "http", "port"]);
        assert_eq!(p.first(), Some("server"));
        assert_eq!(p.last(), Some("port"));
        assert_eq!(p.remainder().render(), "http.port");
    }

    #[test]
    fn test_parse_quoted() {
        let p = ConfigPath::parse(r#"hosts."example.com".port"#).unwrap();
        assert_eq!(p.keys(), &["hosts", "example.com", "port"]);
        assert_eq!(p.render(), r#"hosts."example.com".port"#);

        let escaped = ConfigPath::parse(r#""say \"hi\"""#).unwrap();
        assert_eq!(escaped.keys(), &["say \"hi\""]);

        let empty_key = ConfigPath::parse(r#"a."".b"#).unwrap();
        assert_eq!(empty_key.keys(), &["a", "", "b"]);
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "a..b", ".a", "a.", "a b", r#""open"#] {
            match ConfigPath::parse(bad) {
                Err(CairnError::BadPath { .. }) => {}
                other => panic!("expected BadPath for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_render_round_trip() {
        let p = ConfigPath::from_keys(["a", "b.c", "d e", ""]);
        let reparsed = ConfigPath::parse(&p.render()).unwrap();
        assert_eq!(p, reparsed);
    }

    #[test]
    fn test_prefix_operations() {
        let prefix = ConfigPath::parse("foo.bar").unwrap();
        let p = ConfigPath::parse("a.b").unwrap();
        let full = p.prepend(&prefix);
        assert_eq!(full.render(), "foo.bar.a.b");
        assert!(full.starts_with(&prefix));
        assert!(!p.starts_with(&prefix));
        assert_eq!(full.sub_path(2), p);
        assert_eq!(full.parent().unwrap().render(), "foo.bar.a");
        assert!(ConfigPath::root().parent().is_none());
        assert!(full.starts_with(&ConfigPath::root()));
    }
}
