// Author: Dustin Pilgrim
// License: MIT

//! Provenance records attached to every node of a configuration tree.
//!
//! An [`Origin`] tells a human where a value came from: a file and line, an
//! environment variable, the system properties, or a hardcoded value. Origins
//! never take part in equality of values. When two nodes combine during a merge
//! their origins combine too, so a merged value can still explain itself.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

const MERGE_OF_PREFIX: &str = "merge of ";

static HARDCODED: Lazy<Origin> = Lazy::new(|| Origin::new("hardcoded value"));

#[derive(Debug, PartialEq, Eq)]
struct OriginData {
    description: String,
    line: Option<usize>,
    end_line: Option<usize>,
    comments: Vec<String>,
}

/// Cheaply clonable, immutable provenance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    inner: Arc<OriginData>,
}

impl Origin {
    pub fn new(description: impl Into<String>) -> Self {
        Self::from_data(OriginData {
            description: description.into(),
            line: None,
            end_line: None,
            comments: Vec::new(),
        })
    }

    /// The origin given to values created from native data without a description.
    pub fn hardcoded() -> Origin {
        HARDCODED.clone()
    }

    fn from_data(data: OriginData) -> Self {
        Self {
            inner: Arc::new(data),
        }
    }

    pub fn with_line(&self, line: usize) -> Origin {
        Self::from_data(OriginData {
            description: self.inner.description.clone(),
            line: Some(line),
            end_line: Some(line),
            comments: self.inner.comments.clone(),
        })
    }

    pub fn with_comments(&self, comments: Vec<String>) -> Origin {
        if self.inner.comments == comments {
            return self.clone();
        }
        Self::from_data(OriginData {
            description: self.inner.description.clone(),
            line: self.inner.line,
            end_line: self.inner.end_line,
            comments,
        })
    }

    /// Description including the line or line range, e.g. `app.json: 3-7`.
    pub fn description(&self) -> String {
        match (self.inner.line, self.inner.end_line) {
            (Some(start), Some(end)) if end > start => {
                format!("{}: {}-{}", self.inner.description, start, end)
            }
            (Some(line), _) => format!("{}: {}", self.inner.description, line),
            _ => self.inner.description.clone(),
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.inner.line
    }

    pub fn comments(&self) -> &[String] {
        &self.inner.comments
    }

    /// Same underlying record, not just equal contents.
    pub fn ptr_eq(&self, other: &Origin) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Combines two origins into one describing both.
    ///
    /// Origins with the same base description collapse into a line range;
    /// anything else becomes `merge of a,b`.
    pub fn merge(&self, other: &Origin) -> Origin {
        if self.ptr_eq(other) {
            return self.clone();
        }

        let a_base = strip_merge_prefix(&self.inner.description);
        let b_base = strip_merge_prefix(&other.inner.description);

        let (description, line, end_line) = if a_base == b_base {
            let line = min_known(self.inner.line, other.inner.line);
            let end_line = max_known(self.inner.end_line, other.inner.end_line);
            (a_base.to_string(), line, end_line)
        } else {
            let a_full = self.description();
            let b_full = other.description();
            (
                format!(
                    "{}{},{}",
                    MERGE_OF_PREFIX,
                    strip_merge_prefix(&a_full),
                    strip_merge_prefix(&b_full)
                ),
                None,
                None,
            )
        };

        let comments = if self.inner.comments == other.inner.comments {
            self.inner.comments.clone()
        } else {
            let mut c = self.inner.comments.clone();
            c.extend(other.inner.comments.iter().cloned());
            c
        };

        Self::from_data(OriginData {
            description,
            line,
            end_line,
            comments,
        })
    }

    /// Folds a sequence of origins left to right. `None` for an empty sequence.
    pub fn merge_all<'a, I>(origins: I) -> Option<Origin>
    where
        I: IntoIterator<Item = &'a Origin>,
    {
        origins.into_iter().fold(None, |acc: Option<Origin>, o| match acc {
            None => Some(o.clone()),
            Some(merged) => Some(merged.merge(o)),
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

fn strip_merge_prefix(s: &str) -> &str {
    s.strip_prefix(MERGE_OF_PREFIX).unwrap_or(s)
}

fn min_known(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

fn max_known(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_with_lines() {
        let o = Origin::new("app.json");
        assert_eq!(o.description(), "app.json");
        assert_eq!(o.with_line(4).description(), "app.json: 4");
    }

    #[test]
    fn test_merge_same_source_gives_line_range() {
        let a = Origin::new("app.json").with_line(3);
        let b = Origin::new("app.json").with_line(7);
        let merged = a.merge(&b);
        assert_eq!(merged.description(), "app.json: 3-7");
        assert_eq!(merged.line(), Some(3));
    }

    #[test]
    fn test_merge_different_sources() {
        let a = Origin::new("app.json").with_line(2);
        let b = Origin::new("env variables");
        let merged = a.merge(&b);
        assert_eq!(merged.description(), "merge of app.json: 2,env variables");

        // nesting does not stack prefixes
        let c = Origin::new("system properties");
        assert_eq!(
            merged.merge(&c).description(),
            "merge of app.json: 2,env variables,system properties"
        );
    }

    #[test]
    fn test_merge_comments() {
        let a = Origin::new("a").with_comments(vec!["one".into()]);
        let b = Origin::new("a").with_comments(vec!["two".into()]);
        assert_eq!(a.merge(&b).comments(), &["one".to_string(), "two".to_string()]);
        assert_eq!(a.merge(&a.clone()).comments(), &["one".to_string()]);
    }

    #[test]
    fn test_merge_all() {
        assert!(Origin::merge_all(std::iter::empty()).is_none());
        let a = Origin::new("x");
        let b = Origin::new("y");
        let merged = Origin::merge_all([&a, &b]).unwrap();
        assert_eq!(merged.description(), "merge of x,y");
    }

    #[test]
    fn test_hardcoded_is_shared() {
        assert!(Origin::hardcoded().ptr_eq(&Origin::hardcoded()));
    }
}
