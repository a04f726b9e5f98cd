// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;

use crate::error::{CairnError, Result};
use crate::path::ConfigPath;

use super::{Value, ValueKind};

/// A `${path}` placeholder waiting to be replaced during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Substitution {
    path: ConfigPath,
    optional: bool,
    /// Leading keys of `path` that were added by relativizing.
    prefix_length: usize,
}

impl Substitution {
    pub fn new(path: ConfigPath, optional: bool) -> Self {
        Self {
            path,
            optional,
            prefix_length: 0,
        }
    }

    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    /// `${?path}` substitutions resolve to nothing instead of failing.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    /// The path as it was written, before any relativizing.
    pub fn unprefixed_path(&self) -> ConfigPath {
        self.path.sub_path(self.prefix_length)
    }

    pub(crate) fn relativized(&self, prefix: &ConfigPath) -> Substitution {
        Substitution {
            path: self.path.prepend(prefix),
            optional: self.optional,
            prefix_length: self.prefix_length + prefix.len(),
        }
    }

    pub fn render(&self) -> String {
        if self.optional {
            format!("${{?{}}}", self.path.render())
        } else {
            format!("${{{}}}", self.path.render())
        }
    }
}

/// A fallback chain whose shape can only be known after resolution.
///
/// The first layer has the highest precedence. Layers are never themselves
/// delayed merges.
#[derive(Debug, Clone)]
pub struct DelayedMerge {
    stack: Arc<Vec<Value>>,
}

impl DelayedMerge {
    pub fn new(stack: Vec<Value>) -> Result<Self> {
        if stack.is_empty() {
            return Err(CairnError::bug("creating empty delayed merge value"));
        }
        if stack
            .iter()
            .any(|v| matches!(v.kind(), ValueKind::DelayedMerge(_)))
        {
            return Err(CairnError::bug(
                "placed nested delayed merge in a delayed merge, should have consolidated the stack",
            ));
        }
        Ok(Self {
            stack: Arc::new(stack),
        })
    }

    /// Flattens nested delayed merges into one stack.
    pub(crate) fn consolidated<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut stack = Vec::new();
        for layer in layers {
            match layer.kind() {
                ValueKind::DelayedMerge(inner) => stack.extend(inner.stack().iter().cloned()),
                _ => stack.push(layer),
            }
        }
        Self {
            stack: Arc::new(stack),
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub(crate) fn map_layers<F>(&self, f: F) -> DelayedMerge
    where
        F: Fn(&Value) -> Value,
    {
        DelayedMerge::consolidated(self.stack.iter().map(f))
    }
}

impl PartialEq for DelayedMerge {
    fn eq(&self, other: &Self) -> bool {
        self.stack == other.stack
    }
}
