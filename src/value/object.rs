// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{CairnError, Result};
use crate::path::ConfigPath;

use super::{ResolveStatus, Value, ValueKind};

/// Immutable mapping from keys to values.
///
/// Key order is kept for rendering and listing but does not matter for equality.
#[derive(Debug, Clone)]
pub struct ConfigObject {
    fields: Arc<IndexMap<String, Value>>,
    status: ResolveStatus,
    ignores_fallbacks: bool,
}

impl ConfigObject {
    pub fn new(fields: IndexMap<String, Value>) -> Self {
        let status = ResolveStatus::from_values(fields.values());
        Self {
            fields: Arc::new(fields),
            status,
            ignores_fallbacks: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(IndexMap::new())
    }

    /// Builds an object claiming a status; the claim must match the fields.
    pub fn with_status(
        fields: IndexMap<String, Value>,
        status: ResolveStatus,
        ignores_fallbacks: bool,
    ) -> Result<Self> {
        let actual = ResolveStatus::from_values(fields.values());
        if actual != status {
            return Err(CairnError::bug(format!(
                "object created with wrong resolve status: claimed {:?}, fields are {:?}",
                status, actual
            )));
        }
        Ok(Self {
            fields: Arc::new(fields),
            status,
            ignores_fallbacks,
        })
    }

    pub(crate) fn from_parts(fields: IndexMap<String, Value>, ignores_fallbacks: bool) -> Self {
        let status = ResolveStatus::from_values(fields.values());
        Self {
            fields: Arc::new(fields),
            status,
            ignores_fallbacks,
        }
    }

    pub fn status(&self) -> ResolveStatus {
        self.status
    }

    pub fn ignores_fallbacks(&self) -> bool {
        self.ignores_fallbacks
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A copy that refuses any further fallbacks.
    pub fn with_fallbacks_ignored(&self) -> ConfigObject {
        if self.ignores_fallbacks {
            return self.clone();
        }
        Self {
            fields: Arc::clone(&self.fields),
            status: self.status,
            ignores_fallbacks: true,
        }
    }

    /// A copy with `key` set to `value`, replacing any existing entry.
    pub fn with_value(&self, key: &str, value: Value) -> ConfigObject {
        let mut fields = (*self.fields).clone();
        fields.insert(key.to_string(), value);
        self.rebuilt(fields)
    }

    pub fn without_key(&self, key: &str) -> ConfigObject {
        if !self.fields.contains_key(key) {
            return self.clone();
        }
        let mut fields = (*self.fields).clone();
        fields.shift_remove(key);
        self.rebuilt(fields)
    }

    /// A copy holding only `key`, or an empty object if it is absent.
    pub fn with_only_key(&self, key: &str) -> ConfigObject {
        let mut fields = IndexMap::new();
        if let Some(v) = self.fields.get(key) {
            fields.insert(key.to_string(), v.clone());
        }
        self.rebuilt(fields)
    }

    /// Walks a path through nested objects without resolving anything.
    ///
    /// Returns `Ok(None)` when a key is missing or the walk meets a resolved
    /// non-object, and `NotResolved` when it meets a placeholder it would have
    /// to see through.
    pub fn peek_path(&self, path: &ConfigPath) -> Result<Option<&Value>> {
        let mut current = self;
        let keys = path.keys();
        for (i, key) in keys.iter().enumerate() {
            let Some(v) = current.get(key) else {
                return Ok(None);
            };
            if i + 1 == keys.len() {
                return Ok(Some(v));
            }
            match v.kind() {
                ValueKind::Object(o) => current = o,
                ValueKind::Reference(_) | ValueKind::DelayedMerge(_) => {
                    let so_far = ConfigPath::from_keys(keys[..=i].iter().cloned());
                    return Err(CairnError::not_resolved(so_far.render()));
                }
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    pub(crate) fn map_values<F>(&self, f: F) -> ConfigObject
    where
        F: Fn(&Value) -> Value,
    {
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), f(v)))
            .collect::<IndexMap<_, _>>();
        self.rebuilt(fields)
    }

    fn rebuilt(&self, fields: IndexMap<String, Value>) -> ConfigObject {
        let status = ResolveStatus::from_values(fields.values());
        Self {
            fields: Arc::new(fields),
            status,
            ignores_fallbacks: self.ignores_fallbacks,
        }
    }
}

impl PartialEq for ConfigObject {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality ignores insertion order
        *self.fields == *other.fields
    }
}

impl Default for ConfigObject {
    fn default() -> Self {
        Self::empty()
    }
}
