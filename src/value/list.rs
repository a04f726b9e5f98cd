// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;

use crate::error::{CairnError, Result};

use super::{ResolveStatus, Value};

/// Immutable ordered list of values.
#[derive(Debug, Clone)]
pub struct ConfigList {
    items: Arc<Vec<Value>>,
    status: ResolveStatus,
}

impl ConfigList {
    pub fn new(items: Vec<Value>) -> Self {
        let status = ResolveStatus::from_values(&items);
        Self {
            items: Arc::new(items),
            status,
        }
    }

    /// Builds a list claiming a status; the claim must match the items.
    pub fn with_status(items: Vec<Value>, status: ResolveStatus) -> Result<Self> {
        let actual = ResolveStatus::from_values(&items);
        if actual != status {
            return Err(CairnError::bug(format!(
                "list created with wrong resolve status: claimed {:?}, items are {:?}",
                status, actual
            )));
        }
        Ok(Self {
            items: Arc::new(items),
            status,
        })
    }

    pub fn status(&self) -> ResolveStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn concatenate(&self, other: &ConfigList) -> ConfigList {
        let mut combined = Vec::with_capacity(self.len() + other.len());
        combined.extend(self.items.iter().cloned());
        combined.extend(other.items.iter().cloned());
        ConfigList::new(combined)
    }

    pub(crate) fn map_items<F>(&self, f: F) -> ConfigList
    where
        F: Fn(&Value) -> Value,
    {
        ConfigList::new(self.items.iter().map(f).collect())
    }
}

impl PartialEq for ConfigList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}
