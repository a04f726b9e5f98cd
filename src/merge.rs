// Author: Dustin Pilgrim
// License: MIT

//! Precedence composition of configuration trees.
//!
//! `primary.with_fallback(&secondary)` keeps everything `primary` defines and
//! lets `secondary` fill the gaps. Objects merge key by key. A resolved
//! non-object hides whatever lies beneath it. When either side still holds a
//! substitution the outcome cannot be known yet, so the layers are kept in a
//! [`DelayedMerge`] for the resolver to collapse later.

use indexmap::IndexMap;

use crate::origin::Origin;
use crate::value::{merge_origins, ConfigObject, DelayedMerge, Value, ValueKind};

impl Value {
    /// Returns a value where `self` wins and `fallback` fills in what `self` lacks.
    pub fn with_fallback(&self, fallback: &Value) -> Value {
        if self.ignores_fallbacks() {
            return self.clone();
        }

        if let Some(unmerged) = fallback.unmerged_values() {
            return delay_merge(self, unmerged);
        }

        match (self.kind(), fallback.kind()) {
            (ValueKind::Object(primary), ValueKind::Object(secondary)) => {
                merge_objects(self, primary, fallback, secondary)
            }
            _ => merged_with_non_object(self, fallback),
        }
    }
}

/// Folds values in fallback order: the first one has the highest precedence.
pub fn merge_all(values: &[Value]) -> Value {
    let mut iter = values.iter();
    let Some(first) = iter.next() else {
        return Value::from_object(Origin::new("empty config"), ConfigObject::empty());
    };
    iter.fold(first.clone(), |acc, next| acc.with_fallback(next))
}

fn merged_with_non_object(primary: &Value, fallback: &Value) -> Value {
    if primary.is_resolved() {
        // a non-object fallback merges nothing, and also shuts out any
        // objects further down the chain
        match primary.kind() {
            ValueKind::Object(o) => {
                Value::from_object(primary.origin().clone(), o.with_fallbacks_ignored())
            }
            _ => primary.clone(),
        }
    } else {
        // a substitution inside primary may need to look back at the fallback
        delay_merge(primary, vec![fallback.clone()])
    }
}

fn delay_merge(primary: &Value, fallbacks: Vec<Value>) -> Value {
    let mut layers = vec![primary.clone()];
    layers.extend(fallbacks);
    let merge = DelayedMerge::consolidated(layers);
    log::trace!("delaying merge of {} layers", merge.stack().len());
    Value::from_delayed_merge(merge)
}

fn merge_objects(
    primary_value: &Value,
    primary: &ConfigObject,
    fallback_value: &Value,
    fallback: &ConfigObject,
) -> Value {
    let mut merged: IndexMap<String, Value> = IndexMap::with_capacity(primary.len());
    let mut changed = false;

    for (key, first) in primary.iter() {
        let kept = match fallback.get(key) {
            Some(second) => {
                let combined = first.with_fallback(second);
                if combined != *first || combined.ignores_fallbacks() != first.ignores_fallbacks() {
                    changed = true;
                }
                combined
            }
            None => first.clone(),
        };
        merged.insert(key.clone(), kept);
    }
    for (key, second) in fallback.iter() {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), second.clone());
            changed = true;
        }
    }

    let ignores_fallbacks = fallback.ignores_fallbacks();
    let origin = if changed {
        merge_origins(&[primary_value.clone(), fallback_value.clone()])
            .unwrap_or_else(|| primary_value.origin().clone())
    } else {
        primary_value.origin().clone()
    };

    Value::from_object(origin, ConfigObject::from_parts(merged, ignores_fallbacks))
}
