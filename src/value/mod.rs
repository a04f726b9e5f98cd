// Author: Dustin Pilgrim
// License: MIT

//! The configuration value tree.
//!
//! Every node is an immutable [`Value`]: an [`Origin`] plus a [`ValueKind`].
//! Containers share their children through `Arc`, so cloning a subtree is
//! cheap and trees can be handed across threads freely. No node knows its
//! parent; every transformation builds a new node from finished children.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{CairnError, Result};
use crate::origin::Origin;
use crate::path::ConfigPath;

mod list;
mod object;
mod substitution;

pub use list::ConfigList;
pub use object::ConfigObject;
pub use substitution::{DelayedMerge, Substitution};

/// Whether a node (and everything under it) is free of substitutions and pending merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveStatus {
    Resolved,
    Unresolved,
}

impl ResolveStatus {
    pub fn from_values<'a, I>(values: I) -> ResolveStatus
    where
        I: IntoIterator<Item = &'a Value>,
    {
        if values.into_iter().all(Value::is_resolved) {
            ResolveStatus::Resolved
        } else {
            ResolveStatus::Unresolved
        }
    }

    pub fn from_bool(resolved: bool) -> ResolveStatus {
        if resolved {
            ResolveStatus::Resolved
        } else {
            ResolveStatus::Unresolved
        }
    }
}

/// The type tag of a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Object,
    List,
    Number,
    Boolean,
    Null,
    String,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Object => "object",
            ValueType::List => "list",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
            ValueType::String => "string",
        }
    }
}

/// A number in the subtype it was supplied with.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    /// Only used for integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
}

// Whole floats beyond this magnitude are compared as floats.
const WHOLE_LIMIT: f64 = 1.0e38;

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Int(i) => Some(i),
            Number::UInt(u) => i64::try_from(u).ok(),
            Number::Float(_) => self.whole().and_then(|w| i64::try_from(w).ok()),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.whole().and_then(|w| u64::try_from(w).ok())
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// The value as an integer if it has no fractional part.
    fn whole(&self) -> Option<i128> {
        match *self {
            Number::Int(i) => Some(i as i128),
            Number::UInt(u) => Some(u as i128),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < WHOLE_LIMIT => {
                Some(f as i128)
            }
            Number::Float(_) => None,
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            Number::Int(i) => serde_json::Value::from(i),
            Number::UInt(u) => serde_json::Value::from(u),
            Number::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.whole(), other.whole()) {
            (Some(a), Some(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.whole() {
            Some(w) => w.hash(state),
            None => self.as_f64().to_bits().hash(state),
        }
    }
}

/// The variant part of a [`Value`].
#[derive(Debug, Clone)]
pub enum ValueKind {
    Null,
    Bool(bool),
    Number {
        number: Number,
        /// Source text of the literal, used when rendering.
        literal: Option<Arc<str>>,
    },
    String(String),
    List(ConfigList),
    Object(ConfigObject),
    Reference(Substitution),
    DelayedMerge(DelayedMerge),
}

/// One node of a configuration tree.
#[derive(Debug, Clone)]
pub struct Value {
    origin: Origin,
    kind: ValueKind,
}

impl Value {
    pub(crate) fn new(origin: Origin, kind: ValueKind) -> Self {
        Self { origin, kind }
    }

    pub fn null(origin: Origin) -> Self {
        Self::new(origin, ValueKind::Null)
    }

    pub fn bool(origin: Origin, b: bool) -> Self {
        Self::new(origin, ValueKind::Bool(b))
    }

    /// Fails with `Generic` for NaN and infinite floats, which have no place in a tree.
    pub fn number(origin: Origin, number: Number) -> Result<Self> {
        Ok(Self::new(
            origin,
            ValueKind::Number {
                number: finite(number)?,
                literal: None,
            },
        ))
    }

    /// A number remembering the text it was parsed from.
    pub fn number_literal(origin: Origin, number: Number, literal: &str) -> Result<Self> {
        Ok(Self::new(
            origin,
            ValueKind::Number {
                number: finite(number)?,
                literal: Some(Arc::from(literal)),
            },
        ))
    }

    pub fn int(origin: Origin, i: i64) -> Self {
        Self::new(
            origin,
            ValueKind::Number {
                number: Number::Int(i),
                literal: None,
            },
        )
    }

    pub fn float(origin: Origin, f: f64) -> Result<Self> {
        Self::number(origin, Number::Float(f))
    }

    pub fn string(origin: Origin, s: impl Into<String>) -> Self {
        Self::new(origin, ValueKind::String(s.into()))
    }

    pub fn list(origin: Origin, items: Vec<Value>) -> Self {
        Self::new(origin, ValueKind::List(ConfigList::new(items)))
    }

    pub fn object(origin: Origin, fields: IndexMap<String, Value>) -> Self {
        Self::new(origin, ValueKind::Object(ConfigObject::new(fields)))
    }

    pub fn from_object(origin: Origin, object: ConfigObject) -> Self {
        Self::new(origin, ValueKind::Object(object))
    }

    pub fn reference(origin: Origin, path: ConfigPath, optional: bool) -> Self {
        Self::new(
            origin,
            ValueKind::Reference(Substitution::new(path, optional)),
        )
    }

    /// Builds a delayed merge node from an explicit stack.
    ///
    /// Fails with `BugOrBroken` on an empty stack or a nested delayed merge.
    pub fn delayed_merge(stack: Vec<Value>) -> Result<Self> {
        let merge = DelayedMerge::new(stack)?;
        Ok(Self::from_delayed_merge(merge))
    }

    pub(crate) fn from_delayed_merge(merge: DelayedMerge) -> Self {
        let origin = merge_origins(merge.stack()).unwrap_or_else(Origin::hardcoded);
        Self::new(origin, ValueKind::DelayedMerge(merge))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn resolve_status(&self) -> ResolveStatus {
        match &self.kind {
            ValueKind::List(l) => l.status(),
            ValueKind::Object(o) => o.status(),
            ValueKind::Reference(_) | ValueKind::DelayedMerge(_) => ResolveStatus::Unresolved,
            _ => ResolveStatus::Resolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolve_status() == ResolveStatus::Resolved
    }

    /// Type tag of the value; placeholder nodes have none until resolved.
    pub fn value_type(&self) -> Result<ValueType> {
        Ok(match &self.kind {
            ValueKind::Null => ValueType::Null,
            ValueKind::Bool(_) => ValueType::Boolean,
            ValueKind::Number { .. } => ValueType::Number,
            ValueKind::String(_) => ValueType::String,
            ValueKind::List(_) => ValueType::List,
            ValueKind::Object(_) => ValueType::Object,
            ValueKind::Reference(s) => return Err(CairnError::not_resolved(s.render())),
            ValueKind::DelayedMerge(_) => return Err(CairnError::not_resolved("<merge>")),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_object(&self) -> Option<&ConfigObject> {
        match &self.kind {
            ValueKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ConfigList> {
        match &self.kind {
            ValueKind::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self.kind {
            ValueKind::Number { number, .. } => Some(number),
            _ => None,
        }
    }

    /// Unresolved placeholder nodes: references and delayed merges.
    ///
    /// These can never be merged into directly; a fallback of this kind always
    /// defers the merge until resolution.
    pub fn unmerged_values(&self) -> Option<Vec<Value>> {
        match &self.kind {
            ValueKind::Reference(_) => Some(vec![self.clone()]),
            ValueKind::DelayedMerge(m) => Some(m.stack().to_vec()),
            _ => None,
        }
    }

    /// Projection to plain JSON-shaped data, dropping origins.
    pub fn unwrapped(&self) -> Result<serde_json::Value> {
        Ok(match &self.kind {
            ValueKind::Null => serde_json::Value::Null,
            ValueKind::Bool(b) => serde_json::Value::Bool(*b),
            ValueKind::Number { number, .. } => number.to_json(),
            ValueKind::String(s) => serde_json::Value::String(s.clone()),
            ValueKind::List(l) => serde_json::Value::Array(
                l.iter().map(Value::unwrapped).collect::<Result<Vec<_>>>()?,
            ),
            ValueKind::Object(o) => {
                let mut map = serde_json::Map::new();
                for (k, v) in o.iter() {
                    let inner = v.unwrapped().map_err(|e| e.improve_not_resolved(k))?;
                    map.insert(k.clone(), inner);
                }
                serde_json::Value::Object(map)
            }
            ValueKind::Reference(s) => return Err(CairnError::not_resolved(s.render())),
            ValueKind::DelayedMerge(_) => return Err(CairnError::not_resolved("<merge>")),
        })
    }

    pub fn with_origin(&self, origin: Origin) -> Value {
        if self.origin.ptr_eq(&origin) {
            return self.clone();
        }
        Self::new(origin, self.kind.clone())
    }

    /// Rewrites every substitution in the subtree as if the tree lived under `prefix`.
    ///
    /// Used when a tree parsed on its own gets inserted at a non-root location:
    /// a `${a.b}` inside it must then look up `${prefix.a.b}`.
    pub fn relativized(&self, prefix: &ConfigPath) -> Value {
        if prefix.is_root() {
            return self.clone();
        }
        let kind = match &self.kind {
            ValueKind::Reference(s) => ValueKind::Reference(s.relativized(prefix)),
            ValueKind::List(l) => ValueKind::List(l.map_items(|v| v.relativized(prefix))),
            ValueKind::Object(o) => ValueKind::Object(o.map_values(|v| v.relativized(prefix))),
            ValueKind::DelayedMerge(m) => {
                ValueKind::DelayedMerge(m.map_layers(|v| v.relativized(prefix)))
            }
            _ => return self.clone(),
        };
        Self::new(self.origin.clone(), kind)
    }

    /// Whether merging anything underneath this value would be pointless.
    ///
    /// Resolved non-objects always shadow their fallbacks; objects only after
    /// they have been merged onto a non-object; a delayed merge takes the
    /// answer from its last layer.
    pub fn ignores_fallbacks(&self) -> bool {
        match &self.kind {
            ValueKind::Object(o) => o.ignores_fallbacks(),
            ValueKind::DelayedMerge(m) => m.stack().last().is_some_and(Value::ignores_fallbacks),
            ValueKind::Reference(_) => false,
            _ => self.is_resolved(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self.kind {
            ValueKind::Null => 0,
            ValueKind::Bool(_) => 1,
            ValueKind::Number { .. } => 2,
            ValueKind::String(_) => 3,
            ValueKind::List(_) => 4,
            ValueKind::Object(_) => 5,
            ValueKind::Reference(_) => 6,
            ValueKind::DelayedMerge(_) => 7,
        }
    }
}

fn finite(number: Number) -> Result<Number> {
    match number {
        Number::Float(f) if !f.is_finite() => Err(CairnError::Generic {
            message: format!("cannot store non-finite number {} in a configuration", f),
            hint: Some("Use a string if the value really is NaN or infinite".into()),
        }),
        _ => Ok(number),
    }
}

/// Merges the origins of a set of values, skipping empty objects which only add noise.
pub(crate) fn merge_origins(values: &[Value]) -> Option<Origin> {
    let meaningful: Vec<&Origin> = values
        .iter()
        .filter(|v| !v.as_object().is_some_and(ConfigObject::is_empty))
        .map(Value::origin)
        .collect();
    if meaningful.is_empty() {
        Origin::merge_all(values.iter().map(Value::origin))
    } else {
        Origin::merge_all(meaningful)
    }
}

// Origin is not part of equality.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Number { number: a, .. }, ValueKind::Number { number: b, .. }) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => a == b,
            (ValueKind::Object(a), ValueKind::Object(b)) => a == b,
            (ValueKind::Reference(a), ValueKind::Reference(b)) => a == b,
            (ValueKind::DelayedMerge(a), ValueKind::DelayedMerge(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match &self.kind {
            ValueKind::Null => {}
            ValueKind::Bool(b) => b.hash(state),
            ValueKind::Number { number, .. } => number.hash(state),
            ValueKind::String(s) => s.hash(state),
            ValueKind::List(l) => {
                for v in l.iter() {
                    v.hash(state);
                }
            }
            ValueKind::Object(o) => {
                // key order is irrelevant to equality, so combine entries commutatively
                let mut combined: u64 = 0;
                for (k, v) in o.iter() {
                    let mut h = DefaultHasher::new();
                    k.hash(&mut h);
                    v.hash(&mut h);
                    combined = combined.wrapping_add(h.finish());
                }
                o.len().hash(state);
                combined.hash(state);
            }
            ValueKind::Reference(s) => s.hash(state),
            ValueKind::DelayedMerge(m) => {
                for v in m.stack() {
                    v.hash(state);
                }
            }
        }
    }
}
