// Author: Dustin Pilgrim
// License: MIT

//! Conversion of native Rust data into configuration trees.
//!
//! [`from_any`] is the entry point for values built in code. Numbers keep the
//! subtype they were supplied with. Values created with the default
//! "hardcoded value" origin share a few canonical nodes (`true`, `false`,
//! `null`, the empty list and the empty object).

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{CairnError, Result};
use crate::origin::Origin;
use crate::path::ConfigPath;
use crate::value::{ConfigObject, Number, Value};

static TRUE: Lazy<Value> = Lazy::new(|| Value::bool(Origin::hardcoded(), true));
static FALSE: Lazy<Value> = Lazy::new(|| Value::bool(Origin::hardcoded(), false));
static NULL: Lazy<Value> = Lazy::new(|| Value::null(Origin::hardcoded()));
static EMPTY_LIST: Lazy<Value> = Lazy::new(|| Value::list(Origin::hardcoded(), Vec::new()));
static EMPTY_OBJECT: Lazy<Value> =
    Lazy::new(|| Value::from_object(Origin::hardcoded(), ConfigObject::empty()));

fn is_hardcoded(origin: &Origin) -> bool {
    origin.ptr_eq(&Origin::hardcoded())
}

fn bool_value(origin: &Origin, b: bool) -> Value {
    match (is_hardcoded(origin), b) {
        (true, true) => TRUE.clone(),
        (true, false) => FALSE.clone(),
        (false, _) => Value::bool(origin.clone(), b),
    }
}

fn null_value(origin: &Origin) -> Value {
    if is_hardcoded(origin) {
        NULL.clone()
    } else {
        Value::null(origin.clone())
    }
}

fn list_value(origin: &Origin, items: Vec<Value>) -> Value {
    if items.is_empty() && is_hardcoded(origin) {
        EMPTY_LIST.clone()
    } else {
        Value::list(origin.clone(), items)
    }
}

fn object_value(origin: &Origin, fields: IndexMap<String, Value>) -> Value {
    if fields.is_empty() && is_hardcoded(origin) {
        EMPTY_OBJECT.clone()
    } else {
        Value::object(origin.clone(), fields)
    }
}

/// Native data that can become a configuration value.
pub trait ToConfigValue {
    fn to_config_value(&self, origin: &Origin) -> Result<Value>;
}

impl<T: ToConfigValue + ?Sized> ToConfigValue for &T {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        (**self).to_config_value(origin)
    }
}

impl ToConfigValue for Value {
    fn to_config_value(&self, _origin: &Origin) -> Result<Value> {
        Ok(self.clone())
    }
}

impl ToConfigValue for bool {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        Ok(bool_value(origin, *self))
    }
}

macro_rules! signed_to_config {
    ($($t:ty),*) => {
        $(
            impl ToConfigValue for $t {
                fn to_config_value(&self, origin: &Origin) -> Result<Value> {
                    Ok(Value::int(origin.clone(), *self as i64))
                }
            }
        )*
    };
}

macro_rules! unsigned_to_config {
    ($($t:ty),*) => {
        $(
            impl ToConfigValue for $t {
                fn to_config_value(&self, origin: &Origin) -> Result<Value> {
                    let wide = *self as u64;
                    let number = match i64::try_from(wide) {
                        Ok(i) => Number::Int(i),
                        Err(_) => Number::UInt(wide),
                    };
                    Value::number(origin.clone(), number)
                }
            }
        )*
    };
}

signed_to_config!(i8, i16, i32, i64, isize);
unsigned_to_config!(u8, u16, u32, u64, usize);

fn float_value(origin: &Origin, f: f64) -> Result<Value> {
    Value::float(origin.clone(), f)
}

impl ToConfigValue for f64 {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        float_value(origin, *self)
    }
}

impl ToConfigValue for f32 {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        float_value(origin, f64::from(*self))
    }
}

impl ToConfigValue for str {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        Ok(Value::string(origin.clone(), self))
    }
}

impl ToConfigValue for String {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        self.as_str().to_config_value(origin)
    }
}

impl<T: ToConfigValue> ToConfigValue for Option<T> {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        match self {
            Some(v) => v.to_config_value(origin),
            None => Ok(null_value(origin)),
        }
    }
}

impl<T: ToConfigValue> ToConfigValue for [T] {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        let items = self
            .iter()
            .map(|v| v.to_config_value(origin))
            .collect::<Result<Vec<_>>>()?;
        Ok(list_value(origin, items))
    }
}

impl<T: ToConfigValue> ToConfigValue for Vec<T> {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        self.as_slice().to_config_value(origin)
    }
}

fn object_from_entries<'a, K, V, I>(entries: I, origin: &Origin) -> Result<Value>
where
    K: AsRef<str> + 'a,
    V: ToConfigValue + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut fields = IndexMap::new();
    for (k, v) in entries {
        fields.insert(k.as_ref().to_string(), v.to_config_value(origin)?);
    }
    Ok(object_value(origin, fields))
}

impl<K: AsRef<str>, V: ToConfigValue, S: BuildHasher> ToConfigValue for HashMap<K, V, S> {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        // sorted, so the same map always renders the same way
        let mut entries: Vec<(&K, &V)> = self.iter().collect();
        entries.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
        object_from_entries(entries, origin)
    }
}

impl<K: AsRef<str>, V: ToConfigValue> ToConfigValue for BTreeMap<K, V> {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        object_from_entries(self.iter(), origin)
    }
}

impl<K: AsRef<str>, V: ToConfigValue, S: BuildHasher> ToConfigValue for IndexMap<K, V, S> {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        object_from_entries(self.iter(), origin)
    }
}

impl ToConfigValue for serde_json::Value {
    fn to_config_value(&self, origin: &Origin) -> Result<Value> {
        match self {
            serde_json::Value::Null => Ok(null_value(origin)),
            serde_json::Value::Bool(b) => Ok(bool_value(origin, *b)),
            serde_json::Value::Number(n) => json_number(n, origin),
            serde_json::Value::String(s) => Ok(Value::string(origin.clone(), s.as_str())),
            serde_json::Value::Array(items) => items.as_slice().to_config_value(origin),
            serde_json::Value::Object(map) => object_from_entries(map.iter(), origin),
        }
    }
}

pub(crate) fn json_number(n: &serde_json::Number, origin: &Origin) -> Result<Value> {
    let number = if let Some(i) = n.as_i64() {
        Number::Int(i)
    } else if let Some(u) = n.as_u64() {
        Number::UInt(u)
    } else if let Some(f) = n.as_f64() {
        return float_value(origin, f);
    } else {
        return Err(CairnError::generic(format!("unsupported number {}", n)));
    };
    Value::number(origin.clone(), number)
}

fn origin_for(description: Option<&str>) -> Origin {
    description.map_or_else(Origin::hardcoded, Origin::new)
}

/// Converts native data into a value.
///
/// Without a description the value gets the shared "hardcoded value" origin.
///
/// # Examples
/// ```
/// use cairn_cfg::convert::from_any;
///
/// let v = from_any(&vec![1u8, 2, 3], Some("defaults")).unwrap();
/// assert_eq!(v.as_list().unwrap().len(), 3);
/// ```
pub fn from_any<T: ToConfigValue + ?Sized>(value: &T, origin_description: Option<&str>) -> Result<Value> {
    value.to_config_value(&origin_for(origin_description))
}

/// Converts anything serde can serialize, going through `serde_json`.
pub fn from_serializable<T: Serialize + ?Sized>(value: &T, origin_description: Option<&str>) -> Result<Value> {
    let json = serde_json::to_value(value)?;
    from_any(&json, origin_description)
}

enum PathNode {
    Leaf(Value),
    Branch(IndexMap<String, PathNode>),
}

impl PathNode {
    fn into_value(self, origin: &Origin) -> Value {
        match self {
            PathNode::Leaf(v) => v,
            PathNode::Branch(children) => {
                let fields = children
                    .into_iter()
                    .map(|(k, node)| (k, node.into_value(origin)))
                    .collect();
                object_value(origin, fields)
            }
        }
    }
}

/// Builds an object from a map whose keys are path expressions.
///
/// `{"a.b": 1, "a.c": 2}` becomes `{a: {b: 1, c: 2}}`. When a key is both a
/// leaf and the parent of another key, the object wins and the leaf is dropped.
pub fn from_path_map<K, V, I>(entries: I, origin_description: Option<&str>) -> Result<Value>
where
    K: AsRef<str>,
    V: ToConfigValue,
    I: IntoIterator<Item = (K, V)>,
{
    let origin = origin_for(origin_description);
    let mut root: IndexMap<String, PathNode> = IndexMap::new();

    for (key, value) in entries {
        let path = ConfigPath::parse(key.as_ref())?;
        let leaf = value.to_config_value(&origin)?;
        let Some((last, parents)) = path.keys().split_last() else {
            continue;
        };

        let mut current = &mut root;
        for parent in parents {
            let node = current
                .entry(parent.clone())
                .or_insert_with(|| PathNode::Branch(IndexMap::new()));
            if let PathNode::Leaf(_) = node {
                log::trace!("'{}' is also a parent path, dropping its value", parent);
                *node = PathNode::Branch(IndexMap::new());
            }
            match node {
                PathNode::Branch(children) => current = children,
                PathNode::Leaf(_) => return Err(CairnError::bug("path map leaf survived promotion")),
            }
        }

        match current.get(last) {
            Some(PathNode::Branch(_)) => {
                log::trace!("'{}' is also a parent path, dropping its value", path);
            }
            _ => {
                current.insert(last.clone(), PathNode::Leaf(leaf));
            }
        }
    }

    Ok(PathNode::Branch(root).into_value(&origin))
}
