// Author: Dustin Pilgrim
// License: MIT

//! Builders and proptest strategies shared by the unit tests.

use indexmap::IndexMap;
use proptest::prelude::*;

use crate::origin::Origin;
use crate::path::ConfigPath;
use crate::value::{Value, ValueKind};

pub(crate) fn origin() -> Origin {
    Origin::new("test")
}

pub(crate) fn obj(fields: &[(&str, Value)]) -> Value {
    let map: IndexMap<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Value::object(origin(), map)
}

pub(crate) fn list(items: &[Value]) -> Value {
    Value::list(origin(), items.to_vec())
}

pub(crate) fn int(i: i64) -> Value {
    Value::int(origin(), i)
}

pub(crate) fn str_val(s: &str) -> Value {
    Value::string(origin(), s)
}

pub(crate) fn null() -> Value {
    Value::null(origin())
}

pub(crate) fn reference(path: &str) -> Value {
    Value::reference(origin(), ConfigPath::parse(path).unwrap(), false)
}

pub(crate) fn optional_reference(path: &str) -> Value {
    Value::reference(origin(), ConfigPath::parse(path).unwrap(), true)
}

/// Paths to every non-object value in an object tree.
pub(crate) fn leaf_paths(value: &Value) -> Vec<ConfigPath> {
    fn walk(value: &Value, here: &ConfigPath, out: &mut Vec<ConfigPath>) {
        match value.kind() {
            ValueKind::Object(o) => {
                for (k, v) in o.iter() {
                    walk(v, &here.child(k), out);
                }
            }
            _ if !here.is_root() => out.push(here.clone()),
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(value, &ConfigPath::root(), &mut out);
    out
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(null()),
        any::<bool>().prop_map(|b| Value::bool(origin(), b)),
        (-1000i64..1000).prop_map(int),
        (-1000.0f64..1000.0).prop_map(|f| Value::float(origin(), f).unwrap()),
        arb_text().prop_map(|s| str_val(&s)),
    ]
}

/// Any text, with extra weight on quoting hazards and substitution-shaped strings.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,8}",
        any::<String>(),
        r#"[\\"$ {}?\n\tä€]{0,6}"#,
        r"\$\{\??[a-z .]{1,4}\}",
        r"\${2,3}\{\??[a-z .]{1,4}\}",
    ]
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a".to_string()),
        Just("b".to_string()),
        Just("c".to_string()),
        Just("d".to_string()),
    ]
}

/// Resolved values of bounded depth, biased towards overlapping keys.
pub(crate) fn arb_resolved_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| list(&items)),
            prop::collection::vec((arb_key(), inner), 0..4).prop_map(|pairs| {
                let map: IndexMap<String, Value> = pairs.into_iter().collect();
                Value::object(origin(), map)
            }),
        ]
    })
}

pub(crate) fn arb_resolved_object() -> impl Strategy<Value = Value> {
    prop::collection::vec((arb_key(), arb_resolved_value()), 0..4).prop_map(|pairs| {
        let map: IndexMap<String, Value> = pairs.into_iter().collect();
        Value::object(origin(), map)
    })
}
