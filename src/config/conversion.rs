// Author: Dustin Pilgrim
// License: MIT

//! Typed extraction from resolved values.
//!
//! Conversions leave the path of a [`CairnError::WrongType`] empty; the
//! [`Config`](super::Config) getters fill it in.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{CairnError, Result};
use crate::value::{ConfigList, ConfigObject, Number, Value, ValueKind};

fn describe(value: &Value) -> String {
    match value.kind() {
        ValueKind::Number { number, .. } => format!("number {}", number.as_f64()),
        ValueKind::String(s) => format!("string {:?}", s),
        ValueKind::Reference(s) => format!("substitution {}", s.render()),
        ValueKind::DelayedMerge(_) => "unresolved merge".to_string(),
        other => match value.value_type() {
            Ok(t) => t.name().to_string(),
            Err(_) => format!("{:?}", other),
        },
    }
}

fn wrong_type(value: &Value, expected: &str) -> CairnError {
    CairnError::WrongType {
        path: String::new(),
        origin: value.origin().description(),
        expected: expected.to_string(),
        actual: describe(value),
    }
}

/// Rejects the kinds no typed getter accepts: null and unresolved placeholders.
fn check_usable(value: &Value, expected: &str) -> Result<()> {
    match value.kind() {
        ValueKind::Null => Err(CairnError::Null {
            path: String::new(),
            expected: expected.to_string(),
        }),
        ValueKind::Reference(s) => Err(CairnError::not_resolved(s.render())),
        ValueKind::DelayedMerge(_) => Err(CairnError::not_resolved("<merge>")),
        _ => Ok(()),
    }
}

/// A number, also accepting strings that spell one.
fn number_of(value: &Value, expected: &str) -> Result<Number> {
    check_usable(value, expected)?;
    match value.kind() {
        ValueKind::Number { number, .. } => Ok(*number),
        ValueKind::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Number::Int(i))
            } else if let Ok(u) = s.parse::<u64>() {
                Ok(Number::UInt(u))
            } else {
                match s.parse::<f64>() {
                    Ok(f) if f.is_finite() => Ok(Number::Float(f)),
                    _ => Err(wrong_type(value, expected)),
                }
            }
        }
        _ => Err(wrong_type(value, expected)),
    }
}

impl TryFrom<Value> for String {
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        check_usable(&value, "string")?;
        match value.kind() {
            ValueKind::String(s) => Ok(s.clone()),
            ValueKind::Bool(b) => Ok(b.to_string()),
            ValueKind::Number { literal: Some(text), .. } => Ok(text.to_string()),
            ValueKind::Number { number, .. } => Ok(match number {
                Number::Int(i) => i.to_string(),
                Number::UInt(u) => u.to_string(),
                Number::Float(f) => f.to_string(),
            }),
            _ => Err(wrong_type(&value, "string")),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        check_usable(&value, "boolean")?;
        match value.kind() {
            ValueKind::Bool(b) => Ok(*b),
            ValueKind::String(s) => match s.trim() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(wrong_type(&value, "boolean")),
            },
            _ => Err(wrong_type(&value, "boolean")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        Ok(number_of(&value, "number")?.as_f64())
    }
}

impl TryFrom<Value> for f32 {
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        let f = number_of(&value, "f32")?.as_f64();
        if f.abs() > f32::MAX as f64 {
            return Err(wrong_type(&value, "f32"));
        }
        Ok(f as f32)
    }
}

macro_rules! integer_try_from {
    ($($t:ty),*) => {
        $(
            impl TryFrom<Value> for $t {
                type Error = CairnError;

                fn try_from(value: Value) -> Result<Self> {
                    let expected = stringify!($t);
                    let n = number_of(&value, expected)?;
                    n.as_i64()
                        .and_then(|i| <$t>::try_from(i).ok())
                        .or_else(|| n.as_u64().and_then(|u| <$t>::try_from(u).ok()))
                        .ok_or_else(|| wrong_type(&value, expected))
                }
            }
        )*
    };
}

integer_try_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl TryFrom<Value> for ConfigList {
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        check_usable(&value, "list")?;
        match value.kind() {
            ValueKind::List(l) => Ok(l.clone()),
            _ => Err(wrong_type(&value, "list")),
        }
    }
}

impl TryFrom<Value> for ConfigObject {
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        check_usable(&value, "object")?;
        match value.kind() {
            ValueKind::Object(o) => Ok(o.clone()),
            _ => Err(wrong_type(&value, "object")),
        }
    }
}

impl<T> TryFrom<Value> for Vec<T>
where
    T: TryFrom<Value, Error = CairnError>,
{
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        let list = ConfigList::try_from(value)?;
        list.iter().cloned().map(T::try_from).collect()
    }
}

impl<T> TryFrom<Value> for HashMap<String, T>
where
    T: TryFrom<Value, Error = CairnError>,
{
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        let object = ConfigObject::try_from(value)?;
        object
            .iter()
            .map(|(k, v)| Ok((k.clone(), T::try_from(v.clone())?)))
            .collect()
    }
}

impl<T> TryFrom<Value> for IndexMap<String, T>
where
    T: TryFrom<Value, Error = CairnError>,
{
    type Error = CairnError;

    fn try_from(value: Value) -> Result<Self> {
        let object = ConfigObject::try_from(value)?;
        object
            .iter()
            .map(|(k, v)| Ok((k.clone(), T::try_from(v.clone())?)))
            .collect()
    }
}
