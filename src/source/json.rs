// Author: Dustin Pilgrim
// License: MIT

//! JSON text as a configuration tree.
//!
//! Plain JSON plus two conventions: a string that is exactly `${path}` or
//! `${?path}` becomes a substitution, and a key repeated within one object
//! merges onto its earlier value instead of replacing it.
//!
//! A literal string of that shape is written with one extra leading `$`:
//! `"$${x}"` is the string `${x}`, and `"$$${x}"` is `$${x}`.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::{CairnError, Result};
use crate::origin::Origin;
use crate::path::ConfigPath;
use crate::value::{Number, Value};

static SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{(\?)?([^{}]+)\}$").expect("substitution pattern is valid"));

// Strings that would read back as a substitution or as an escaped literal.
static SUBSTITUTION_SHAPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$+\{[^{}]+\}$").expect("substitution shape pattern is valid"));

/// Adds the escape `$` to a literal string that would otherwise parse as a substitution.
pub(crate) fn escape_literal(s: &str) -> Cow<'_, str> {
    if SUBSTITUTION_SHAPED.is_match(s) {
        Cow::Owned(format!("${}", s))
    } else {
        Cow::Borrowed(s)
    }
}

/// Parses JSON text. Every node gets an origin named by `description`.
///
/// # Examples
/// ```
/// use cairn_cfg::source::json;
///
/// let tree = json::parse_str(r#"{"port": 80, "url": "${host}"}"#, "inline").unwrap();
/// assert!(!tree.is_resolved());
/// ```
pub fn parse_str(text: &str, description: &str) -> Result<Value> {
    let origin = Origin::new(description);
    let mut de = serde_json::Deserializer::from_str(text);
    let value = TreeSeed { origin: &origin }
        .deserialize(&mut de)
        .map_err(|e| parse_error(description, e))?;
    de.end().map_err(|e| parse_error(description, e))?;
    log::trace!("parsed JSON from {}", description);
    Ok(value)
}

fn parse_error(description: &str, e: serde_json::Error) -> CairnError {
    CairnError::Generic {
        message: format!("{}: {}", description, e),
        hint: Some(format!(
            "Check the JSON near line {}, column {}",
            e.line(),
            e.column()
        )),
    }
}

fn string_or_reference(origin: &Origin, s: &str) -> Result<Value> {
    if s.starts_with("$$") && SUBSTITUTION_SHAPED.is_match(s) {
        return Ok(Value::string(origin.clone(), &s[1..]));
    }
    match SUBSTITUTION.captures(s) {
        Some(caps) => {
            let optional = caps.get(1).is_some();
            let path = ConfigPath::parse(caps[2].trim())?;
            Ok(Value::reference(origin.clone(), path, optional))
        }
        None => Ok(Value::string(origin.clone(), s)),
    }
}

struct TreeSeed<'a> {
    origin: &'a Origin,
}

impl<'de> DeserializeSeed<'de> for TreeSeed<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for TreeSeed<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::null(self.origin.clone()))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        self.visit_unit()
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::bool(self.origin.clone(), b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> std::result::Result<Value, E> {
        Ok(Value::int(self.origin.clone(), i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> std::result::Result<Value, E> {
        let number = match i64::try_from(u) {
            Ok(i) => Number::Int(i),
            Err(_) => Number::UInt(u),
        };
        Value::number(self.origin.clone(), number).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> std::result::Result<Value, E> {
        Value::float(self.origin.clone(), f).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        string_or_reference(self.origin, s).map_err(E::custom)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(TreeSeed { origin: self.origin })? {
            items.push(item);
        }
        Ok(Value::list(self.origin.clone(), items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields: IndexMap<String, Value> = IndexMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(TreeSeed { origin: self.origin })?;
            // a repeated key merges, the later value wins
            let merged = match fields.get(&key) {
                Some(earlier) => value.with_fallback(earlier),
                None => value,
            };
            fields.insert(key, merged);
        }
        Ok(Value::object(self.origin.clone(), fields))
    }
}
