// Author: Dustin Pilgrim
// License: MIT

//! Ready-made trees from outside the program: the process environment, a few
//! facts about the host, in-memory maps and JSON text.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::convert::ToConfigValue;
use crate::error::Result;
use crate::origin::Origin;
use crate::value::Value;

pub mod json;
mod system;

pub use system::system_properties;

static ENV_VARIABLES: Lazy<Value> = Lazy::new(load_env_variables);

/// The process environment as a flat object of strings.
///
/// Read once per process; later changes to the environment are not seen.
pub fn env_variables() -> &'static Value {
    &ENV_VARIABLES
}

fn load_env_variables() -> Value {
    // variables that are not valid UTF-8 cannot be represented and are skipped
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    vars.sort();

    let mut fields = IndexMap::with_capacity(vars.len());
    for (key, value) in vars {
        let origin = Origin::new(format!("env var {}", key));
        fields.insert(key, Value::string(origin, value));
    }
    log::debug!("loaded {} environment variables", fields.len());
    Value::object(Origin::new("env variables"), fields)
}

/// Builds a flat object from key/value pairs. Keys are taken literally, not as paths.
pub fn from_map<K, V, I>(entries: I, description: &str) -> Result<Value>
where
    K: AsRef<str>,
    V: ToConfigValue,
    I: IntoIterator<Item = (K, V)>,
{
    let origin = Origin::new(description);
    let mut fields = IndexMap::new();
    for (key, value) in entries {
        fields.insert(key.as_ref().to_string(), value.to_config_value(&origin)?);
    }
    Ok(Value::object(origin, fields))
}
