// Author: Dustin Pilgrim
// License: MIT

use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{CairnError, Result};
use crate::merge::merge_all;
use crate::origin::Origin;
use crate::path::ConfigPath;
use crate::render::{render, RenderOptions};
use crate::resolver::{self, ResolveOptions};
use crate::source;
use crate::value::{ConfigObject, Value, ValueKind};

mod access;
mod conversion;
mod validation;

static EMPTY_OBJECT: Lazy<ConfigObject> = Lazy::new(ConfigObject::empty);

/// A configuration tree rooted at an object.
///
/// Layers are combined with [`Config::with_fallback`] or [`Config::layered`],
/// then [`Config::resolve`] replaces substitutions. Getters only read resolved
/// values.
///
/// # Example
/// ```
/// use cairn_cfg::Config;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let defaults = Config::from_json(r#"{"host": "localhost", "port": 80}"#, "defaults")?;
/// let app = Config::from_json(r#"{"host": "example.org", "url": "${host}"}"#, "app")?;
///
/// let config = app.with_fallback(&defaults).resolve()?;
/// let url: String = config.get("url")?;
/// let port: u16 = config.get("port")?;
/// assert_eq!((url.as_str(), port), ("example.org", 80));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
}

impl Config {
    /// Wraps a tree; the root must be an object.
    pub fn from_value(root: Value) -> Result<Self> {
        match root.kind() {
            ValueKind::Object(_) => Ok(Self { root }),
            _ => Err(CairnError::WrongType {
                path: String::new(),
                origin: root.origin().description(),
                expected: "object at the root of a configuration".into(),
                actual: root
                    .value_type()
                    .map(|t| t.name().to_string())
                    .unwrap_or_else(|_| "unresolved value".into()),
            }),
        }
    }

    /// An empty configuration whose origin is `description`.
    pub fn empty(description: &str) -> Self {
        Self {
            root: Value::from_object(Origin::new(description), ConfigObject::empty()),
        }
    }

    /// Parse a configuration from JSON text, where `"${path}"` strings are substitutions.
    pub fn from_json(text: &str, description: &str) -> Result<Self> {
        Self::from_value(source::json::parse_str(text, description)?)
    }

    /// The process environment, one key per variable.
    pub fn system_environment() -> Self {
        Self {
            root: source::env_variables().clone(),
        }
    }

    /// Host facts such as `os.name` and `user.home`.
    pub fn system_properties() -> Self {
        Self {
            root: source::system_properties(),
        }
    }

    /// Merges configurations in precedence order: the first one wins.
    pub fn layered(layers: &[Config]) -> Self {
        let roots: Vec<Value> = layers.iter().map(|c| c.root.clone()).collect();
        Self {
            root: merge_all(&roots),
        }
    }

    /// A configuration where `self` wins and `fallback` fills the gaps.
    pub fn with_fallback(&self, fallback: &Config) -> Self {
        Self {
            root: self.root.with_fallback(&fallback.root),
        }
    }

    /// Resolves every substitution, falling back to environment variables.
    pub fn resolve(&self) -> Result<Self> {
        self.resolve_with(&ResolveOptions::default())
    }

    pub fn resolve_with(&self, options: &ResolveOptions) -> Result<Self> {
        Self::from_value(resolver::resolve(&self.root, options)?)
    }

    /// Resolves the subtree at `path` only. Substitutions there may still point anywhere.
    pub fn resolve_path(&self, path: &str, options: &ResolveOptions) -> Result<Self> {
        let parsed = ConfigPath::parse(path)?;
        Self::from_value(resolver::resolve_restricted(&self.root, &parsed, options)?)
    }

    pub fn is_resolved(&self) -> bool {
        self.root.is_resolved()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn origin(&self) -> &Origin {
        self.root.origin()
    }

    pub fn render(&self, options: &RenderOptions) -> String {
        render(&self.root, options)
    }

    /// A configuration holding only the subtree at `path`, or nothing if it is absent.
    pub fn with_only_path(&self, path: &str) -> Result<Self> {
        let parsed = ConfigPath::parse(path)?;
        let object = only_path(self.object(), parsed.keys())
            .map_err(|e| e.improve_not_resolved(path))?
            .unwrap_or_default();
        Ok(self.with_object(object))
    }

    /// A configuration without the subtree at `path`.
    pub fn without_path(&self, path: &str) -> Result<Self> {
        let parsed = ConfigPath::parse(path)?;
        let object = without_path(self.object(), parsed.keys())
            .map_err(|e| e.improve_not_resolved(path))?;
        Ok(self.with_object(object))
    }

    /// A configuration with `value` placed at `path`, creating objects on the way.
    pub fn with_value(&self, path: &str, value: Value) -> Result<Self> {
        let parsed = ConfigPath::parse(path)?;
        Ok(self.with_object(with_path_value(self.object(), parsed.keys(), value)))
    }

    fn object(&self) -> &ConfigObject {
        self.root.as_object().unwrap_or(&EMPTY_OBJECT)
    }

    fn with_object(&self, object: ConfigObject) -> Self {
        Self {
            root: Value::from_object(self.root.origin().clone(), object),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

fn only_path(object: &ConfigObject, keys: &[String]) -> Result<Option<ConfigObject>> {
    let Some((first, rest)) = keys.split_first() else {
        return Ok(Some(object.clone()));
    };
    let Some(child) = object.get(first) else {
        return Ok(None);
    };
    if rest.is_empty() {
        return Ok(Some(object.with_only_key(first)));
    }
    match child.kind() {
        ValueKind::Object(inner) => Ok(only_path(inner, rest)?.map(|pruned| {
            object
                .with_only_key(first)
                .with_value(first, Value::from_object(child.origin().clone(), pruned))
        })),
        ValueKind::Reference(_) | ValueKind::DelayedMerge(_) => Err(CairnError::not_resolved(first.as_str())),
        _ => Ok(None),
    }
}

fn without_path(object: &ConfigObject, keys: &[String]) -> Result<ConfigObject> {
    let Some((first, rest)) = keys.split_first() else {
        return Ok(object.clone());
    };
    if rest.is_empty() {
        return Ok(object.without_key(first));
    }
    match object.get(first).map(|child| (child, child.kind())) {
        Some((child, ValueKind::Object(inner))) => {
            let pruned = without_path(inner, rest)?;
            Ok(object.with_value(first, Value::from_object(child.origin().clone(), pruned)))
        }
        Some((_, ValueKind::Reference(_) | ValueKind::DelayedMerge(_))) => {
            Err(CairnError::not_resolved(first.as_str()))
        }
        _ => Ok(object.clone()),
    }
}

fn with_path_value(object: &ConfigObject, keys: &[String], value: Value) -> ConfigObject {
    match keys.split_first() {
        None => object.clone(),
        Some((first, [])) => object.with_value(first, value),
        Some((first, rest)) => {
            // a non-object in the way is replaced
            let existing = object.get(first);
            let inner = existing.and_then(Value::as_object).cloned().unwrap_or_default();
            let origin = existing.map_or_else(|| value.origin().clone(), |v| v.origin().clone());
            let nested = with_path_value(&inner, rest, value);
            object.with_value(first, Value::from_object(origin, nested))
        }
    }
}
