// Author: Dustin Pilgrim
// License: MIT

use serde::de::DeserializeOwned;

use super::*;

impl Config {
    /// Finds the value at `path` without converting it.
    ///
    /// Returns `Ok(None)` when nothing is there, and `NotResolved` when the
    /// walk has to pass through a substitution that was never resolved.
    pub fn lookup(&self, path: &str) -> Result<Option<Value>> {
        let parsed = ConfigPath::parse(path)?;
        let found = self
            .object()
            .peek_path(&parsed)
            .map_err(|e| e.improve_not_resolved(path))?;
        log::trace!("lookup {} -> {}", path, if found.is_some() { "found" } else { "absent" });
        Ok(found.cloned())
    }

    /// Get a raw, resolved `Value` from the configuration.
    ///
    /// # Examples
    /// ```
    /// # use cairn_cfg::Config;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::from_json(r#"{"server": {"port": 8080}}"#, "inline")?;
    /// let port = config.get_value("server.port")?;
    /// assert_eq!(port.to_string(), "8080");
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_value(&self, path: &str) -> Result<Value> {
        let value = self.lookup(path)?.ok_or_else(|| CairnError::NotFound {
            path: path.to_string(),
            hint: Some("Check that the path exists in one of the merged sources".into()),
        })?;
        if !value.is_resolved() {
            return Err(CairnError::not_resolved(path));
        }
        Ok(value)
    }

    /// Get a typed value from the configuration using dot notation.
    ///
    /// Strings that spell a number or a boolean convert to those types, and
    /// numbers and booleans convert to strings.
    ///
    /// # Examples
    /// ```
    /// # use cairn_cfg::Config;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::from_json(r#"{"server": {"host": "localhost", "port": "8080"}}"#, "inline")?;
    /// let host: String = config.get("server.host")?;
    /// let port: u16 = config.get("server.port")?;
    /// assert_eq!((host.as_str(), port), ("localhost", 8080));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// `NotFound` if the path is absent, `Null` if it is set to null, and
    /// `WrongType` if the value cannot be converted to `T`.
    pub fn get<T>(&self, path: &str) -> Result<T>
    where
        T: TryFrom<Value, Error = CairnError>,
    {
        let value = self.get_value(path)?;
        T::try_from(value).map_err(|e| with_path(e, path))
    }

    /// Get an optional typed value - `None` if the path is absent or null.
    pub fn get_optional<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: TryFrom<Value, Error = CairnError>,
    {
        match self.get_value(path) {
            Ok(value) if value.is_null() => Ok(None),
            Ok(value) => T::try_from(value).map(Some).map_err(|e| with_path(e, path)),
            Err(CairnError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a value with a fallback default.
    ///
    /// # Examples
    /// ```
    /// # use cairn_cfg::Config;
    /// let config = Config::empty("nothing");
    /// let timeout = config.get_or("server.timeout", 30u64);
    /// assert_eq!(timeout, 30);
    /// ```
    pub fn get_or<T>(&self, path: &str, default: T) -> T
    where
        T: TryFrom<Value, Error = CairnError>,
    {
        match self.get(path) {
            Ok(v) => v,
            Err(e) => {
                log::trace!("using default for {}: {}", path, e);
                default
            }
        }
    }

    /// Whether `path` holds a value other than null.
    pub fn has(&self, path: &str) -> bool {
        matches!(self.lookup(path), Ok(Some(v)) if !v.is_null())
    }

    /// Get all keys at a given path level. An empty path lists the root keys.
    pub fn get_keys(&self, path: &str) -> Result<Vec<String>> {
        if path.trim().is_empty() {
            return Ok(self.object().keys().cloned().collect());
        }
        let object: ConfigObject = self.get(path)?;
        Ok(object.keys().cloned().collect())
    }

    /// The object at `path` as a configuration of its own.
    pub fn get_config(&self, path: &str) -> Result<Config> {
        let value = self.get_value(path)?;
        Config::from_value(value).map_err(|e| with_path(e, path))
    }

    /// Deserializes the value at `path` (or the whole tree for an empty path) with serde.
    pub fn get_deserialized<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = if path.trim().is_empty() {
            if !self.is_resolved() {
                return Err(CairnError::not_resolved("<root>"));
            }
            self.root.clone()
        } else {
            self.get_value(path)?
        };
        let json = value.unwrapped()?;
        serde_json::from_value(json).map_err(|e| CairnError::WrongType {
            path: path.to_string(),
            origin: value.origin().description(),
            expected: std::any::type_name::<T>().to_string(),
            actual: e.to_string(),
        })
    }
}

/// Puts the getter's path into conversion errors, which do not know it.
pub(super) fn with_path(e: CairnError, path: &str) -> CairnError {
    match e {
        CairnError::WrongType {
            origin,
            expected,
            actual,
            ..
        } => CairnError::WrongType {
            path: path.to_string(),
            origin,
            expected,
            actual,
        },
        CairnError::Null { expected, .. } => CairnError::Null {
            path: path.to_string(),
            expected,
        },
        other => other.improve_not_resolved(path),
    }
}
