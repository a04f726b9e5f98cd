// Author: Dustin Pilgrim
// License: MIT

use super::*;

impl Config {
    /// Get a value with validation - returns a detailed error naming where the value came from.
    ///
    /// # Examples
    /// ```
    /// # use cairn_cfg::Config;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::from_json(r#"{"workers": 64}"#, "inline")?;
    /// let err = config
    ///     .get_validated::<u32, _>("workers", |n| (1..=32).contains(n), "1 to 32")
    ///     .unwrap_err();
    /// assert_eq!(err.code(), 109);
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_validated<T, F>(&self, path: &str, validator: F, valid_values: &str) -> Result<T>
    where
        T: TryFrom<Value, Error = CairnError>,
        F: FnOnce(&T) -> bool,
    {
        let value = self.get_value(path)?;
        let origin = value.origin().description();
        let typed_value: T = T::try_from(value).map_err(|e| access::with_path(e, path))?;

        if !validator(&typed_value) {
            return Err(CairnError::Validation {
                path: path.to_string(),
                message: format!("expected {} (set in {})", valid_values, origin),
                hint: Some(format!("Valid values are: {}", valid_values)),
            });
        }

        Ok(typed_value)
    }

    /// Get a string value and validate it's one of the allowed values, ignoring case.
    pub fn get_string_enum(&self, path: &str, allowed_values: &[&str]) -> Result<String> {
        let value: String = self.get(path)?;
        let lower_value = value.to_lowercase();

        if !allowed_values.iter().any(|v| v.to_lowercase() == lower_value) {
            let origin = self.get_value(path)?.origin().description();
            return Err(CairnError::Validation {
                path: path.to_string(),
                message: format!("'{}' is not allowed (set in {})", value, origin),
                hint: Some(format!("Expected one of: {}", allowed_values.join(", "))),
            });
        }

        Ok(value)
    }
}
