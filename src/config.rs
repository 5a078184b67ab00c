//! Session configuration.
//!
//! Every field has a default, so a partial JSON document only needs to
//! name the settings it overrides.
//!
//! # Examples
//!
//! ```
//! use gridcalc::{CalcFunction, SessionConfig};
//!
//! let config = SessionConfig::from_json(r#"{"default_function": "Average"}"#).unwrap();
//! assert_eq!(config.default_function, CalcFunction::Average);
//! assert_eq!(config.recent_formula_capacity, 3);
//! ```

use crate::aggregate::CalcFunction;
use crate::changeset::DEFAULT_CHANGE_LIMIT;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Function selected when a session starts and after a derived column is applied.
    pub default_function: CalcFunction,
    /// How many distinct formulas the recent list keeps.
    pub recent_formula_capacity: usize,
    /// Fractional digits of derived-column values as stored text.
    pub decimal_places: usize,
    /// Name proposed for a new derived column when authoring starts.
    pub default_column_name: String,
    /// Prefix of generated derived-column ids.
    pub derived_id_prefix: String,
    /// Undrained sheet changes kept before older ones are truncated.
    pub change_log_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_function: CalcFunction::Sum,
            recent_formula_capacity: 3,
            decimal_places: 2,
            default_column_name: "Custom Calculation".to_string(),
            derived_id_prefix: "calculated_col".to_string(),
            change_log_limit: DEFAULT_CHANGE_LIMIT,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| format!("Config parse error: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the session cannot honour.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_function == CalcFunction::Other {
            return Err("default_function must be an aggregate, not Other".to_string());
        }
        if self.derived_id_prefix.is_empty() {
            return Err("derived_id_prefix must not be empty".to_string());
        }
        if self.change_log_limit == 0 {
            return Err("change_log_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_function, CalcFunction::Sum);
        assert_eq!(config.recent_formula_capacity, 3);
        assert_eq!(config.decimal_places, 2);
        assert_eq!(config.default_column_name, "Custom Calculation");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SessionConfig::from_json(r#"{"decimal_places": 4}"#).unwrap();
        assert_eq!(config.decimal_places, 4);
        assert_eq!(config.derived_id_prefix, "calculated_col");
    }

    #[test]
    fn test_from_json_rejects_other() {
        assert!(SessionConfig::from_json(r#"{"default_function": "Other"}"#).is_err());
        assert!(SessionConfig::from_json("not json").is_err());
        assert!(SessionConfig::from_json(r#"{"change_log_limit": 0}"#).is_err());
    }
}
