//! History configuration.

use serde::{Deserialize, Serialize};

/// Settings for an `UndoStack`. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record history at all. Disabled stacks ignore `new_post`/`record`.
    pub enabled: bool,
    /// Maximum number of non-empty posts kept; the oldest are dropped
    /// first. `0` means unlimited.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 1000,
        }
    }
}

impl HistoryConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = HistoryConfig::from_json(r#"{ "max_depth": 20 }"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_depth, 20);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(HistoryConfig::from_json(r#"{ "enabled": "yes" }"#).is_err());
    }
}
