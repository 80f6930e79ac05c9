use log::LevelFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid feed config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    /// Load interests, user events and relevant events as soon as the feed starts
    pub preload: bool,
    pub log_level: LevelFilter,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            preload: true,
            log_level: LevelFilter::Info,
        }
    }
}

impl FeedConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = FeedConfig::from_json("{}").unwrap();
        assert_eq!(config, FeedConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = FeedConfig::from_json(r#"{"preload": false, "logLevel": "DEBUG"}"#).unwrap();
        assert!(!config.preload);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            FeedConfig::from_json(r#"{"preload": "sometimes"}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
