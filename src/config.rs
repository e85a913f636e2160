//! Configuration module
//!
//! Reads MCP tool filtering from ~/.config/lmu/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// lmu configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// List of disabled MCP tool names (all others are enabled)
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lmu").join("config.toml"))
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Check if a tool is enabled
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        !self.disabled.iter().any(|t| t == tool_name)
    }
}

/// Names of all MCP tools the server registers
pub fn all_tool_names() -> Vec<&'static str> {
    vec!["get_ambient_light", "get_sensor_info"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.disabled.is_empty());
        assert!(config.is_enabled("get_ambient_light"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.disabled.is_empty());
    }

    #[test]
    fn test_disabled_tools() {
        let config = Config::parse("disabled = [\"get_sensor_info\"]\n").unwrap();

        assert!(!config.is_enabled("get_sensor_info"));
        assert!(config.is_enabled("get_ambient_light"));
    }

    #[test]
    fn test_bad_disabled_list_rejected() {
        assert!(Config::parse("disabled = \"get_sensor_info\"").is_err());
    }

    #[test]
    fn test_sensor_settings_not_configurable() {
        // Unknown keys are ignored; the service and selector stay fixed.
        let config = Config::parse("service = \"Other\"\nselector = 3\n").unwrap();
        assert!(config.disabled.is_empty());
    }

    #[test]
    fn test_template_parses() {
        let config = Config::parse(include_str!("../config.toml.example")).unwrap();
        assert!(config.disabled.is_empty());
    }

    #[test]
    fn test_tool_names_known() {
        let names = all_tool_names();
        assert!(names.contains(&"get_ambient_light"));
        assert!(names.contains(&"get_sensor_info"));
    }
}
