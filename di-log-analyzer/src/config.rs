//! Analyzer configuration types
//!
//! This module defines the configuration shared by the loader and the reduction
//! engine: which files in the data directory hold which collection, and how many
//! digital-input pins each telemetry message carries. Report rendering options
//! live next to the formatter in [`crate::report`].

use crate::types::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};

/// Number of DI pins on a current-generation gateway
pub const DEFAULT_PIN_COUNT: usize = 16;

/// Configuration for loading and reducing a batch of exports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// File name (without `.json`) of the site map collection
    #[serde(default = "default_map_prefix")]
    pub map_file_prefix: String,

    /// File name (without `.json`) of the device catalog
    #[serde(default = "default_device_prefix")]
    pub device_file_prefix: String,

    /// File name (without `.json`) of the communication equipment catalog
    #[serde(default = "default_equipment_prefix")]
    pub equipment_file_prefix: String,

    /// Prefix shared by every telemetry snapshot file
    #[serde(default = "default_telemetry_prefix")]
    pub telemetry_file_prefix: String,

    /// Number of DI pins read from each message (legacy gateways expose 17)
    #[serde(default = "default_pin_count")]
    pub pin_count: usize,
}

fn default_map_prefix() -> String {
    "airaConnect.maps".to_string()
}

fn default_device_prefix() -> String {
    "airaConnect.devices".to_string()
}

fn default_equipment_prefix() -> String {
    "airaConnect.communicationEquipments".to_string()
}

fn default_telemetry_prefix() -> String {
    "airaConnect.machineryMessages".to_string()
}

fn default_pin_count() -> usize {
    DEFAULT_PIN_COUNT
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            map_file_prefix: default_map_prefix(),
            device_file_prefix: default_device_prefix(),
            equipment_file_prefix: default_equipment_prefix(),
            telemetry_file_prefix: default_telemetry_prefix(),
            pin_count: default_pin_count(),
        }
    }
}

impl AnalyzerConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the site map file name
    pub fn with_map_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.map_file_prefix = prefix.into();
        self
    }

    /// Builder method: set the device catalog file name
    pub fn with_device_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.device_file_prefix = prefix.into();
        self
    }

    /// Builder method: set the equipment catalog file name
    pub fn with_equipment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.equipment_file_prefix = prefix.into();
        self
    }

    /// Builder method: set the telemetry file prefix
    pub fn with_telemetry_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.telemetry_file_prefix = prefix.into();
        self
    }

    /// Builder method: set the number of DI pins per message
    pub fn with_pin_count(mut self, pin_count: usize) -> Self {
        self.pin_count = pin_count;
        self
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.pin_count == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "pin_count must be at least 1".to_string(),
            ));
        }

        let prefixes = [
            ("map_file_prefix", &self.map_file_prefix),
            ("device_file_prefix", &self.device_file_prefix),
            ("equipment_file_prefix", &self.equipment_file_prefix),
            ("telemetry_file_prefix", &self.telemetry_file_prefix),
        ];
        for (field, value) in prefixes {
            if value.trim().is_empty() {
                return Err(AnalyzerError::InvalidConfig(format!("{} is empty", field)));
            }
        }

        Ok(())
    }

    /// Check whether a file name is a telemetry snapshot
    pub fn is_telemetry_file(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.telemetry_file_prefix) && file_name.ends_with(".json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_config_builder() {
        let config = AnalyzerConfig::new()
            .with_device_prefix("devices")
            .with_equipment_prefix("equipment")
            .with_telemetry_prefix("messages")
            .with_pin_count(17);

        assert_eq!(config.device_file_prefix, "devices");
        assert_eq!(config.equipment_file_prefix, "equipment");
        assert_eq!(config.telemetry_file_prefix, "messages");
        assert_eq!(config.map_file_prefix, "airaConnect.maps");
        assert_eq!(config.pin_count, 17);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(AnalyzerConfig::new().with_pin_count(0).validate().is_err());
        assert!(AnalyzerConfig::new().with_map_prefix("  ").validate().is_err());
    }

    #[test]
    fn test_telemetry_file_filter() {
        let config = AnalyzerConfig::new().with_telemetry_prefix("msgs");

        assert!(config.is_telemetry_file("msgs.2024-01.json"));
        assert!(!config.is_telemetry_file("msgs.2024-01.json.bak"));
        assert!(!config.is_telemetry_file("devices.json"));
    }

    #[test]
    fn test_partial_deserialization() {
        let config: AnalyzerConfig = serde_json::from_str(r#"{"pin_count": 17}"#).unwrap();
        assert_eq!(config.pin_count, 17);
        assert_eq!(config.device_file_prefix, "airaConnect.devices");
    }
}
