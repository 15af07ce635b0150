//! Application configuration (config.toml)

use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, Local};
use di_log_analyzer::{AnalyzerConfig, ReportOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// File prefixes and pin count
    #[serde(flatten)]
    pub analyzer: AnalyzerConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Render pins without telemetry using sentinels
    #[serde(default)]
    pub show_unmatched: bool,
    /// Display offset in hours; the machine's local offset when unset
    pub utc_offset_hours: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Preprocessed topology file; `<data_dir>/preprocessed_data.json` when unset
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Where the preprocessed topology lives
    pub fn cache_path(&self) -> PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(|| self.input.data_dir.join("preprocessed_data.json"))
    }

    /// Report options derived from the `[report]` table
    pub fn report_options(&self) -> Result<ReportOptions> {
        let offset = match self.report.utc_offset_hours {
            Some(hours) => match hours.checked_mul(3600).and_then(FixedOffset::east_opt) {
                Some(offset) => offset,
                None => bail!("utc_offset_hours out of range: {}", hours),
            },
            None => *Local::now().offset(),
        };

        Ok(ReportOptions::new()
            .with_show_unmatched(self.report.show_unmatched)
            .with_utc_offset(offset))
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .input
        .analyzer
        .validate()
        .with_context(|| format!("Invalid [input] section in {:?}", path))?;

    Ok(config)
}
