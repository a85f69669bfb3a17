//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.holiday-atlas.toml` files.

use crate::cli::{Args, Command};
use crate::fanout::AggregateConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".holiday-atlas.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Fan-out settings for the totals and build operations.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Fan-out settings for the today set.
    #[serde(default)]
    pub today: TodayConfig,

    /// Upstream endpoints.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Memo cache lifetimes.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path; stdout when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Directory holding the generated JSON data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            verbose: false,
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("public/data")
}

/// Fan-out settings for per-country Calendarific and Nager.Date batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of concurrent upstream requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Budget for one upstream request, in milliseconds.
    #[serde(default = "default_per_item_timeout_ms")]
    pub per_item_timeout_ms: u64,

    /// Budget for the whole batch, in milliseconds.
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            per_item_timeout_ms: default_per_item_timeout_ms(),
            overall_timeout_ms: default_overall_timeout_ms(),
        }
    }
}

impl AggregatorConfig {
    pub fn fanout(&self) -> AggregateConfig {
        AggregateConfig::from_millis(
            self.concurrency,
            self.per_item_timeout_ms,
            self.overall_timeout_ms,
        )
    }
}

fn default_concurrency() -> usize {
    6
}

fn default_per_item_timeout_ms() -> u64 {
    8_000
}

fn default_overall_timeout_ms() -> u64 {
    25_000
}

/// Fan-out settings for the "is today a holiday" sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayConfig {
    #[serde(default = "default_today_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_today_per_item_timeout_ms")]
    pub per_item_timeout_ms: u64,

    #[serde(default = "default_today_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
}

impl Default for TodayConfig {
    fn default() -> Self {
        Self {
            concurrency: default_today_concurrency(),
            per_item_timeout_ms: default_today_per_item_timeout_ms(),
            overall_timeout_ms: default_today_overall_timeout_ms(),
        }
    }
}

impl TodayConfig {
    pub fn fanout(&self) -> AggregateConfig {
        AggregateConfig::from_millis(
            self.concurrency,
            self.per_item_timeout_ms,
            self.overall_timeout_ms,
        )
    }
}

fn default_today_concurrency() -> usize {
    10
}

fn default_today_per_item_timeout_ms() -> u64 {
    4_500
}

fn default_today_overall_timeout_ms() -> u64 {
    12_000
}

/// Upstream endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Calendarific API base URL.
    #[serde(default = "default_calendarific_url")]
    pub calendarific_url: String,

    /// Nager.Date API base URL.
    #[serde(default = "default_nager_url")]
    pub nager_url: String,

    /// GeoJSON file listing the world's countries.
    #[serde(default = "default_world_geojson_url")]
    pub world_geojson_url: String,

    /// Transport-level timeout for a single HTTP request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            calendarific_url: default_calendarific_url(),
            nager_url: default_nager_url(),
            world_geojson_url: default_world_geojson_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_calendarific_url() -> String {
    "https://calendarific.com/api/v2".to_string()
}

fn default_nager_url() -> String {
    "https://date.nager.at/api/v3".to_string()
}

fn default_world_geojson_url() -> String {
    "https://cdn.jsdelivr.net/npm/three-conic-polygon-geometry@1.4.4/example/geojson/ne_110m_admin_0_countries.geojson".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Memo cache lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Totals per year.
    #[serde(default = "default_week")]
    pub totals_ttl_seconds: u64,

    /// Today set and its country universe.
    #[serde(default = "default_today_ttl")]
    pub today_ttl_seconds: u64,

    /// Single-country count and details lookups.
    #[serde(default = "default_week")]
    pub lookup_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            totals_ttl_seconds: default_week(),
            today_ttl_seconds: default_today_ttl(),
            lookup_ttl_seconds: default_week(),
        }
    }
}

impl CacheConfig {
    pub fn totals_ttl(&self) -> Duration {
        Duration::from_secs(self.totals_ttl_seconds)
    }

    pub fn today_ttl(&self) -> Duration {
        Duration::from_secs(self.today_ttl_seconds)
    }

    pub fn lookup_ttl(&self) -> Duration {
        Duration::from_secs(self.lookup_ttl_seconds)
    }
}

fn default_week() -> u64 {
    7 * 24 * 60 * 60
}

fn default_today_ttl() -> u64 {
    15 * 60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only values
    /// the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        // Budget flags tune the section the chosen command runs with.
        let (concurrency, per_item, overall) = if args.command == Some(Command::Today) {
            (
                &mut self.today.concurrency,
                &mut self.today.per_item_timeout_ms,
                &mut self.today.overall_timeout_ms,
            )
        } else {
            (
                &mut self.aggregator.concurrency,
                &mut self.aggregator.per_item_timeout_ms,
                &mut self.aggregator.overall_timeout_ms,
            )
        };
        if let Some(value) = args.concurrency {
            *concurrency = value;
        }
        if let Some(ms) = args.item_timeout_ms {
            *per_item = ms;
        }
        if let Some(ms) = args.overall_timeout_ms {
            *overall = ms;
        }

        if let Some(ref dir) = args.data_dir {
            self.general.data_dir = dir.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Reject fan-out settings that could never satisfy their own budgets.
    pub fn validate(&self) -> Result<()> {
        self.aggregator
            .fanout()
            .validate()
            .context("Invalid [aggregator] settings")?;
        self.today
            .fanout()
            .validate()
            .context("Invalid [today] settings")?;
        if self.providers.request_timeout_seconds == 0 {
            anyhow::bail!("providers.request_timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.aggregator.concurrency, 6);
        assert_eq!(config.today.concurrency, 10);
        assert_eq!(config.today.per_item_timeout_ms, 4_500);
        assert_eq!(config.today.overall_timeout_ms, 12_000);
        assert_eq!(config.cache.today_ttl(), Duration::from_secs(900));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "totals.json"
verbose = true
data_dir = "data"

[aggregator]
concurrency = 8
overall_timeout_ms = 30000

[providers]
nager_url = "http://localhost:9000/api/v3"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("totals.json"));
        assert!(config.general.verbose);
        assert_eq!(config.general.data_dir, PathBuf::from("data"));
        assert_eq!(config.aggregator.concurrency, 8);
        assert_eq!(config.aggregator.per_item_timeout_ms, 8_000);
        assert_eq!(config.aggregator.overall_timeout_ms, 30_000);
        assert_eq!(config.providers.nager_url, "http://localhost:9000/api/v3");
        assert_eq!(config.providers.calendarific_url, "https://calendarific.com/api/v2");
        assert_eq!(config.today.concurrency, 10);
    }

    #[test]
    fn test_validate_rejects_inverted_budgets() {
        let mut config = Config::default();
        config.today.overall_timeout_ms = 1_000;
        config.today.per_item_timeout_ms = 4_500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_flags_target_command_section() {
        let args = Args::try_parse_from(["holiday-atlas", "totals", "--item-timeout-ms", "15000"])
            .unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.aggregator.per_item_timeout_ms, 15_000);
        assert_eq!(config.today.per_item_timeout_ms, 4_500);
        assert!(config.validate().is_ok());

        let args = Args::try_parse_from([
            "holiday-atlas",
            "today",
            "--concurrency",
            "3",
            "--overall-timeout-ms",
            "20000",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.today.concurrency, 3);
        assert_eq!(config.today.overall_timeout_ms, 20_000);
        assert_eq!(config.aggregator.concurrency, 6);
        assert_eq!(config.aggregator.overall_timeout_ms, 25_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[aggregator]"));
        assert!(toml_str.contains("[today]"));
        assert!(toml_str.contains("[providers]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.aggregator.concurrency, 6);
    }
}
