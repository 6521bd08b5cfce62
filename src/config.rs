//! Configuration file handling.
//!
//! This module provides loading and saving of hulud-scan configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/hulud-scan/config.toml`
//! - macOS: `~/Library/Application Support/hulud-scan/config.toml`
//! - Windows: `%APPDATA%\hulud-scan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! ioc_url = "https://raw.githubusercontent.com/DataDog/indicators-of-compromise/main/shai-hulud-2.0/consolidated_iocs.csv"
//! cache_ttl_hours = 24
//! auto_update = false
//! deep_scan = true
//! default_format = "table"
//!
//! [ignore]
//! packages = ["@internal/*"]
//! paths = ["dist/*", "*.min.js"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::ioc::remote::DEFAULT_IOC_URL;

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use hulud_scan::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Deep scan: {}", config.deep_scan);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where `--update-iocs` downloads the IOC CSV from.
    pub ioc_url: String,

    /// Explicit IOC CSV to use instead of the cached download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ioc_file: Option<PathBuf>,

    /// How long a downloaded IOC list is considered fresh, in hours.
    ///
    /// Default: 24 hours
    pub cache_ttl_hours: u64,

    /// Refresh the IOC list automatically when the cached copy is stale.
    ///
    /// Default: false
    pub auto_update: bool,

    /// Scan source files and workflows in addition to dependencies.
    ///
    /// Default: true
    pub deep_scan: bool,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Ignore list configuration for suppressing known false positives.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Packages and paths excluded from detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names the matcher never reports.
    ///
    /// Supports glob patterns (e.g., "@types/*").
    pub packages: Vec<String>,

    /// Project-relative paths the pattern scanner skips.
    ///
    /// Supports glob patterns (e.g., "dist/*", "*.min.js").
    pub paths: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a package should be ignored.
    pub fn should_ignore_package(&self, name: &str) -> bool {
        matches_any(&self.packages, name)
    }

    /// Check if a project-relative path should be skipped.
    pub fn should_ignore_path(&self, relative: &str) -> bool {
        matches_any(&self.paths, relative)
    }
}

fn matches_any(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|pattern| {
        if pattern.contains('*') {
            glob_match(pattern, text)
        } else {
            pattern == text
        }
    })
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Check prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Check suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ioc_url: DEFAULT_IOC_URL.to_string(),
            ioc_file: None,
            cache_ttl_hours: 24,
            auto_update: false,
            deep_scan: true,
            default_format: "table".to_string(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hulud-scan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
