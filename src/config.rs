// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.
// Command-line options are applied on top by main.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::backend::memory::PlatformMemoryLimits;
use crate::sync::default_thread_count;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub device: DeviceConfig,
    pub debug: DebugConfig,
    pub limits: PlatformMemoryLimits,
}

/// Case selection and execution
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Case path patterns, `*` matches any run of characters
    pub cases: Vec<String>,
    /// Workers per multithreaded case, 0 picks from the core count
    pub threads: u32,
    /// Directory holding compiled SPIR-V programs
    pub shader_dir: String,
    /// Per-case results, one line each; empty disables
    pub results_file: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            threads: 0,
            shader_dir: "shaders".to_string(),
            results_file: String::new(),
        }
    }
}

/// Which physical device the cases run on
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// 1-based physical device index
    pub device_id: u32,
    /// 1-based physical device group index
    pub device_group_id: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: 1,
            device_group_id: 1,
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: false,
            log_level: "info".to_string(),
            log_to_file: false,
            log_file: "objmgmt_cts.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`; a missing file means defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.device.device_id == 0 {
            anyhow::bail!("device.device_id is 1-based, got 0");
        }
        if self.device.device_group_id == 0 {
            anyhow::bail!("device.device_group_id is 1-based, got 0");
        }
        if self.limits.device_page_size == 0 || !self.limits.device_page_size.is_power_of_two() {
            anyhow::bail!(
                "limits.device_page_size must be a power of two, got {}",
                self.limits.device_page_size
            );
        }
        Ok(())
    }

    /// Worker count for multithreaded cases
    pub fn thread_count(&self) -> u32 {
        match self.runner.threads {
            0 => default_thread_count(),
            n => n,
        }
    }

    pub fn shader_dir(&self) -> PathBuf {
        PathBuf::from(&self.runner.shader_dir)
    }

    /// Get log level as a filter
    pub fn get_log_level(&self) -> log::LevelFilter {
        match self.debug.log_level.to_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => {
                log::warn!("Unknown log level '{}', defaulting to info", self.debug.log_level);
                log::LevelFilter::Info
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.device.device_id, 1);
        assert_eq!(config.runner.shader_dir, "shaders");
        assert!(config.runner.cases.is_empty());
        assert_eq!(config.limits, PlatformMemoryLimits::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_from_path("no/such/objmgmt_config.toml").unwrap();
        assert_eq!(config.device.device_id, 1);
        assert!(!config.debug.validation_layers);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [runner]
            cases = ["object_management.single.*"]
            threads = 3

            [limits]
            total_system_memory = 1048576
            "#,
        )
        .unwrap();

        assert_eq!(config.runner.cases, vec!["object_management.single.*".to_string()]);
        assert_eq!(config.thread_count(), 3);
        assert_eq!(config.limits.total_system_memory, 1048576);
        assert_eq!(config.limits.device_page_size, 4096);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn zero_device_id_is_rejected() {
        assert!(Config::from_toml("[device]\ndevice_id = 0").is_err());
    }

    #[test]
    fn bad_page_size_is_rejected() {
        assert!(Config::from_toml("[limits]\ndevice_page_size = 3000").is_err());
    }

    #[test]
    fn log_level_parsing() {
        let mut config = Config::default();
        config.debug.log_level = "DEBUG".to_string();
        assert_eq!(config.get_log_level(), log::LevelFilter::Debug);
        config.debug.log_level = "loud".to_string();
        assert_eq!(config.get_log_level(), log::LevelFilter::Info);
    }
}
