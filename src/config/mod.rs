//! Configuration management for vMix Remote
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::mixer::Credentials;
use crate::sync::EngineSettings;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub sync: SyncConfig,
    /// Shell-specific settings (scale, fullscreen, ...), passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ui: BTreeMap<String, serde_yaml::Value>,
}

/// vMix endpoint and credentials
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MixerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Persist username/password on save
    #[serde(default)]
    pub remember_credentials: bool,
    /// Overrides the profile's request timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            remember_credentials: false,
            timeout_ms: None,
        }
    }
}

/// Which shell the configuration is tuned for
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Desktop,
    Mobile,
}

impl Profile {
    pub fn default_timeout(self) -> Duration {
        match self {
            Profile::Desktop => Duration::from_millis(5000),
            Profile::Mobile => Duration::from_millis(2000),
        }
    }
}

/// Poll loop and connection policy
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_ftb_blink")]
    pub ftb_blink_ms: u64,
    #[serde(default = "default_true")]
    pub auto_connect: bool,
    /// Consecutive failed ticks before the shell reconnects (0 = never)
    #[serde(default)]
    pub reconnect_after_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            ftb_blink_ms: default_ftb_blink(),
            auto_connect: true,
            reconnect_after_failures: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the config, writing a default one first if the file is missing
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            return Self::load(path).await;
        }

        info!("No config at {}, creating defaults", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let config = Self::default();
        config.save(path).await?;
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        // An empty file is a valid all-defaults config
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// Credentials are written only when `remember_credentials` is set.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let mut persisted = self.clone();
        if !persisted.mixer.remember_credentials {
            persisted.mixer.username.clear();
            persisted.mixer.password.clear();
        }

        let yaml = serde_yaml::to_string(&persisted).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.mixer.host.trim().is_empty() {
            anyhow::bail!("mixer.host cannot be empty");
        }
        if self.mixer.port == 0 {
            anyhow::bail!("mixer.port must be between 1 and 65535");
        }
        if self.mixer.timeout_ms == Some(0) {
            anyhow::bail!("mixer.timeout_ms must be positive");
        }
        if self.sync.poll_interval_ms == 0 {
            anyhow::bail!("sync.poll_interval_ms must be positive");
        }
        if self.sync.ftb_blink_ms == 0 {
            anyhow::bail!("sync.ftb_blink_ms must be positive");
        }
        Ok(())
    }

    /// Request timeout: explicit override, else the profile default
    pub fn timeout(&self) -> Duration {
        self.mixer
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.profile.default_timeout())
    }

    /// Host and port the engine should connect to
    pub fn endpoint(&self) -> (String, u16) {
        (self.mixer.host.trim().to_string(), self.mixer.port)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            poll_interval: Duration::from_millis(self.sync.poll_interval_ms),
            blink_interval: Duration::from_millis(self.sync.ftb_blink_ms),
            timeout: self.timeout(),
            credentials: Credentials {
                username: self.mixer.username.clone(),
                password: self.mixer.password.clone(),
            },
        }
    }
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8088 }
fn default_true() -> bool { true }
fn default_poll_interval() -> u64 { 1000 }
fn default_ftb_blink() -> u64 { 500 }
