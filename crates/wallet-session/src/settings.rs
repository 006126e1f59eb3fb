//! Application settings management
//!
//! Stores the provider catalog and mock backend tuning in a plain JSON file.
//! A missing file means defaults.

use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::provider::ProviderInfo;

/// Address reported by the mock wallet
pub const DEMO_ADDRESS: &str = "k:5a2afbc4564b76b2c27ce5a644cab643c43663835ea0be22433b209d3351f937";

/// Mock backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MockSettings {
    /// Simulated connect latency in milliseconds
    pub connect_latency_ms: u64,
    /// Simulated transfer submission latency in milliseconds
    pub submit_latency_ms: u64,
    /// Simulated signing latency in milliseconds
    pub sign_latency_ms: u64,
    /// Account address returned on connect
    pub address: String,
    /// Balance returned on connect
    pub opening_balance: Decimal,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            connect_latency_ms: 2000,
            submit_latency_ms: 1500,
            sign_latency_ms: 1000,
            address: DEMO_ADDRESS.to_string(),
            opening_balance: Decimal::new(14256, 2),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Selectable wallet providers, in display order
    pub providers: Vec<ProviderInfo>,
    /// Mock backend tuning
    pub mock: MockSettings,
    /// Deadline for any single provider call in seconds
    pub provider_timeout_secs: u64,
    /// Buffered session events per subscriber
    pub event_capacity: usize,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self {
            version: 1,
            providers: ProviderInfo::builtin_catalog(),
            mock: MockSettings::default(),
            provider_timeout_secs: 30,
            event_capacity: 64,
        }
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(SessionError::Config("at least one provider is required".to_string()));
        }
        let mut ids = HashSet::new();
        for p in &self.providers {
            if p.id.trim().is_empty() {
                return Err(SessionError::Config(format!(
                    "provider '{}' has an empty id",
                    p.display_name
                )));
            }
            if !ids.insert(p.id.as_str()) {
                return Err(SessionError::Config(format!("duplicate provider id '{}'", p.id)));
            }
        }
        if self.provider_timeout_secs == 0 {
            return Err(SessionError::Config("provider timeout must be positive".to_string()));
        }
        if self.mock.address.trim().is_empty() {
            return Err(SessionError::Config("mock address must not be empty".to_string()));
        }
        if self.mock.opening_balance.is_sign_negative() {
            return Err(SessionError::Config("mock opening balance must not be negative".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(SessionError::Config("event capacity must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Create a settings manager for the given config directory
    pub fn new(config_dir: &Path) -> Result<Self> {
        let settings_file = config_dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file)?;
        settings.validate()?;

        Ok(Self {
            settings_file,
            settings,
        })
    }

    /// Create a settings manager in the platform config directory
    pub fn in_default_dir() -> Result<Self> {
        Self::new(&Self::default_dir()?)
    }

    /// Platform config directory for this application
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("com", "symbia-labs", "wallet-session")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| SessionError::Config("Could not determine config directory".to_string()))
    }

    /// Load settings from file
    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        if let Some(parent) = self.settings_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Update settings and save
    pub async fn update(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.save().await
    }

    /// Path of the backing file
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }
}
