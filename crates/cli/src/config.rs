//! Configuration management for the escrow CLI.
//!
//! Handles loading and saving configuration from ~/.satoshi-escrow/config.toml

use anyhow::{Context, Result};
use escrow_types::Network;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network escrows are created on
    #[serde(default = "default_network")]
    pub network: Network,

    /// Esplora API base URL (defaults to the public explorer for the network)
    #[serde(default)]
    pub esplora_url: Option<String>,

    /// Timeout for explorer requests (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Output format (text, json)
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Enable colored output
    #[serde(default = "default_colored")]
    pub colored: bool,
}

fn default_network() -> Network {
    Network::Testnet4
}

fn default_timeout() -> u64 {
    30
}

fn default_output_format() -> String {
    "text".to_string()
}

fn default_colored() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: default_network(),
            esplora_url: None,
            timeout_secs: default_timeout(),
            output_format: default_output_format(),
            colored: default_colored(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the path to the config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home_dir.join(".satoshi-escrow"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;

            debug!(path = %config_path.display(), "Loaded config");
            toml::from_str(&contents).context("Failed to parse config file")
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        let config_path = Self::config_path()?;

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        debug!(path = %config_path.display(), "Saved config");

        Ok(())
    }

    /// Explorer URL in effect for the configured network
    pub fn esplora_url(&self) -> String {
        self.esplora_url
            .clone()
            .unwrap_or_else(|| escrow_esplora::EsploraClient::default_url(self.network).to_string())
    }

    /// Update network
    pub fn set_network(&mut self, network: Network) -> Result<()> {
        self.network = network;
        self.save()
    }

    /// Update explorer URL; "default" clears the override
    pub fn set_esplora_url(&mut self, url: String) -> Result<()> {
        self.esplora_url = if url == "default" { None } else { Some(url) };
        self.save()
    }

    /// Update output format
    pub fn set_output_format(&mut self, format: String) -> Result<()> {
        if format != "text" && format != "json" {
            anyhow::bail!("Invalid output format. Must be 'text' or 'json'");
        }
        self.output_format = format;
        self.save()
    }
}
