use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

const CONFIG_KEYS: &str = "server, format, log_level, timeout_secs";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<String>,
    pub log_level: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ProfileConfig {
    /// Set one key from its string form, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => self.server = Some(value.to_string()),
            "format" => {
                parse_format(value)?;
                self.format = Some(value.to_string());
            }
            "log_level" => self.log_level = Some(value.to_string()),
            "timeout_secs" => {
                let secs = value
                    .parse()
                    .with_context(|| format!("timeout_secs must be a whole number, got {value}"))?;
                self.timeout_secs = Some(secs);
            }
            other => anyhow::bail!("Unknown config key: {other}. Valid keys: {CONFIG_KEYS}"),
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.format.as_deref().map(parse_format).transpose()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(value, true)
        .map_err(|_| anyhow::anyhow!("Unknown format: {value}. Valid formats: json, yaml, table"))
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

/// The directory holding `config.toml` and per-profile credentials.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// `~/.converge`
    pub fn locate() -> Result<Self> {
        let root = dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(".converge");
        Ok(Self { root })
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed and return its path.
    pub fn ensure(&self) -> Result<&Path> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        Ok(&self.root)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn credentials_path(&self, profile: &str) -> PathBuf {
        self.root.join(format!("credentials.{profile}.json"))
    }

    pub fn load_all(&self) -> Result<ConfigFile> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(ConfigFile::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let cfg: ConfigFile =
            toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_profile(&self, profile: &str) -> Result<ProfileConfig> {
        let mut all = self.load_all()?;
        Ok(all.remove(profile).unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &str, config: &ProfileConfig) -> Result<()> {
        let mut all = self.load_all()?;
        all.insert(profile.to_string(), config.clone());
        let content = toml::to_string_pretty(&all)?;
        self.ensure()?;
        fs::write(self.config_path(), content)?;
        Ok(())
    }

    pub fn resolve_server(&self, cli_server: &Option<String>, profile: &str) -> Result<String> {
        // 1. --server flag / CONVERGE_URL env
        if let Some(s) = cli_server {
            return Ok(s.clone());
        }
        // 2. config.toml profile
        let cfg = self.load_profile(profile)?;
        if let Some(s) = cfg.server {
            return Ok(s);
        }
        // 3. Stored credentials for this profile
        if let Ok(Some(creds)) = crate::auth::load_credentials(self, profile) {
            return Ok(creds.server().to_string());
        }
        anyhow::bail!(
            "No server URL configured. Use --server, set CONVERGE_URL env var, or run: converge login --server <url>"
        )
    }
}
