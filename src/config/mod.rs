//! Configuration loading and first-run setup.
//!
//! Config lives at `~/.config/scriba/config.toml`. Every field has a
//! default, so a partial file is fine; a missing file is created with
//! the defaults on first run. The API key for remote providers is the
//! only value that cannot be defaulted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::provider::ProviderKind;

const CONFIG_DIR: &str = "scriba";
const CONFIG_FILE: &str = "config.toml";
const USAGE_FILE: &str = "usage.json";

/// One provider selection: which backend, which model, how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub host: Option<String>,
}

impl Default for ProviderSpec {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenRouter,
            model: "google/gemini-2.0-flash-001".to_string(),
            api_key: None,
            host: None,
        }
    }
}

/// Tunable bounds for the interactive session and the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_regenerations: u32,
    pub title_max: usize,
    pub timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_regenerations: crate::session::DEFAULT_MAX_REGENERATIONS,
            title_max: crate::message::DEFAULT_TITLE_MAX,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stable anonymous identifier for usage bucketing, minted on first run.
    pub device_id: String,
    /// Provider used for commit message generation.
    pub provider: ProviderSpec,
    /// Optional provider for change summarization. When absent, no
    /// summarization happens and the raw change set feeds the prompt.
    pub summarizer: Option<ProviderSpec>,
    pub limits: Limits,
    /// Where the usage accumulator file lives. Defaults next to the config.
    pub usage_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            provider: ProviderSpec::default(),
            summarizer: None,
            limits: Limits::default(),
            usage_path: None,
        }
    }
}

impl Config {
    /// Resolved path of the usage accumulator file.
    pub fn usage_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.usage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join(USAGE_FILE)),
        }
    }

    /// The spec to use for summarization calls, when one is configured.
    pub fn summarizer_spec(&self) -> Option<&ProviderSpec> {
        self.summarizer.as_ref()
    }

    /// Render the config for display with the API key masked.
    pub fn display_redacted(&self) -> String {
        let mut shown = self.clone();
        if let Some(key) = shown.provider.api_key.as_mut() {
            *key = mask_key(key);
        }
        if let Some(summarizer) = shown.summarizer.as_mut() {
            if let Some(key) = summarizer.api_key.as_mut() {
                *key = mask_key(key);
            }
        }
        toml::to_string_pretty(&shown).unwrap_or_else(|_| "<unrenderable>".to_string())
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// Platform config directory for this tool.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

/// Path of the config file itself.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Load the config, creating a default file on first run.
pub fn load() -> Result<Config, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        let config = Config::default();
        write_config(&path, &config)?;
        println!("Created default config at {}", path.display());
        return Ok(config);
    }
    load_from(&path)
}

/// Load the config from an explicit path without creating anything.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    debug!("Loading config from {}", path.display());
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize and write the config, restricting permissions on unix.
pub fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let toml = toml::to_string_pretty(config).map_err(|e| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    std::fs::write(path, toml).map_err(|source| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    // The file can hold an API key.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(
            |source| ConfigError::WriteFile {
                path: path.to_path_buf(),
                source,
            },
        )?;
    }

    Ok(())
}
