//! User configuration loaded from `config.toml`.
//!
//! Every field is optional; a missing file yields [`AppConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub timeouts: TimeoutConfig,
    pub scripts: ScriptsConfig,
    pub settings: SettingsConfig,
    pub logging: LoggingConfig,
    pub panel: PanelConfig,
}

/// Anchor host and panel connection filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub anchor_host: String,
    pub vpn_types: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            anchor_host: constants::DEFAULT_ANCHOR_HOST.to_string(),
            vpn_types: constants::DEFAULT_VPN_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// External tool timeouts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub command_secs: u64,
    pub probe_wait_secs: u64,
    pub probe_hard_secs: u64,
    pub restart_secs: u64,
    pub script_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: constants::COMMAND_TIMEOUT.as_secs(),
            probe_wait_secs: constants::PROBE_WAIT_SECS,
            probe_hard_secs: constants::PROBE_TIMEOUT.as_secs(),
            restart_secs: constants::RESTART_TIMEOUT.as_secs(),
            script_secs: constants::SCRIPT_TIMEOUT.as_secs(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn probe_hard(&self) -> Duration {
        Duration::from_secs(self.probe_hard_secs)
    }

    #[must_use]
    pub const fn restart(&self) -> Duration {
        Duration::from_secs(self.restart_secs)
    }

    #[must_use]
    pub const fn script(&self) -> Duration {
        Duration::from_secs(self.script_secs)
    }
}

/// Location of the `install` / `uninstall` scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Defaults to `<config dir>/extensions` when unset.
    pub dir: Option<PathBuf>,
}

/// Location and namespace of the persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Defaults to `<config dir>/settings.toml` when unset.
    pub path: Option<PathBuf>,
    pub namespace: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: None,
            namespace: constants::SETTINGS_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(constants::DEFAULT_LOG_FILE),
            level: constants::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub refresh_secs: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            refresh_secs: constants::PANEL_REFRESH_RATE.as_secs(),
        }
    }
}

impl AppConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid TOML for
    /// this schema.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load the config from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Scripts directory, falling back to `<config_dir>/extensions`.
    #[must_use]
    pub fn scripts_dir(&self, config_dir: &Path) -> PathBuf {
        self.scripts
            .dir
            .clone()
            .unwrap_or_else(|| config_dir.join(constants::SCRIPTS_DIR_NAME))
    }

    /// Settings file, falling back to `<config_dir>/settings.toml`.
    #[must_use]
    pub fn settings_path(&self, config_dir: &Path) -> PathBuf {
        self.settings
            .path
            .clone()
            .unwrap_or_else(|| config_dir.join(constants::SETTINGS_FILE_NAME))
    }
}

/// Returns `~/.config/tunneldeck` (or the platform equivalent).
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when the platform has no user config
/// directory.
pub fn app_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(constants::CONFIG_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}
