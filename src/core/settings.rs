//! Persisted plugin settings.
//!
//! A single TOML file holds one table per namespace; the only value
//! TunnelDeck itself writes is the `openvpn_enabled` flag.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::error::SettingsError;

/// Boolean key/value store.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send + Sync {
    /// Read `key`, falling back to `default` when unset or unreadable.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Persist `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file cannot be read, parsed or written.
    fn set_bool(&self, key: &str, value: bool) -> Result<(), SettingsError>;
}

/// TOML file backend.
#[derive(Debug)]
pub struct TomlSettings {
    path: PathBuf,
    namespace: String,
    write_lock: Mutex<()>,
}

impl TomlSettings {
    #[must_use]
    pub fn new(path: &Path, namespace: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            namespace: namespace.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<toml::Table, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(source) => Err(SettingsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl SettingsStore for TomlSettings {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        let document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                warn!("Reading setting {key}: {e}");
                return default;
            }
        };
        document
            .get(&self.namespace)
            .and_then(toml::Value::as_table)
            .and_then(|table| table.get(key))
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read_document()?;
        let section = document
            .entry(self.namespace.clone())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !section.is_table() {
            *section = toml::Value::Table(toml::Table::new());
        }
        if let toml::Value::Table(table) = section {
            table.insert(key.to_string(), toml::Value::Boolean(value));
        }

        let io_err = |source: std::io::Error| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, toml::to_string_pretty(&document)?).map_err(io_err)
    }
}
