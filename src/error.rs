//! Error types.
//!
//! Each layer has its own enum so callers can tell a tool that never ran
//! apart from a listing that could not be parsed. The diagnostic engine is
//! the boundary that turns every [`EngineError`] into a structured failure
//! instead of propagating it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// An external tool could not be run to completion.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A connection listing line did not have the expected shape.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected at least 4 fields, found {found}: {line:?}")]
    MissingFields { found: usize, line: String },
}

/// Fault inside the diagnostic sequence.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{}", crate::constants::ERR_NO_INTERFACE)]
    NoPriorityInterface,

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Persisted settings could not be read or written.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A connection-mutating operation failed.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("script `{script}` exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    ScriptFailed { script: String, code: Option<i32> },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// The configuration file could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
