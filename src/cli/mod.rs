//! Command-line interface module.
//!
//! Provides argument parsing and one-shot command handling.

pub mod args;
pub mod commands;
