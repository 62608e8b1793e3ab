//! Core diagnostics and connection control.
//!
//! Provides the command runner seam, output parsers, the gateway resolver,
//! the diagnostic engine, the connection controller and the panel worker.

pub mod command;
pub mod controller;
pub mod engine;
pub mod gateway;
pub mod parser;
pub mod probe;
pub mod settings;
pub mod worker;
