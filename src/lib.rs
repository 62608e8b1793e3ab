//! TunnelDeck: NetworkManager VPN toggles and priority-interface diagnostics.
//!
//! The library holds the diagnostic engine, the connection controller and
//! the panel; `main.rs` only wires them to the command line and terminal.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod event;
pub mod logging;
pub mod state;
pub mod theme;
pub mod ui;
