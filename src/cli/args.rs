//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// TunnelDeck - NetworkManager VPN panel and network diagnostics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config.toml
    #[arg(long, global = true, env = "TUNNELDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute; opens the panel when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Enable or disable a feature.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    Enable,
    Disable,
}

impl Switch {
    #[must_use]
    pub const fn enabled(self) -> bool {
        matches!(self, Self::Enable)
    }
}

/// OpenVPN support actions.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VpnAction {
    Enable,
    Disable,
    Status,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all NetworkManager connections
    Connections,
    /// Bring a connection up
    Up {
        /// Connection UUID
        uuid: String,
    },
    /// Take a connection down
    Down {
        /// Connection UUID
        uuid: String,
    },
    /// Show the active wifi/ethernet connection
    Active,
    /// Enable or disable IPv6 (restarts NetworkManager)
    Ipv6 {
        action: Switch,
        /// Connection UUID; defaults to the active connection
        #[arg(long)]
        uuid: Option<String>,
    },
    /// Enable, disable or query OpenVPN support
    Vpn { action: VpnAction },
    /// Show the interface used to reach the internet
    Interface,
    /// Show the LAN address of that interface
    LanIp,
    /// Run the full gateway diagnostic
    NetworkInfo,
    /// Check internet reachability
    Internet,
    /// Check gateway reachability
    Gateway,
    /// Check whether networkmanager-openvpn is installed
    OpenvpnInstalled,
    /// Host start hook: reinstall OpenVPN support if it is enabled
    #[command(hide = true)]
    Startup,
    /// Host stop hook: remove OpenVPN support
    #[command(hide = true)]
    Unload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_opens_panel() {
        let args = Args::try_parse_from(["tunneldeck"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.json);
    }

    #[test]
    fn test_ipv6_with_uuid() {
        let args =
            Args::try_parse_from(["tunneldeck", "ipv6", "disable", "--uuid", "u-1"]).unwrap();
        match args.command {
            Some(Commands::Ipv6 { action, uuid }) => {
                assert_eq!(action, Switch::Disable);
                assert_eq!(uuid.as_deref(), Some("u-1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["tunneldeck", "network-info", "--json", "--config", "/tmp/c.toml"])
                .unwrap();
        assert!(args.json);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(args.command, Some(Commands::NetworkInfo)));
    }

    #[test]
    fn test_vpn_action_parses() {
        let args = Args::try_parse_from(["tunneldeck", "vpn", "status"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Vpn {
                action: VpnAction::Status
            })
        ));
        assert!(Args::try_parse_from(["tunneldeck", "vpn", "maybe"]).is_err());
    }
}
