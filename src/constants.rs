//! Application-wide constants and configuration values.
//!
//! This module defines the static values used throughout TunnelDeck,
//! including tool names, default timeouts, property keys, and UI messages.

use std::time::Duration;

// === Application Metadata ===

/// Application name (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Short technical summary of the application (from Cargo.toml).
pub const APP_SUMMARY: &str = env!("CARGO_PKG_DESCRIPTION");
/// Settings namespace shared with the install scripts.
pub const SETTINGS_NAMESPACE: &str = "tunneldeck";
/// Key of the persisted OpenVPN toggle.
pub const SETTING_OPENVPN_ENABLED: &str = "openvpn_enabled";

// === Network Defaults ===

/// Well-known host used to discover the outbound route and test the internet.
pub const DEFAULT_ANCHOR_HOST: &str = "steampowered.com";
/// Connection types listed in the panel.
pub const DEFAULT_VPN_TYPES: [&str; 2] = ["vpn", "wireguard"];
/// Placeholder for values that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";
/// `getent ahosts` record type selected for the anchor address.
pub const STREAM_RECORD: &str = "STREAM";
/// NetworkManager package providing OpenVPN support.
pub const OPENVPN_PACKAGE: &str = "networkmanager-openvpn";

// === Timing Configuration ===

/// General external tool timeout.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);
/// Per-probe reply wait handed to `ping -W`.
pub const PROBE_WAIT_SECS: u64 = 5;
/// Hard subprocess timeout for a probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for `systemctl restart NetworkManager`.
pub const RESTART_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the install / uninstall scripts.
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(200);
/// Interval between background network refreshes in the panel.
pub const PANEL_REFRESH_RATE: Duration = Duration::from_secs(30);
/// Delay before an on-demand refresh after a toggle.
pub const PANEL_COLLECT_DELAY: Duration = Duration::from_millis(300);
/// UI tick rate in milliseconds.
pub const DEFAULT_TICK_RATE: u64 = 250;
/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);
/// Errors stay a little longer.
pub const TOAST_ERROR_DURATION: Duration = Duration::from_secs(6);
/// Poll interval while waiting on a child process.
pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(25);

// === External Tools ===

pub const TOOL_NMCLI: &str = "nmcli";
pub const TOOL_IP: &str = "ip";
pub const TOOL_PING: &str = "ping";
pub const TOOL_GETENT: &str = "getent";
pub const TOOL_SYSTEMCTL: &str = "systemctl";
pub const TOOL_PACMAN: &str = "pacman";
pub const TOOL_BASH: &str = "bash";
pub const SERVICE_NETWORK_MANAGER: &str = "NetworkManager";
pub const SCRIPT_INSTALL: &str = "install";
pub const SCRIPT_UNINSTALL: &str = "uninstall";

// === Path Configuration ===

/// Name of the application config subdirectory.
pub const CONFIG_DIR_NAME: &str = "tunneldeck";
/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
/// Name of the scripts subdirectory.
pub const SCRIPTS_DIR_NAME: &str = "extensions";
/// Default log file (truncated on every start).
pub const DEFAULT_LOG_FILE: &str = "/tmp/tunneldeck.log";
/// Default log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "debug";

// === Device Property Keys ===

/// `nmcli connection show <uuid>` property carrying the IPv6 method.
pub const IPV6_METHOD_KEY: &str = "ipv6.method";
pub const IPV6_METHOD_AUTO: &str = "auto";
pub const IPV6_METHOD_DISABLED: &str = "disabled";
/// Marker of the DHCP option carrying the DNS server list.
pub const DHCP_DNS_MARKER: &str = "domain_name_servers";
/// Prefixes of the ping summary line (iputils, busybox).
pub const RTT_PREFIXES: [&str; 2] = ["rtt ", "round-trip "];

// === UI Messages ===

pub const MSG_NO_CONNECTIONS: &str = "No Connections Found";
pub const MSG_LOADING: &str = "Loading...";
pub const MSG_REFRESHING: &str = "Collecting network info...";
pub const MSG_NO_ACTIVE: &str = "No active connection";
pub const MSG_NO_REPORT: &str = "No diagnostic report yet. Press [r] to refresh.";
pub const MSG_IPV6_RESTART: &str = "Restarting NetworkManager...";
pub const MSG_OPENVPN_INSTALLING: &str = "Installing OpenVPN support...";
pub const MSG_OPENVPN_REMOVING: &str = "Removing OpenVPN support...";

pub const TITLE_CONNECTIONS: &str = " Connections ";
pub const TITLE_NETWORK_INFO: &str = " Network Info ";
pub const TITLE_SETTINGS: &str = " Settings ";
pub const TITLE_REPORT: &str = " Diagnostic Report ";

pub const LABEL_PRIORITY_INTERFACE: &str = "Prioritized Network Interface";
pub const LABEL_PRIORITY_LAN_IP: &str = "Prioritized Interface LAN IP";
pub const LABEL_GATEWAY: &str = "Gateway reachable";
pub const LABEL_INTERNET: &str = "Internet reachable";
pub const LABEL_ENABLE_OPENVPN: &str = "Enable OpenVPN";
pub const DESC_ENABLE_OPENVPN: &str = "Installs OpenVPN support for Network Manager";
pub const LABEL_DISABLE_IPV6: &str = "Disable IPV6";
pub const DESC_DISABLE_IPV6: &str =
    "Disables IPV6 support for the current connection. Required for some VPNs.";

// === Error Messages ===

pub const ERR_NO_INTERFACE: &str = "Unable to determine the priority interface";
pub const ERR_NOT_ROOT: &str = "not running as root; NetworkManager may refuse the change";
