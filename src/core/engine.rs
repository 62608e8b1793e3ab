//! Diagnostic engine.
//!
//! Owns the [`DiagnosticCache`] and fills it lazily: each `ensure_*` call
//! only talks to the system when its field is missing. The connection
//! controller resets the cache before every mutation, so the next read
//! rediscovers everything.
//!
//! [`DiagnosticEngine::get_prioritized_network_info`] is the error boundary:
//! nothing below it may abort the diagnostic, failures come back as
//! `NetworkInfo { success: false, .. }`.

use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::command::{CommandRunner, Invocation, SystemRunner, ToolOutput};
use super::gateway::resolve_gateway;
use super::parser::{find_active_connection, ipv6_method_disabled, parse_connection_listing};
use super::probe;
use crate::config::{AppConfig, TimeoutConfig};
use crate::constants;
use crate::error::{EngineError, ToolError};
use crate::state::{
    ActiveConnection, CacheState, ConnectionRecord, DiagnosticCache, LookupResult, NetworkInfo,
    PingResult, PriorityInterface,
};

const CONNECTION_FIELDS: &str = "NAME,UUID,TYPE,DEVICE";

/// Engine tunables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub anchor_host: String,
    pub timeouts: TimeoutConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl EngineOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            anchor_host: config.network.anchor_host.clone(),
            timeouts: config.timeouts,
        }
    }
}

/// One entry of `ip -j route get` output.
#[derive(Debug, Deserialize)]
struct RouteEntry {
    dev: Option<String>,
    prefsrc: Option<String>,
}

/// Decode `ip -j route get` output into the priority interface.
///
/// Needs at least one route carrying both a device and a preferred source.
#[must_use]
pub fn parse_route(json: &str) -> Option<PriorityInterface> {
    let routes: Vec<RouteEntry> = match serde_json::from_str(json.trim()) {
        Ok(routes) => routes,
        Err(e) => {
            debug!("Undecodable route output: {e}");
            return None;
        }
    };
    routes.into_iter().find_map(|route| match (route.dev, route.prefsrc) {
        (Some(dev), Some(src)) if !dev.is_empty() && !src.is_empty() => Some(PriorityInterface {
            success: true,
            device_name: dev,
            local_ip: src,
        }),
        _ => None,
    })
}

/// First address of a `STREAM` record in `getent ahosts` output.
#[must_use]
pub fn parse_stream_address(getent: &str) -> Option<String> {
    getent
        .lines()
        .filter(|line| {
            line.split_whitespace()
                .nth(1)
                .is_some_and(|kind| kind == constants::STREAM_RECORD)
        })
        .find_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
}

pub(crate) fn connection_listing(active_only: bool, timeout: std::time::Duration) -> Invocation {
    let mut args = vec!["-t", "-f", CONNECTION_FIELDS, "connection", "show"];
    if active_only {
        args.push("--active");
    }
    Invocation::new(constants::TOOL_NMCLI, &args, timeout)
}

/// Orchestrates discovery, gateway resolution and probing.
pub struct DiagnosticEngine<R: CommandRunner = SystemRunner> {
    runner: R,
    options: EngineOptions,
    cache: Mutex<DiagnosticCache>,
}

impl<R: CommandRunner> DiagnosticEngine<R> {
    /// A fresh engine starts with an empty cache.
    pub fn new(runner: R, options: EngineOptions) -> Self {
        Self {
            runner,
            options,
            cache: Mutex::new(DiagnosticCache::default()),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// Lock the cache for one short update. Never held across a tool call.
    fn with_cache<T>(&self, f: impl FnOnce(&mut DiagnosticCache) -> T) -> T {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cache)
    }

    /// Copy of the current cache.
    pub fn snapshot(&self) -> DiagnosticCache {
        self.with_cache(|cache| cache.clone())
    }

    pub fn cache_state(&self) -> CacheState {
        self.with_cache(|cache| cache.state())
    }

    /// Drop everything discovered so far.
    pub fn reset_cache(&self) {
        self.with_cache(|cache| *cache = DiagnosticCache::default());
        debug!("Diagnostic cache reset");
    }

    /// Forget earlier probes while keeping the discovered route and connection.
    pub fn clear_ping_results(&self) {
        self.with_cache(|cache| cache.ping_results.clear());
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput, ToolError> {
        self.runner
            .run(&Invocation::new(program, args, self.options.timeouts.command()))
    }

    fn lookup_anchor_ip(&self) -> Result<String, EngineError> {
        let host = &self.options.anchor_host;
        let output = self.run(constants::TOOL_GETENT, &["ahosts", host])?;
        if output.has_error_output() {
            return Err(EngineError::Lookup(output.stderr.trim().to_string()));
        }
        parse_stream_address(&output.stdout)
            .ok_or_else(|| EngineError::Lookup(format!("no {} record for {host}", constants::STREAM_RECORD)))
    }

    /// Resolve the anchor host, cached after the first success.
    pub fn ensure_anchor_ip(&self) -> Option<String> {
        let cached = self.with_cache(|cache| cache.anchor_ip.clone());
        if !cached.is_empty() {
            return Some(cached);
        }

        match self.lookup_anchor_ip() {
            Ok(ip) => {
                debug!("Anchor {} resolved to {ip}", self.options.anchor_host);
                self.with_cache(|cache| cache.anchor_ip.clone_from(&ip));
                Some(ip)
            }
            Err(e) => {
                warn!("Resolving anchor {}: {e}", self.options.anchor_host);
                None
            }
        }
    }

    fn lookup_priority_interface(&self) -> PriorityInterface {
        let Some(anchor) = self.ensure_anchor_ip() else {
            return PriorityInterface::unavailable();
        };
        match self.run(constants::TOOL_IP, &["-j", "route", "get", &anchor]) {
            Ok(output) => parse_route(&output.stdout).unwrap_or_else(|| {
                warn!("No usable route to {anchor}");
                PriorityInterface::unavailable()
            }),
            Err(e) => {
                warn!("Route lookup for {anchor}: {e}");
                PriorityInterface::unavailable()
            }
        }
    }

    /// Interface the routing table uses to reach the anchor host.
    ///
    /// Served from the cache once a lookup has succeeded.
    pub fn ensure_priority_interface(&self) -> PriorityInterface {
        let cached = self.with_cache(|cache| cache.priority_interface.clone());
        if cached.success {
            return cached;
        }

        let interface = self.lookup_priority_interface();
        debug!("Priority interface: {interface:?}");
        self.with_cache(|cache| cache.priority_interface = interface.clone());
        interface
    }

    fn lookup_active_connection(&self) -> Result<Option<ActiveConnection>, ToolError> {
        let listing = self
            .runner
            .run(&connection_listing(true, self.options.timeouts.command()))?;
        let records = parse_connection_listing(&listing.stdout);
        let Some(record) = find_active_connection(&records).cloned() else {
            return Ok(None);
        };

        let ipv6_disabled = match self.run(constants::TOOL_NMCLI, &["connection", "show", record.uuid()]) {
            Ok(properties) => ipv6_method_disabled(&properties.stdout),
            Err(e) => {
                warn!("Reading IPv6 method of {}: {e}", record.uuid());
                false
            }
        };
        Ok(Some(ActiveConnection {
            connection: record,
            ipv6_disabled,
        }))
    }

    /// Active wifi/ethernet connection and its IPv6 setting.
    pub fn ensure_active_connection(&self) -> Option<ActiveConnection> {
        let cached = self.with_cache(|cache| cache.active_connection.clone());
        if cached.is_resolved() {
            return Some(cached);
        }

        match self.lookup_active_connection() {
            Ok(Some(active)) => {
                debug!(
                    "Active connection {} ({}), ipv6 disabled: {}",
                    active.connection.name(),
                    active.connection.device(),
                    active.ipv6_disabled
                );
                self.with_cache(|cache| cache.active_connection = active.clone());
                Some(active)
            }
            Ok(None) => {
                debug!("No active wifi or ethernet connection");
                None
            }
            Err(e) => {
                warn!("Listing active connections: {e}");
                None
            }
        }
    }

    /// Probe `address` once and record the result in the cache.
    pub fn probe(&self, address: &str) -> PingResult {
        let timeouts = &self.options.timeouts;
        let result = probe::probe(
            &self.runner,
            address,
            timeouts.probe_wait_secs,
            timeouts.probe_hard(),
        );
        self.with_cache(|cache| cache.ping_results.push(result.clone()));
        result
    }

    /// Probe the anchor host.
    pub fn probe_anchor(&self) -> bool {
        let host = self.options.anchor_host.clone();
        self.probe(&host).could_ping
    }

    pub fn is_internet_reachable(&self) -> bool {
        self.probe_anchor()
    }

    fn report(&self, details: &[String]) -> String {
        let mut lines = self.with_cache(|cache| {
            cache
                .ping_results
                .iter()
                .map(PingResult::summary)
                .collect::<Vec<_>>()
        });
        lines.extend(details.iter().cloned());
        lines.join("\n")
    }

    fn try_network_info(&self) -> Result<NetworkInfo, EngineError> {
        let interface = self.ensure_priority_interface();
        let active = self.ensure_active_connection();
        if !interface.success {
            return Err(EngineError::NoPriorityInterface);
        }

        let output = self.run(
            constants::TOOL_NMCLI,
            &["-t", "-f", "all", "device", "show", &interface.device_name],
        )?;
        let properties: Vec<&str> = output.stdout.lines().collect();

        // Without an active connection we cannot tell, so IPv4 goes first.
        let ipv6_preferred = active.as_ref().is_some_and(|a| !a.ipv6_disabled);
        let resolution = resolve_gateway(&properties, ipv6_preferred);

        let gateway_reachable = match &resolution.address {
            Some(address) => self.probe(address).could_ping,
            None => {
                debug!("No gateway or DNS address on {}", interface.device_name);
                false
            }
        };

        Ok(NetworkInfo {
            success: !resolution.details.is_empty(),
            data: self.report(&resolution.details),
            gateway_reachable,
        })
    }

    /// Full diagnostic of the priority interface.
    pub fn get_prioritized_network_info(&self) -> NetworkInfo {
        match self.try_network_info() {
            Ok(info) => info,
            Err(e) => {
                warn!("Network info: {e}");
                NetworkInfo::failure(e.to_string())
            }
        }
    }

    pub fn is_gateway_reachable(&self) -> bool {
        self.get_prioritized_network_info().gateway_reachable
    }

    pub fn active_connection(&self) -> Option<ActiveConnection> {
        self.ensure_active_connection()
    }

    pub fn priority_interface_name(&self) -> LookupResult {
        let interface = self.ensure_priority_interface();
        if interface.success {
            LookupResult::found(&interface.device_name)
        } else {
            LookupResult::not_found()
        }
    }

    pub fn priority_lan_ip(&self) -> LookupResult {
        let interface = self.ensure_priority_interface();
        if interface.success {
            LookupResult::found(&interface.local_ip)
        } else {
            LookupResult::not_found()
        }
    }

    /// Every known connection profile.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if `nmcli` cannot be run.
    pub fn list_connections(&self) -> Result<Vec<ConnectionRecord>, ToolError> {
        let listing = self
            .runner
            .run(&connection_listing(false, self.options.timeouts.command()))?;
        Ok(parse_connection_listing(&listing.stdout))
    }

    /// Whether the NetworkManager OpenVPN plugin is installed system-wide.
    pub fn is_openvpn_package_installed(&self) -> bool {
        match self.run(constants::TOOL_PACMAN, &["-Qi", constants::OPENVPN_PACKAGE]) {
            Ok(output) => output.success(),
            Err(e) => {
                info!("Package check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::MockCommandRunner;

    const GETENT: &str = "23.45.67.89     STREAM steampowered.com\n\
                          23.45.67.89     DGRAM  \n\
                          23.45.67.89     RAW    \n";
    const ROUTE: &str = r#"[{"dst":"23.45.67.89","gateway":"192.168.1.1","dev":"wlan0","prefsrc":"192.168.1.20","flags":[],"uid":1000,"cache":[]}]"#;

    fn expect_stdout(
        runner: &mut MockCommandRunner,
        program: &'static str,
        leading: &'static [&'static str],
        stdout: &'static str,
        times: usize,
    ) {
        runner
            .expect_run()
            .withf(move |inv: &Invocation| inv.matches(program, leading))
            .times(times)
            .returning(move |_| Ok(ToolOutput::from_stdout(stdout)));
    }

    fn engine(runner: MockCommandRunner) -> DiagnosticEngine<MockCommandRunner> {
        DiagnosticEngine::new(runner, EngineOptions::default())
    }

    #[test]
    fn test_parse_stream_address() {
        assert_eq!(parse_stream_address(GETENT).as_deref(), Some("23.45.67.89"));
        assert_eq!(parse_stream_address("23.45.67.89 DGRAM\n"), None);
        assert_eq!(parse_stream_address(""), None);
    }

    #[test]
    fn test_parse_route() {
        let interface = parse_route(ROUTE).unwrap();
        assert!(interface.success);
        assert_eq!(interface.device_name, "wlan0");
        assert_eq!(interface.local_ip, "192.168.1.20");
    }

    #[test]
    fn test_parse_route_rejects_incomplete() {
        assert_eq!(parse_route(""), None);
        assert_eq!(parse_route("[]"), None);
        assert_eq!(parse_route("not json"), None);
        assert_eq!(parse_route(r#"[{"dst":"1.2.3.4","dev":"wlan0"}]"#), None);
        assert_eq!(parse_route(r#"{"dev":"wlan0","prefsrc":"1.2.3.4"}"#), None);
    }

    #[test]
    fn test_priority_interface_is_cached() {
        let mut runner = MockCommandRunner::new();
        expect_stdout(&mut runner, "getent", &["ahosts"], GETENT, 1);
        expect_stdout(&mut runner, "ip", &["-j", "route", "get", "23.45.67.89"], ROUTE, 1);
        let engine = engine(runner);

        let first = engine.ensure_priority_interface();
        let second = engine.ensure_priority_interface();
        assert_eq!(first, second);
        assert_eq!(first.device_name, "wlan0");
        assert_eq!(engine.snapshot().anchor_ip, "23.45.67.89");
    }

    #[test]
    fn test_anchor_failure_skips_route_lookup() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("getent", &[]))
            .times(1)
            .returning(|_| Ok(ToolOutput::from_stderr("getent: failure", 2)));
        expect_stdout(&mut runner, "ip", &[], ROUTE, 0);
        let engine = engine(runner);

        let interface = engine.ensure_priority_interface();
        assert!(!interface.success);
        assert_eq!(interface.device_name, "N/A");
        assert!(engine.snapshot().anchor_ip.is_empty());
    }

    #[test]
    fn test_route_timeout_is_unavailable() {
        let mut runner = MockCommandRunner::new();
        expect_stdout(&mut runner, "getent", &["ahosts"], GETENT, 1);
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("ip", &[]))
            .times(1)
            .returning(|inv| {
                Err(ToolError::Timeout {
                    program: inv.program.clone(),
                    timeout: inv.timeout,
                })
            });
        let engine = engine(runner);

        assert_eq!(engine.ensure_priority_interface(), PriorityInterface::unavailable());
        assert_eq!(engine.priority_lan_ip(), LookupResult::not_found());
    }

    #[test]
    fn test_active_connection_merges_ipv6_flag() {
        let mut runner = MockCommandRunner::new();
        expect_stdout(
            &mut runner,
            "nmcli",
            &["-t", "-f", "NAME,UUID,TYPE,DEVICE", "connection", "show", "--active"],
            "Office:u0:vpn:tun0\nHome:u1:802-11-wireless:wlan0\n",
            1,
        );
        expect_stdout(
            &mut runner,
            "nmcli",
            &["connection", "show", "u1"],
            "connection.id:   Home\nipv6.method:     disabled\n",
            1,
        );
        let engine = engine(runner);

        let active = engine.ensure_active_connection().unwrap();
        assert_eq!(active.connection.name(), "Home");
        assert!(active.ipv6_disabled);

        // Second read comes from the cache.
        assert_eq!(engine.active_connection(), Some(active));
    }

    #[test]
    fn test_no_uplink_connection() {
        let mut runner = MockCommandRunner::new();
        expect_stdout(
            &mut runner,
            "nmcli",
            &["-t", "-f", "NAME,UUID,TYPE,DEVICE", "connection", "show", "--active"],
            "Office:u0:vpn:tun0\n",
            1,
        );
        let engine = engine(runner);
        assert_eq!(engine.ensure_active_connection(), None);
        assert_eq!(engine.cache_state(), CacheState::Empty);
    }

    #[test]
    fn test_probe_appends_in_order() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("ping", &[]))
            .times(3)
            .returning(|inv| {
                if inv.args.last().map(String::as_str) == Some("10.0.0.1") {
                    Ok(ToolOutput::from_stdout("rtt min/avg/max/mdev = 1.0/2.0/3.0/0.1 ms\n"))
                } else {
                    Ok(ToolOutput::from_stderr("ping: unknown host", 2))
                }
            });
        let engine = engine(runner);

        engine.probe("10.0.0.1");
        engine.probe("bad.host");
        engine.probe("10.0.0.1");

        let results = engine.snapshot().ping_results;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].ping_time_ms.as_deref(), Some("2.0 ms"));
        assert!(!results[1].could_ping);
        assert_eq!(results[2], results[0]);
    }

    #[test]
    fn test_internet_probe_uses_anchor_host() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| {
                inv.matches("ping", &[]) && inv.args.last().map(String::as_str) == Some("steampowered.com")
            })
            .times(1)
            .returning(|_| Ok(ToolOutput::from_stdout("")));
        let engine = engine(runner);
        assert!(engine.is_internet_reachable());
    }

    #[test]
    fn test_reset_empties_cache() {
        let mut runner = MockCommandRunner::new();
        expect_stdout(&mut runner, "getent", &["ahosts"], GETENT, 1);
        let engine = engine(runner);

        engine.ensure_anchor_ip();
        assert_eq!(engine.cache_state(), CacheState::Partial);
        engine.reset_cache();
        assert_eq!(engine.snapshot(), DiagnosticCache::default());
        assert_eq!(engine.cache_state(), CacheState::Empty);
    }

    #[test]
    fn test_network_info_without_interface_is_failure() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("getent", &[]))
            .returning(|_| Ok(ToolOutput::from_stdout("")));
        expect_stdout(
            &mut runner,
            "nmcli",
            &["-t", "-f", "NAME,UUID,TYPE,DEVICE", "connection", "show", "--active"],
            "",
            1,
        );
        let engine = engine(runner);

        let info = engine.get_prioritized_network_info();
        assert!(!info.success);
        assert!(!info.gateway_reachable);
        assert_eq!(info.data, constants::ERR_NO_INTERFACE);
    }

    #[test]
    fn test_package_check() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("pacman", &["-Qi", "networkmanager-openvpn"]))
            .times(1)
            .returning(|_| Ok(ToolOutput::from_stderr("error: package not found", 1)));
        assert!(!engine(runner).is_openvpn_package_installed());
    }
}
