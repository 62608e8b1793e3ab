//! Background worker for the panel.
//!
//! Diagnostics and connection changes block on external tools for seconds
//! at a time, so the panel never calls the engine directly. It sends
//! [`PanelRequest`]s to this worker and drains [`PanelUpdate`]s on every
//! tick. The worker also refreshes on its own every refresh interval.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::command::CommandRunner;
use super::controller::ConnectionController;
use crate::constants;
use crate::state::{ActiveConnection, ConnectionRecord, LookupResult, NetworkInfo};

/// Commands sent from the panel to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelRequest {
    /// Collect a fresh snapshot now.
    Refresh,
    /// Bring the connection up if it is down, down if it is up.
    Toggle(ConnectionRecord),
    /// Enable (`true`) or disable IPv6 on the active connection.
    SetIpv6(bool),
    /// Enable or disable OpenVPN support.
    SetOpenVpn(bool),
    Shutdown,
}

/// Everything the panel renders, collected in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub connections: Result<Vec<ConnectionRecord>, String>,
    pub active: Option<ActiveConnection>,
    pub interface: LookupResult,
    pub lan_ip: LookupResult,
    pub network: NetworkInfo,
    pub internet: bool,
    pub vpn_enabled: bool,
    pub openvpn_installed: bool,
}

/// Messages sent from the worker to the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelUpdate {
    /// A long-running request started.
    Busy(String),
    /// A request finished.
    Finished { ok: bool, message: String },
    Snapshot(Box<PanelSnapshot>),
}

/// Connections shown in the panel: VPN-like types, sorted by name.
#[must_use]
pub fn panel_connections(records: Vec<ConnectionRecord>, vpn_types: &[String]) -> Vec<ConnectionRecord> {
    let mut shown: Vec<_> = records
        .into_iter()
        .filter(|record| vpn_types.iter().any(|t| t == record.type_name()))
        .collect();
    shown.sort_by(|a, b| a.name().cmp(b.name()));
    shown
}

struct PanelWorker<R: CommandRunner> {
    controller: Arc<ConnectionController<R>>,
    vpn_types: Vec<String>,
    updates: Sender<PanelUpdate>,
}

impl<R: CommandRunner> PanelWorker<R> {
    fn send(&self, update: PanelUpdate) -> bool {
        self.updates.send(update).is_ok()
    }

    fn collect(&self) -> PanelSnapshot {
        let engine = self.controller.engine();
        let connections = engine
            .list_connections()
            .map(|records| panel_connections(records, &self.vpn_types))
            .map_err(|e| e.to_string());

        // Each snapshot reports only its own probes.
        engine.clear_ping_results();
        let internet = engine.is_internet_reachable();
        let network = engine.get_prioritized_network_info();

        PanelSnapshot {
            connections,
            active: engine.active_connection(),
            interface: engine.priority_interface_name(),
            lan_ip: engine.priority_lan_ip(),
            network,
            internet,
            vpn_enabled: self.controller.is_vpn_enabled(),
            openvpn_installed: engine.is_openvpn_package_installed(),
        }
    }

    fn toggle(&self, record: &ConnectionRecord) -> (bool, String) {
        let (result, verb) = if record.connected() {
            (self.controller.deactivate(record.uuid()), "Disconnected from")
        } else {
            (self.controller.activate(record.uuid()), "Connected to")
        };
        match result {
            Ok(output) if output.has_error_output() => {
                let reason = output.stderr.lines().next().unwrap_or_default().trim();
                (false, reason.to_string())
            }
            Ok(_) => (true, format!("{verb} {}", record.name())),
            Err(e) => (false, e.to_string()),
        }
    }

    fn set_ipv6(&self, enabled: bool) -> (bool, String) {
        match self.controller.set_active_ipv6(enabled) {
            Ok(true) => (true, format!("IPv6 {}", if enabled { "enabled" } else { "disabled" })),
            Ok(false) => (false, constants::MSG_NO_ACTIVE.to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    fn set_openvpn(&self, enabled: bool) -> (bool, String) {
        match self.controller.set_vpn_enabled(enabled) {
            Ok(()) => (
                true,
                format!("OpenVPN support {}", if enabled { "enabled" } else { "disabled" }),
            ),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Run one mutating request. Returns `false` once the panel is gone.
    fn mutate(&self, busy: &str, apply: impl FnOnce(&Self) -> (bool, String)) -> bool {
        if !self.send(PanelUpdate::Busy(busy.to_string())) {
            return false;
        }
        let (ok, message) = apply(self);
        info!("Panel request finished (ok: {ok}): {message}");
        if !self.send(PanelUpdate::Finished { ok, message }) {
            return false;
        }
        // Give NetworkManager a moment to settle before reading it back.
        thread::sleep(constants::PANEL_COLLECT_DELAY);
        self.refresh()
    }

    fn refresh(&self) -> bool {
        debug!("Collecting panel snapshot");
        let snapshot = self.collect();
        self.send(PanelUpdate::Snapshot(Box::new(snapshot)))
    }

    fn run(self, requests: &Receiver<PanelRequest>, refresh_every: Duration) {
        let mut alive = self.refresh();
        while alive {
            alive = match requests.recv_timeout(refresh_every) {
                Ok(PanelRequest::Refresh) | Err(RecvTimeoutError::Timeout) => self.refresh(),
                Ok(PanelRequest::Toggle(record)) => {
                    let busy = if record.connected() { "Disconnecting..." } else { "Connecting..." };
                    self.mutate(busy, |w| w.toggle(&record))
                }
                Ok(PanelRequest::SetIpv6(enabled)) => {
                    self.mutate(constants::MSG_IPV6_RESTART, |w| w.set_ipv6(enabled))
                }
                Ok(PanelRequest::SetOpenVpn(enabled)) => {
                    let busy = if enabled {
                        constants::MSG_OPENVPN_INSTALLING
                    } else {
                        constants::MSG_OPENVPN_REMOVING
                    };
                    self.mutate(busy, |w| w.set_openvpn(enabled))
                }
                Ok(PanelRequest::Shutdown) | Err(RecvTimeoutError::Disconnected) => false,
            };
        }
        debug!("Panel worker stopped");
    }
}

/// Spawn the panel worker.
///
/// The worker collects a snapshot immediately, then again every
/// `refresh_every` and after each request. It stops on
/// [`PanelRequest::Shutdown`] or when either channel end is dropped.
pub fn spawn_panel_worker<R>(
    controller: Arc<ConnectionController<R>>,
    vpn_types: Vec<String>,
    refresh_every: Duration,
) -> (Sender<PanelRequest>, Receiver<PanelUpdate>)
where
    R: CommandRunner + 'static,
{
    let (request_tx, request_rx) = mpsc::channel();
    let (update_tx, update_rx) = mpsc::channel();

    let worker = PanelWorker {
        controller,
        vpn_types,
        updates: update_tx,
    };
    thread::spawn(move || worker.run(&request_rx, refresh_every));

    (request_tx, update_rx)
}
