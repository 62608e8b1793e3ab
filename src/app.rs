//! Panel application state and key handling.
//!
//! [`App`] never talks to NetworkManager itself. Every read and every change
//! goes through the background worker (see [`crate::core::worker`]); the
//! app only renders the latest [`PanelSnapshot`] and turns key presses into
//! [`PanelRequest`]s.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use tracing::{debug, warn};

use crate::constants;
use crate::core::worker::{PanelRequest, PanelSnapshot, PanelUpdate};
use crate::state::{ActiveConnection, ConnectionRecord, LookupResult, NetworkInfo, Toast, ToastType};

/// Main application state.
#[allow(clippy::struct_excessive_bools)]
pub struct App {
    /// Flag indicating the application should exit.
    pub should_quit: bool,

    // === Connections ===
    pub connections: Vec<ConnectionRecord>,
    /// Why the last listing failed, if it did.
    pub connections_error: Option<String>,
    pub list_state: ListState,

    // === Network Info ===
    pub active: Option<ActiveConnection>,
    pub interface: LookupResult,
    pub lan_ip: LookupResult,
    pub network: Option<NetworkInfo>,
    pub internet: bool,

    // === Settings ===
    pub vpn_enabled: bool,
    pub openvpn_installed: bool,

    // === UI State ===
    /// No snapshot has arrived yet.
    pub loading: bool,
    /// Message of the request the worker is busy with.
    pub busy: Option<String>,
    pub show_report: bool,
    pub report_scroll: u16,
    pub toast: Option<Toast>,
    pub terminal_size: (u16, u16),
    pub is_root: bool,

    requests: Option<Sender<PanelRequest>>,
    updates: Option<Receiver<PanelUpdate>>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Empty panel, not yet connected to a worker.
    pub fn new() -> Self {
        Self {
            should_quit: false,
            connections: Vec::new(),
            connections_error: None,
            list_state: ListState::default(),
            active: None,
            interface: LookupResult::not_found(),
            lan_ip: LookupResult::not_found(),
            network: None,
            internet: false,
            vpn_enabled: false,
            openvpn_installed: false,
            loading: true,
            busy: None,
            show_report: false,
            report_scroll: 0,
            toast: None,
            terminal_size: (80, 24),
            is_root: crate::core::controller::is_root(),
            requests: None,
            updates: None,
        }
    }

    /// Wire the panel to a running worker.
    #[must_use]
    pub fn with_worker(mut self, requests: Sender<PanelRequest>, updates: Receiver<PanelUpdate>) -> Self {
        self.requests = Some(requests);
        self.updates = Some(updates);
        self
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.show_report {
            self.handle_report_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('6') => self.toggle_ipv6(),
            KeyCode::Char('o') => self.toggle_openvpn(),
            KeyCode::Char('r') => {
                if self.request(PanelRequest::Refresh) {
                    self.show_toast(constants::MSG_REFRESHING, ToastType::Info);
                }
            }
            KeyCode::Char('i') => {
                self.show_report = true;
                self.report_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_report_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('i' | 'q') => self.show_report = false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.report_scroll = self.report_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.report_scroll + 1 < self.report_line_count() {
                    self.report_scroll += 1;
                }
            }
            KeyCode::Char('g') => self.report_scroll = 0,
            KeyCode::Char('G') => self.report_scroll = self.report_line_count().saturating_sub(1),
            _ => {}
        }
    }

    /// Text of the diagnostic report overlay.
    pub fn report_text(&self) -> &str {
        self.network
            .as_ref()
            .map_or(constants::MSG_NO_REPORT, |info| info.data.as_str())
    }

    fn report_line_count(&self) -> u16 {
        u16::try_from(self.report_text().lines().count()).unwrap_or(u16::MAX)
    }

    pub fn selected_connection(&self) -> Option<&ConnectionRecord> {
        self.list_state.selected().and_then(|i| self.connections.get(i))
    }

    fn select_next(&mut self) {
        if self.connections.is_empty() {
            return;
        }
        let next = self
            .list_state
            .selected()
            .map_or(0, |i| (i + 1) % self.connections.len());
        self.list_state.select(Some(next));
    }

    fn select_previous(&mut self) {
        if self.connections.is_empty() {
            return;
        }
        let len = self.connections.len();
        let previous = self.list_state.selected().map_or(0, |i| (i + len - 1) % len);
        self.list_state.select(Some(previous));
    }

    /// Whether a toggle on the IPv6 setting can do anything.
    pub fn ipv6_toggle_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the OpenVPN setting can be changed from the panel.
    pub fn openvpn_toggle_enabled(&self) -> bool {
        !self.openvpn_installed
    }

    fn ensure_idle(&mut self) -> bool {
        if let Some(busy) = self.busy.clone() {
            self.show_toast(busy, ToastType::Warning);
            return false;
        }
        true
    }

    fn toggle_selected(&mut self) {
        let Some(record) = self.selected_connection().cloned() else {
            return;
        };
        if self.ensure_idle() {
            self.request(PanelRequest::Toggle(record));
        }
    }

    fn toggle_ipv6(&mut self) {
        let Some(active) = &self.active else {
            self.show_toast(constants::MSG_NO_ACTIVE, ToastType::Warning);
            return;
        };
        // The setting reads "Disable IPv6", so a disabled connection gets it back.
        let enable = active.ipv6_disabled;
        if self.ensure_idle() {
            self.request(PanelRequest::SetIpv6(enable));
        }
    }

    fn toggle_openvpn(&mut self) {
        if !self.openvpn_toggle_enabled() {
            self.show_toast(
                format!("{} is installed system-wide", constants::OPENVPN_PACKAGE),
                ToastType::Info,
            );
            return;
        }
        let enable = !self.vpn_enabled;
        if self.ensure_idle() {
            self.request(PanelRequest::SetOpenVpn(enable));
        }
    }

    /// Send a request to the worker. Returns `false` if it is gone.
    fn request(&mut self, request: PanelRequest) -> bool {
        debug!("Panel request: {request:?}");
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(request).is_ok());
        if !sent {
            warn!("Panel worker is not running");
            self.show_toast("Background worker stopped", ToastType::Error);
        }
        sent
    }

    /// Ask the worker to stop.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.requests.take() {
            let _ = tx.send(PanelRequest::Shutdown);
        }
    }

    /// Show a toast notification
    pub fn show_toast(&mut self, message: impl Into<String>, toast_type: ToastType) {
        let ttl = if toast_type == ToastType::Error {
            constants::TOAST_ERROR_DURATION
        } else {
            constants::TOAST_DURATION
        };
        self.toast = Some(Toast::new(message, toast_type, ttl));
    }

    /// Apply one message from the worker.
    pub fn apply_update(&mut self, update: PanelUpdate) {
        match update {
            PanelUpdate::Busy(message) => {
                self.show_toast(message.clone(), ToastType::Info);
                self.busy = Some(message);
            }
            PanelUpdate::Finished { ok, message } => {
                self.busy = None;
                let kind = if ok { ToastType::Success } else { ToastType::Error };
                self.show_toast(message, kind);
            }
            PanelUpdate::Snapshot(snapshot) => self.apply_snapshot(*snapshot),
        }
    }

    fn apply_snapshot(&mut self, snapshot: PanelSnapshot) {
        let selected_uuid = self.selected_connection().map(|c| c.uuid().to_string());

        match snapshot.connections {
            Ok(connections) => {
                self.connections = connections;
                self.connections_error = None;
            }
            Err(e) => {
                self.connections.clear();
                self.connections_error = Some(e);
            }
        }

        // Keep the cursor on the same connection across refreshes.
        let selected = selected_uuid
            .and_then(|uuid| self.connections.iter().position(|c| c.uuid() == uuid))
            .or_else(|| (!self.connections.is_empty()).then_some(0));
        self.list_state.select(selected);

        self.active = snapshot.active;
        self.interface = snapshot.interface;
        self.lan_ip = snapshot.lan_ip;
        self.network = Some(snapshot.network);
        self.internet = snapshot.internet;
        self.vpn_enabled = snapshot.vpn_enabled;
        self.openvpn_installed = snapshot.openvpn_installed;
        self.loading = false;
    }

    /// Called on each tick
    pub fn on_tick(&mut self) {
        let updates: Vec<_> = self
            .updates
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default();
        for update in updates {
            self.apply_update(update);
        }

        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.is_expired(Instant::now()))
        {
            self.toast = None;
        }
    }

    /// Called when terminal is resized
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn snapshot() -> PanelSnapshot {
        PanelSnapshot {
            connections: Ok(vec![
                ConnectionRecord::new("Amsterdam", "u-a", "vpn", ""),
                ConnectionRecord::new("Zurich", "u-z", "wireguard", "wg0"),
            ]),
            active: Some(ActiveConnection {
                connection: ConnectionRecord::new("Home", "u-h", "802-11-wireless", "wlan0"),
                ipv6_disabled: true,
            }),
            interface: LookupResult::found("wlan0"),
            lan_ip: LookupResult::found("192.168.1.20"),
            network: NetworkInfo {
                success: true,
                data: "Ping 192.168.1.1: reachable (2.0 ms)\nDevice: wlan0\nState: 100 (connected)".to_string(),
                gateway_reachable: true,
            },
            internet: true,
            vpn_enabled: false,
            openvpn_installed: false,
        }
    }

    fn wired_app() -> (App, mpsc::Receiver<PanelRequest>) {
        let (request_tx, request_rx) = mpsc::channel();
        let (_update_tx, update_rx) = mpsc::channel();
        let mut app = App::new().with_worker(request_tx, update_rx);
        app.apply_update(PanelUpdate::Snapshot(Box::new(snapshot())));
        (app, request_rx)
    }

    #[test]
    fn test_snapshot_selects_first_connection() {
        let (app, _rx) = wired_app();
        assert!(!app.loading);
        assert_eq!(app.selected_connection().unwrap().name(), "Amsterdam");
        assert!(app.ipv6_toggle_enabled());
    }

    #[test]
    fn test_selection_wraps() {
        let (mut app, _rx) = wired_app();
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected_connection().unwrap().name(), "Zurich");
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_connection().unwrap().name(), "Amsterdam");
    }

    #[test]
    fn test_selection_survives_refresh() {
        let (mut app, _rx) = wired_app();
        app.handle_key(key(KeyCode::Down));

        let mut reordered = snapshot();
        if let Ok(list) = &mut reordered.connections {
            list.reverse();
        }
        app.apply_update(PanelUpdate::Snapshot(Box::new(reordered)));
        assert_eq!(app.selected_connection().unwrap().name(), "Zurich");
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn test_enter_sends_toggle() {
        let (mut app, rx) = wired_app();
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            rx.try_recv().unwrap(),
            PanelRequest::Toggle(ConnectionRecord::new("Amsterdam", "u-a", "vpn", ""))
        );
    }

    #[test]
    fn test_ipv6_key_re_enables_disabled_connection() {
        let (mut app, rx) = wired_app();
        app.handle_key(key(KeyCode::Char('6')));
        assert_eq!(rx.try_recv().unwrap(), PanelRequest::SetIpv6(true));
    }

    #[test]
    fn test_ipv6_key_without_active_connection() {
        let (mut app, rx) = wired_app();
        app.active = None;
        app.handle_key(key(KeyCode::Char('6')));
        assert!(rx.try_recv().is_err());
        assert_eq!(app.toast.as_ref().unwrap().message, constants::MSG_NO_ACTIVE);
    }

    #[test]
    fn test_openvpn_locked_when_package_installed() {
        let (mut app, rx) = wired_app();
        app.openvpn_installed = true;
        app.handle_key(key(KeyCode::Char('o')));
        assert!(rx.try_recv().is_err());

        app.openvpn_installed = false;
        app.handle_key(key(KeyCode::Char('o')));
        assert_eq!(rx.try_recv().unwrap(), PanelRequest::SetOpenVpn(true));
    }

    #[test]
    fn test_busy_blocks_second_request() {
        let (mut app, rx) = wired_app();
        app.apply_update(PanelUpdate::Busy("Connecting...".to_string()));
        app.handle_key(key(KeyCode::Enter));
        assert!(rx.try_recv().is_err());

        app.apply_update(PanelUpdate::Finished {
            ok: true,
            message: "Connected to Amsterdam".to_string(),
        });
        assert!(app.busy.is_none());
        assert_eq!(app.toast.as_ref().unwrap().toast_type, ToastType::Success);
        app.handle_key(key(KeyCode::Enter));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_report_overlay_scrolls_within_bounds() {
        let (mut app, _rx) = wired_app();
        app.handle_key(key(KeyCode::Char('i')));
        assert!(app.show_report);

        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down));
        }
        assert_eq!(app.report_scroll, 2);
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.report_scroll, 0);

        // q closes the overlay instead of quitting.
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.show_report);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_listing_error_clears_connections() {
        let (mut app, _rx) = wired_app();
        let mut failed = snapshot();
        failed.connections = Err("`nmcli` timed out after 15s".to_string());
        app.apply_update(PanelUpdate::Snapshot(Box::new(failed)));
        assert!(app.connections.is_empty());
        assert_eq!(app.list_state.selected(), None);
        assert!(app.connections_error.is_some());
    }

    #[test]
    fn test_missing_worker_reports_error() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.toast.as_ref().unwrap().toast_type, ToastType::Error);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
