//! Diagnostic snapshot types.

use serde::Serialize;

use super::connection::ActiveConnection;
use crate::constants;

/// Outbound interface chosen by the routing table for the anchor host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PriorityInterface {
    pub success: bool,
    pub device_name: String,
    pub local_ip: String,
}

impl PriorityInterface {
    /// Failed lookup with placeholder data.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            success: false,
            device_name: constants::NOT_AVAILABLE.to_string(),
            local_ip: constants::NOT_AVAILABLE.to_string(),
        }
    }
}

/// Outcome of a single reachability probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PingResult {
    pub address: String,
    pub could_ping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_time_ms: Option<String>,
}

impl PingResult {
    #[must_use]
    pub fn reachable(address: &str, ping_time_ms: Option<String>) -> Self {
        Self {
            address: address.to_string(),
            could_ping: true,
            ping_time_ms,
        }
    }

    /// A failed probe never carries a round-trip time.
    #[must_use]
    pub fn unreachable(address: &str) -> Self {
        Self {
            address: address.to_string(),
            could_ping: false,
            ping_time_ms: None,
        }
    }

    /// One-line human summary used in the diagnostic report.
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.could_ping, &self.ping_time_ms) {
            (true, Some(time)) => format!("Ping {}: reachable ({time})", self.address),
            (true, None) => format!("Ping {}: reachable", self.address),
            (false, _) => format!("Ping {}: unreachable", self.address),
        }
    }
}

/// Fill level of the diagnostic cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Partial,
    Complete,
}

/// Most recent discovery for the current connection state.
///
/// Reset to [`Default`] before any connection mutation; read operations fill
/// in only the fields they need.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticCache {
    pub anchor_ip: String,
    pub active_connection: ActiveConnection,
    pub priority_interface: PriorityInterface,
    pub ping_results: Vec<PingResult>,
}

impl DiagnosticCache {
    #[must_use]
    pub fn state(&self) -> CacheState {
        if *self == Self::default() {
            CacheState::Empty
        } else if !self.anchor_ip.is_empty()
            && self.priority_interface.success
            && self.active_connection.is_resolved()
        {
            CacheState::Complete
        } else {
            CacheState::Partial
        }
    }
}

/// Result of the full gateway diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub success: bool,
    pub data: String,
    pub gateway_reachable: bool,
}

impl NetworkInfo {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: message.into(),
            gateway_reachable: false,
        }
    }
}

/// Single-value lookup (`data` is `N/A` on failure).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub success: bool,
    pub data: String,
}

impl LookupResult {
    #[must_use]
    pub fn found(data: &str) -> Self {
        Self {
            success: true,
            data: data.to_string(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            success: false,
            data: constants::NOT_AVAILABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionRecord;

    #[test]
    fn test_unreachable_has_no_time() {
        let result = PingResult::unreachable("10.0.0.1");
        assert!(!result.could_ping);
        assert_eq!(result.ping_time_ms, None);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("ping_time_ms").is_none());
    }

    #[test]
    fn test_summaries() {
        let ok = PingResult::reachable("10.0.0.1", Some("2.0 ms".to_string()));
        assert_eq!(ok.summary(), "Ping 10.0.0.1: reachable (2.0 ms)");
        assert_eq!(
            PingResult::unreachable("10.0.0.1").summary(),
            "Ping 10.0.0.1: unreachable"
        );
    }

    #[test]
    fn test_cache_state_transitions() {
        let mut cache = DiagnosticCache::default();
        assert_eq!(cache.state(), CacheState::Empty);

        cache.anchor_ip = "23.0.0.1".to_string();
        assert_eq!(cache.state(), CacheState::Partial);

        cache.priority_interface = PriorityInterface {
            success: true,
            device_name: "wlan0".to_string(),
            local_ip: "192.168.1.20".to_string(),
        };
        cache.active_connection = ActiveConnection {
            connection: ConnectionRecord::new("Home", "u-1", "802-11-wireless", "wlan0"),
            ipv6_disabled: false,
        };
        assert_eq!(cache.state(), CacheState::Complete);
    }

    #[test]
    fn test_failed_interface_lookup_is_not_empty() {
        let cache = DiagnosticCache {
            priority_interface: PriorityInterface::unavailable(),
            ..DiagnosticCache::default()
        };
        assert_eq!(cache.state(), CacheState::Partial);
    }
}
