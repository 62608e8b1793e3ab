//! NetworkManager connection records.

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Category of a connection, derived from NetworkManager's type string.
///
/// NetworkManager reports rich subtype strings (`802-11-wireless`,
/// `802-3-ethernet`, ...), so classification is by substring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionKind {
    Wifi,
    Ethernet,
    Vpn,
    #[default]
    Other,
}

impl ConnectionKind {
    /// Classify a raw connection type string.
    #[must_use]
    pub fn classify(type_name: &str) -> Self {
        let lower = type_name.to_ascii_lowercase();
        if lower.contains("wireless") || lower.contains("wifi") {
            Self::Wifi
        } else if lower.contains("ethernet") {
            Self::Ethernet
        } else if lower.contains("vpn") || lower.contains("wireguard") {
            Self::Vpn
        } else {
            Self::Other
        }
    }

    /// Wifi or ethernet: the kinds an active uplink can be.
    #[must_use]
    pub const fn is_uplink(self) -> bool {
        matches!(self, Self::Wifi | Self::Ethernet)
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionKind::Wifi => write!(f, "wifi"),
            ConnectionKind::Ethernet => write!(f, "ethernet"),
            ConnectionKind::Vpn => write!(f, "vpn"),
            ConnectionKind::Other => write!(f, "other"),
        }
    }
}

/// One line of a connection listing.
///
/// Immutable once constructed; `connected` is derived from the device field
/// so it cannot disagree with it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionRecord {
    name: String,
    uuid: String,
    type_name: String,
    kind: ConnectionKind,
    device: String,
}

impl ConnectionRecord {
    /// Build a record. A device of `--` (tabular nmcli output) counts as empty.
    #[must_use]
    pub fn new(name: &str, uuid: &str, type_name: &str, device: &str) -> Self {
        let device = device.trim();
        let device = if device == "--" { "" } else { device };
        Self {
            name: name.to_string(),
            uuid: uuid.trim().to_string(),
            type_name: type_name.trim().to_string(),
            kind: ConnectionKind::classify(type_name),
            device: device.to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Raw type string as reported by NetworkManager.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub const fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Device the connection is bound to, empty when disconnected.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        !self.device.is_empty()
    }
}

impl Serialize for ConnectionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ConnectionRecord", 6)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("uuid", &self.uuid)?;
        state.serialize_field("type", &self.type_name)?;
        state.serialize_field("kind", &self.kind.to_string())?;
        state.serialize_field("device", &self.device)?;
        state.serialize_field("connected", &self.connected())?;
        state.end()
    }
}

/// The active uplink connection plus its IPv6 setting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveConnection {
    pub connection: ConnectionRecord,
    pub ipv6_disabled: bool,
}

impl ActiveConnection {
    /// Whether this holds a real, connected, named connection.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.connection.connected() && !self.connection.name().is_empty()
    }
}

impl Serialize for ActiveConnection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = &self.connection;
        let mut state = serializer.serialize_struct("ActiveConnection", 7)?;
        state.serialize_field("name", record.name())?;
        state.serialize_field("uuid", record.uuid())?;
        state.serialize_field("type", record.type_name())?;
        state.serialize_field("kind", &record.kind().to_string())?;
        state.serialize_field("device", record.device())?;
        state.serialize_field("connected", &record.connected())?;
        state.serialize_field("ipv6_disabled", &self.ipv6_disabled)?;
        state.end()
    }
}
