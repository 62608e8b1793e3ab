//! Gateway / DNS resolution from a device property dump.
//!
//! Input is `nmcli -t -f all device show <dev>` output, one `KEY:VALUE`
//! pair per line. The address to probe is picked from fixed candidate tables
//! in priority order: IPv6 (when preferred), then IPv4, then the DHCP DNS
//! option. The same pass collects the human readable lines for the report.

use tracing::debug;

/// How a property key is recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyMatch {
    Exact(&'static str),
    Prefix(&'static str),
}

impl KeyMatch {
    fn matches(self, key: &str) -> bool {
        match self {
            Self::Exact(expected) => key == expected,
            Self::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

/// How the address is extracted from a matching value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueMode {
    /// The whole value after the key, colons included.
    Joined,
    /// `domain_name_servers = a b c`: the last server of the list.
    LastNameServer,
}

/// One row of a candidate table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayCandidate {
    pub key: KeyMatch,
    pub mode: ValueMode,
}

impl GatewayCandidate {
    const fn joined(key: &'static str) -> Self {
        Self {
            key: KeyMatch::Exact(key),
            mode: ValueMode::Joined,
        }
    }

    /// Address carried by `value`, `None` for an empty value.
    fn extract(self, value: &str) -> Option<String> {
        match self.mode {
            ValueMode::Joined => {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            ValueMode::LastNameServer => {
                if !value.contains(crate::constants::DHCP_DNS_MARKER) {
                    return None;
                }
                let (_, servers) = value.split_once('=')?;
                servers.split_whitespace().last().map(ToString::to_string)
            }
        }
    }
}

/// IPv6 candidates, highest priority first.
pub const IPV6_CANDIDATES: [GatewayCandidate; 4] = [
    GatewayCandidate::joined("IP6.GATEWAY"),
    GatewayCandidate::joined("IP6.DNS[3]"),
    GatewayCandidate::joined("IP6.DNS[2]"),
    GatewayCandidate::joined("IP6.DNS[1]"),
];

/// IPv4 candidates, highest priority first.
pub const IPV4_CANDIDATES: [GatewayCandidate; 4] = [
    GatewayCandidate::joined("IP4.GATEWAY"),
    GatewayCandidate::joined("IP4.DNS[3]"),
    GatewayCandidate::joined("IP4.DNS[2]"),
    GatewayCandidate::joined("IP4.DNS[1]"),
];

/// Last resort: the DNS servers handed out by DHCP.
pub const DHCP_CANDIDATES: [GatewayCandidate; 1] = [GatewayCandidate {
    key: KeyMatch::Prefix("DHCP4.OPTION"),
    mode: ValueMode::LastNameServer,
}];

/// Property keys rendered into the report with a friendly label.
const LABELLED_KEYS: [(&str, &str); 9] = [
    ("GENERAL.DEVICE", "Device"),
    ("GENERAL.STATE", "State"),
    ("GENERAL.REASON", "Reason"),
    ("GENERAL.IP4-CONNECTIVITY", "IPv4 connectivity"),
    ("GENERAL.IP6-CONNECTIVITY", "IPv6 connectivity"),
    ("GENERAL.IP-IFACE", "IP interface"),
    ("GENERAL.CONNECTION", "Connection"),
    ("GENERAL.METERED", "Metered"),
    ("CAPABILITIES.SPEED", "Link speed"),
];

/// Key fragments rendered into the report under their own key.
const ADDRESS_FRAGMENTS: [&str; 3] = [".ADDRESS", ".GATEWAY", ".DNS"];

/// Best match so far against one candidate table.
struct CandidateScan {
    table: &'static [GatewayCandidate],
    best: Option<(usize, String)>,
}

impl CandidateScan {
    const fn new(table: &'static [GatewayCandidate]) -> Self {
        Self { table, best: None }
    }

    /// The top-ranked candidate cannot be beaten, so scanning stops there.
    fn settled(&self) -> bool {
        matches!(self.best, Some((0, _)))
    }

    fn offer(&mut self, key: &str, value: &str) {
        if self.settled() {
            return;
        }
        let limit = self.best.as_ref().map_or(self.table.len(), |(rank, _)| *rank);
        let found = self.table[..limit]
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.key.matches(key))
            .find_map(|(rank, candidate)| candidate.extract(value).map(|addr| (rank, addr)));
        if found.is_some() {
            self.best = found;
        }
    }

    fn into_address(self) -> Option<String> {
        self.best.map(|(_, address)| address)
    }
}

/// Outcome of [`resolve_gateway`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatewayResolution {
    /// Address to probe, if any candidate matched.
    pub address: Option<String>,
    /// `LABEL: value` lines describing the device.
    pub details: Vec<String>,
}

/// Report line for a property, if the key is one we describe.
fn describe(key: &str, value: &str) -> Option<String> {
    let label = LABELLED_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
        .or_else(|| {
            ADDRESS_FRAGMENTS
                .iter()
                .any(|fragment| key.contains(fragment))
                .then_some(key)
        })?;

    let value = value.trim();
    let value = if value.is_empty() { "--" } else { value };
    Some(format!("{label}: {value}"))
}

/// Find the best gateway/DNS address in a device property dump.
///
/// IPv6 candidates are only considered when `ipv6_preferred`. Within a
/// family the table order decides, independent of line order. A key with an
/// empty value never matches.
pub fn resolve_gateway<S: AsRef<str>>(properties: &[S], ipv6_preferred: bool) -> GatewayResolution {
    let mut ipv6 = CandidateScan::new(&IPV6_CANDIDATES);
    let mut ipv4 = CandidateScan::new(&IPV4_CANDIDATES);
    let mut dhcp = CandidateScan::new(&DHCP_CANDIDATES);
    let mut details = Vec::new();

    for line in properties {
        // Everything after the first colon is the value, so IPv6 addresses
        // and DNS lists come through whole.
        let Some((key, value)) = line.as_ref().split_once(':') else {
            continue;
        };
        let key = key.trim();

        if let Some(detail) = describe(key, value) {
            details.push(detail);
        }
        if ipv6_preferred {
            ipv6.offer(key, value);
        }
        ipv4.offer(key, value);
        dhcp.offer(key, value);
    }

    let address = ipv6
        .into_address()
        .or_else(|| ipv4.into_address())
        .or_else(|| dhcp.into_address());
    debug!(
        "Resolved gateway {address:?} (ipv6 preferred: {ipv6_preferred}, {} detail lines)",
        details.len()
    );

    GatewayResolution { address, details }
}
