//! Connection listing parser.
//!
//! Listings come from `nmcli -t -f NAME,UUID,TYPE,DEVICE connection show`,
//! one connection per line. In terse mode nmcli escapes `:` as `\:` and `\`
//! as `\\` inside values, so a connection named `Work: VPN` arrives as
//! `Work\: VPN:...`.

use tracing::warn;

use crate::constants;
use crate::error::ParseError;
use crate::state::ConnectionRecord;

const DELIMITER: char = ':';
const ESCAPE: char = '\\';
/// Fields after the name: uuid, type, device.
const TRAILING_FIELDS: usize = 3;

/// Split `line` on unescaped delimiters, removing the escapes.
fn split_escaped(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(next) => current.push(next),
                None => current.push(ESCAPE),
            },
            DELIMITER => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse one listing line into a [`ConnectionRecord`].
///
/// The last three fields are always uuid, type and device; anything before
/// them belongs to the name, so a name with an unescaped delimiter still
/// lines up.
///
/// # Errors
///
/// Returns [`ParseError::MissingFields`] for lines with fewer than 4 fields.
pub fn parse_connection(line: &str) -> Result<ConnectionRecord, ParseError> {
    let fields = split_escaped(line);
    if fields.len() < TRAILING_FIELDS + 1 {
        return Err(ParseError::MissingFields {
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let split = fields.len() - TRAILING_FIELDS;
    let name = fields[..split].join(":");
    Ok(ConnectionRecord::new(
        &name,
        &fields[split],
        &fields[split + 1],
        &fields[split + 2],
    ))
}

/// Parse a whole listing, skipping blank and malformed lines.
#[must_use]
pub fn parse_connection_listing(listing: &str) -> Vec<ConnectionRecord> {
    listing
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_connection(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping connection line: {e}");
                None
            }
        })
        .collect()
}

/// First wifi or ethernet record, in listing order.
#[must_use]
pub fn find_active_connection(records: &[ConnectionRecord]) -> Option<&ConnectionRecord> {
    records.iter().find(|record| record.kind().is_uplink())
}

/// Whether a `nmcli connection show <uuid>` dump has IPv6 disabled.
#[must_use]
pub fn ipv6_method_disabled(properties: &str) -> bool {
    properties
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with(constants::IPV6_METHOD_KEY))
        .is_some_and(|line| line.contains(constants::IPV6_METHOD_DISABLED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionKind;

    #[test]
    fn test_parse_connected_wifi() {
        let record =
            parse_connection("Home:3f1c4a2e-0000-4000-8000-000000000001:802-11-wireless:wlan0")
                .unwrap();
        assert_eq!(record.name(), "Home");
        assert_eq!(record.uuid(), "3f1c4a2e-0000-4000-8000-000000000001");
        assert_eq!(record.type_name(), "802-11-wireless");
        assert_eq!(record.kind(), ConnectionKind::Wifi);
        assert_eq!(record.device(), "wlan0");
        assert!(record.connected());
    }

    #[test]
    fn test_parse_disconnected_vpn() {
        let record = parse_connection("Office VPN:u-2:vpn:").unwrap();
        assert_eq!(record.name(), "Office VPN");
        assert_eq!(record.kind(), ConnectionKind::Vpn);
        assert!(!record.connected());
    }

    #[test]
    fn test_escaped_delimiter_in_name() {
        let record = parse_connection(r"Work\: Berlin:u-3:wireguard:wg0").unwrap();
        assert_eq!(record.name(), "Work: Berlin");
        assert_eq!(record.uuid(), "u-3");
        assert_eq!(record.type_name(), "wireguard");
        assert_eq!(record.device(), "wg0");
    }

    #[test]
    fn test_escaped_backslash_in_name() {
        let record = parse_connection(r"back\\slash:u-4:vpn:").unwrap();
        assert_eq!(record.name(), r"back\slash");
    }

    #[test]
    fn test_unescaped_delimiter_stays_in_name() {
        let record = parse_connection("a:b:u-5:802-3-ethernet:eth0").unwrap();
        assert_eq!(record.name(), "a:b");
        assert_eq!(record.uuid(), "u-5");
        assert_eq!(record.kind(), ConnectionKind::Ethernet);
    }

    #[test]
    fn test_connected_matches_device_for_many_lines() {
        let lines = [
            ("A:u1:vpn:tun0", true),
            ("B:u2:vpn:", false),
            (r"C\:D:u3:802-11-wireless:wlan0", true),
            (r"E\:F\:G:u4:802-3-ethernet:", false),
            ("H:u5:wireguard:--", false),
        ];
        for (line, expected) in lines {
            let record = parse_connection(line).unwrap();
            assert_eq!(record.connected(), expected, "line {line}");
            assert_eq!(record.connected(), !record.device().is_empty());
        }
    }

    #[test]
    fn test_missing_fields_is_error() {
        let err = parse_connection("only:three:fields").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingFields {
                found: 3,
                line: "only:three:fields".to_string()
            }
        );
    }

    #[test]
    fn test_listing_skips_malformed_lines() {
        let listing = "Home:u1:802-11-wireless:wlan0\ngarbage\n\nOffice:u2:vpn:\n";
        let records = parse_connection_listing(listing);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "Home");
        assert_eq!(records[1].name(), "Office");
    }

    #[test]
    fn test_find_active_first_uplink_wins() {
        let records = parse_connection_listing(
            "Office:u0:vpn:tun0\nCable:u1:802-3-ethernet:eth0\nHome:u2:802-11-wireless:wlan0\n",
        );
        let active = find_active_connection(&records).unwrap();
        assert_eq!(active.name(), "Cable");
    }

    #[test]
    fn test_find_active_none() {
        let records = parse_connection_listing("Office:u0:vpn:tun0\nlo:u1:loopback:lo\n");
        assert!(find_active_connection(&records).is_none());
        assert!(find_active_connection(&[]).is_none());
    }

    #[test]
    fn test_ipv6_method_disabled() {
        let dump = "connection.id:                          Home\n\
                    ipv6.method:                            disabled\n\
                    ipv6.dns:                               --\n";
        assert!(ipv6_method_disabled(dump));

        let dump = "ipv6.method:                            auto\n";
        assert!(!ipv6_method_disabled(dump));

        assert!(!ipv6_method_disabled(""));
    }
}
