//! CLI command handlers.
//!
//! Each subcommand maps onto one engine or controller operation and prints
//! either a short human form or, with `--json`, the serialized result.

use std::io::Write;

use color_eyre::eyre::{bail, Result};
use serde::Serialize;
use serde_json::json;

use super::args::{Commands, VpnAction};
use crate::constants;
use crate::core::command::{CommandRunner, ToolOutput};
use crate::core::controller::ConnectionController;
use crate::state::{ConnectionRecord, LookupResult};

fn emit<T: Serialize>(
    out: &mut impl Write,
    json: bool,
    value: &T,
    human: impl FnOnce() -> String,
) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", human())?;
    }
    Ok(())
}

fn yes_no(value: bool, yes: &str, no: &str) -> String {
    (if value { yes } else { no }).to_string()
}

fn connection_table(records: &[ConnectionRecord]) -> String {
    if records.is_empty() {
        return constants::MSG_NO_CONNECTIONS.to_string();
    }
    let width = records
        .iter()
        .map(|r| r.name().chars().count())
        .max()
        .unwrap_or(0)
        .max(4);
    let mut lines = vec![format!("{:<width$}  {:<36}  {:<18}  DEVICE", "NAME", "UUID", "TYPE")];
    lines.extend(records.iter().map(|r| {
        let device = if r.connected() { r.device() } else { "--" };
        format!("{:<width$}  {:<36}  {:<18}  {device}", r.name(), r.uuid(), r.type_name())
    }));
    lines.join("\n")
}

fn lookup(out: &mut impl Write, json: bool, result: &LookupResult) -> Result<()> {
    emit(out, json, result, || result.data.clone())
}

fn tool_output(out: &mut impl Write, json: bool, output: &ToolOutput) -> Result<()> {
    let value = json!({
        "stdout": output.stdout,
        "stderr": output.stderr,
        "code": output.code,
    });
    emit(out, json, &value, || {
        [output.stdout.trim_end(), output.stderr.trim_end()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Run one subcommand, writing its result to `out`.
///
/// # Errors
///
/// Returns an error if a connection change fails or the output cannot be
/// written. Diagnostic reads never fail.
pub fn execute<R: CommandRunner>(
    command: &Commands,
    controller: &ConnectionController<R>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let engine = controller.engine();
    match command {
        Commands::Connections => {
            let records = engine.list_connections()?;
            emit(out, json, &records, || connection_table(&records))
        }
        Commands::Up { uuid } => tool_output(out, json, &controller.activate(uuid)?),
        Commands::Down { uuid } => tool_output(out, json, &controller.deactivate(uuid)?),
        Commands::Active => {
            let active = engine.active_connection();
            emit(out, json, &active, || match &active {
                Some(a) => format!(
                    "{} ({}, {}) IPv6 {}",
                    a.connection.name(),
                    a.connection.kind(),
                    a.connection.device(),
                    yes_no(a.ipv6_disabled, "disabled", "enabled")
                ),
                None => constants::MSG_NO_ACTIVE.to_string(),
            })
        }
        Commands::Ipv6 { action, uuid } => {
            let enabled = action.enabled();
            match uuid {
                Some(uuid) => controller.set_ipv6(uuid, enabled)?,
                None => {
                    if !controller.set_active_ipv6(enabled)? {
                        bail!(constants::MSG_NO_ACTIVE);
                    }
                }
            }
            emit(out, json, &json!({ "ipv6_enabled": enabled }), || {
                format!("IPv6 {}", yes_no(enabled, "enabled", "disabled"))
            })
        }
        Commands::Vpn { action } => {
            match action {
                VpnAction::Enable => controller.set_vpn_enabled(true)?,
                VpnAction::Disable => controller.set_vpn_enabled(false)?,
                VpnAction::Status => {}
            }
            let enabled = controller.is_vpn_enabled();
            let installed = engine.is_openvpn_package_installed();
            let value = json!({ "enabled": enabled, "package_installed": installed });
            emit(out, json, &value, || {
                format!(
                    "OpenVPN support {} (package {})",
                    yes_no(enabled, "enabled", "disabled"),
                    yes_no(installed, "installed", "not installed")
                )
            })
        }
        Commands::Interface => lookup(out, json, &engine.priority_interface_name()),
        Commands::LanIp => lookup(out, json, &engine.priority_lan_ip()),
        Commands::NetworkInfo => {
            let info = engine.get_prioritized_network_info();
            emit(out, json, &info, || {
                format!(
                    "{}\n{}: {}",
                    info.data,
                    constants::LABEL_GATEWAY,
                    yes_no(info.gateway_reachable, "reachable", "unreachable")
                )
            })
        }
        Commands::Internet => {
            let reachable = engine.is_internet_reachable();
            emit(out, json, &reachable, || yes_no(reachable, "reachable", "unreachable"))
        }
        Commands::Gateway => {
            let reachable = engine.is_gateway_reachable();
            emit(out, json, &reachable, || yes_no(reachable, "reachable", "unreachable"))
        }
        Commands::OpenvpnInstalled => {
            let installed = engine.is_openvpn_package_installed();
            emit(out, json, &installed, || yes_no(installed, "installed", "not installed"))
        }
        Commands::Startup => {
            controller.startup()?;
            Ok(())
        }
        Commands::Unload => {
            controller.unload()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::cli::args::Switch;
    use crate::core::command::{Invocation, MockCommandRunner};
    use crate::core::engine::{DiagnosticEngine, EngineOptions};
    use crate::core::settings::MockSettingsStore;

    fn controller(runner: MockCommandRunner) -> ConnectionController<MockCommandRunner> {
        let mut settings = MockSettingsStore::new();
        settings.expect_get_bool().returning(|_, default| default);
        let engine = Arc::new(DiagnosticEngine::new(runner, EngineOptions::default()));
        ConnectionController::new(engine, Arc::new(settings), Path::new("/nonexistent"))
    }

    fn run(command: &Commands, runner: MockCommandRunner, json: bool) -> Result<String> {
        let mut out = Vec::new();
        execute(command, &controller(runner), json, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn listing_runner(listing: &'static str) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("nmcli", &["-t", "-f", "NAME,UUID,TYPE,DEVICE"]))
            .returning(move |_| Ok(ToolOutput::from_stdout(listing)));
        runner
    }

    #[test]
    fn test_connections_table() {
        let text = run(
            &Commands::Connections,
            listing_runner("Home:u-1:802-11-wireless:wlan0\nOffice:u-2:vpn:\n"),
            false,
        )
        .unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("Home"));
        assert!(lines[1].ends_with("wlan0"));
        assert!(lines[2].ends_with("--"));
    }

    #[test]
    fn test_connections_json() {
        let text = run(&Commands::Connections, listing_runner("Office:u-2:vpn:\n"), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["name"], "Office");
        assert_eq!(value[0]["connected"], false);
    }

    #[test]
    fn test_empty_listing() {
        let text = run(&Commands::Connections, listing_runner(""), false).unwrap();
        assert_eq!(text.trim(), constants::MSG_NO_CONNECTIONS);
    }

    #[test]
    fn test_active_none() {
        let text = run(&Commands::Active, listing_runner("Office:u-2:vpn:tun0\n"), true).unwrap();
        assert_eq!(text.trim(), "null");
    }

    #[test]
    fn test_ipv6_without_active_connection_fails() {
        let command = Commands::Ipv6 {
            action: Switch::Enable,
            uuid: None,
        };
        let err = run(&command, listing_runner(""), false).unwrap_err();
        assert_eq!(err.to_string(), constants::MSG_NO_ACTIVE);
    }

    #[test]
    fn test_up_prints_raw_output() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("nmcli", &["connection", "up", "u-2"]))
            .times(1)
            .returning(|_| Ok(ToolOutput::from_stderr("Error: Connection activation failed.", 4)));
        let command = Commands::Up {
            uuid: "u-2".to_string(),
        };
        let text = run(&command, runner, false).unwrap();
        assert_eq!(text.trim(), "Error: Connection activation failed.");
    }

    #[test]
    fn test_interface_not_found() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv: &Invocation| inv.matches("getent", &[]))
            .returning(|_| Ok(ToolOutput::from_stderr("no such host", 2)));
        let text = run(&Commands::Interface, runner, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["data"], constants::NOT_AVAILABLE);
    }
}
