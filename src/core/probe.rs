//! Single-shot reachability probes via `ping`.

use std::time::Duration;

use tracing::debug;

use super::command::{CommandRunner, Invocation};
use crate::constants;
use crate::state::PingResult;

/// Build `ping -c 1 -W <wait> <address>`.
#[must_use]
pub fn probe_invocation(address: &str, wait_secs: u64, timeout: Duration) -> Invocation {
    let wait = wait_secs.to_string();
    Invocation::new(constants::TOOL_PING, &["-c", "1", "-W", &wait, address], timeout)
}

/// Average round-trip time from ping's summary line, e.g. `"2.0 ms"`.
///
/// Handles both `rtt min/avg/max/mdev = ...` (iputils) and
/// `round-trip min/avg/max = ...` (busybox).
#[must_use]
pub fn parse_rtt(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim_start).find(|line| {
        constants::RTT_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
    })?;
    let (_, values) = line.split_once('=')?;
    let avg = values.trim().split('/').nth(1)?.trim();
    if avg.is_empty() {
        return None;
    }
    Some(format!("{avg} ms"))
}

/// Send exactly one probe to `address`.
///
/// Success is decided by the error channel alone: some environments print
/// warnings or exit non-zero without the host being unreachable. Spawn
/// failures and timeouts count as unreachable.
pub fn probe(
    runner: &dyn CommandRunner,
    address: &str,
    wait_secs: u64,
    timeout: Duration,
) -> PingResult {
    let invocation = probe_invocation(address, wait_secs, timeout);
    match runner.run(&invocation) {
        Ok(output) if !output.has_error_output() => {
            let time = parse_rtt(&output.stdout);
            debug!("Pinging {address} finished: reachable ({time:?})");
            PingResult::reachable(address, time)
        }
        Ok(output) => {
            debug!("Pinging {address} finished: {}", output.stderr.trim());
            PingResult::unreachable(address)
        }
        Err(e) => {
            debug!("Pinging {address} failed: {e}");
            PingResult::unreachable(address)
        }
    }
}
