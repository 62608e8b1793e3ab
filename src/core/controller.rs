//! Connection controller.
//!
//! Every operation here changes network state, so each one resets the
//! diagnostic cache first and they never run concurrently with each other.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::command::{CommandRunner, Invocation, SystemRunner, ToolOutput};
use super::engine::DiagnosticEngine;
use super::settings::SettingsStore;
use crate::constants;
use crate::error::ControllerError;

/// Check if we're running as root
#[cfg(unix)]
#[allow(unsafe_code)]
#[must_use]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_root() -> bool {
    false
}

fn warn_if_not_root(action: &str) {
    if !is_root() {
        warn!("{action}: {}", constants::ERR_NOT_ROOT);
    }
}

/// Mutating operations on connections and plugin settings.
pub struct ConnectionController<R: CommandRunner = SystemRunner> {
    engine: Arc<DiagnosticEngine<R>>,
    settings: Arc<dyn SettingsStore>,
    scripts_dir: PathBuf,
    mutation: Mutex<()>,
}

impl<R: CommandRunner> ConnectionController<R> {
    pub fn new(
        engine: Arc<DiagnosticEngine<R>>,
        settings: Arc<dyn SettingsStore>,
        scripts_dir: &Path,
    ) -> Self {
        Self {
            engine,
            settings,
            scripts_dir: scripts_dir.to_path_buf(),
            mutation: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<DiagnosticEngine<R>> {
        &self.engine
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Take the mutation lock and invalidate the cache.
    fn begin(&self) -> MutexGuard<'_, ()> {
        let guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.engine.reset_cache();
        guard
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ControllerError> {
        Ok(self.engine.runner().run(invocation)?)
    }

    /// Run a command that must exit cleanly.
    fn run_checked(&self, invocation: &Invocation) -> Result<ToolOutput, ControllerError> {
        let output = self.run(invocation)?;
        if output.success() {
            Ok(output)
        } else {
            Err(ControllerError::CommandFailed {
                command: invocation.to_string(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    fn connection_command(&self, verb: &str, uuid: &str) -> Result<ToolOutput, ControllerError> {
        let _guard = self.begin();
        info!("Connection {verb}: {uuid}");
        let timeout = self.engine.options().timeouts.command();
        let output = self.run(&Invocation::new(
            constants::TOOL_NMCLI,
            &["connection", verb, uuid],
            timeout,
        ))?;
        if output.has_error_output() {
            warn!("nmcli connection {verb} {uuid}: {}", output.stderr.trim());
        }
        Ok(output)
    }

    /// Bring a connection profile up. The raw `nmcli` output is returned
    /// as is, a refused activation is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Tool`] if `nmcli` cannot be run.
    pub fn activate(&self, uuid: &str) -> Result<ToolOutput, ControllerError> {
        self.connection_command("up", uuid)
    }

    /// Take a connection profile down.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Tool`] if `nmcli` cannot be run.
    pub fn deactivate(&self, uuid: &str) -> Result<ToolOutput, ControllerError> {
        self.connection_command("down", uuid)
    }

    fn apply_ipv6(&self, uuid: &str, enabled: bool) -> Result<(), ControllerError> {
        let timeouts = self.engine.options().timeouts;
        let method = if enabled {
            constants::IPV6_METHOD_AUTO
        } else {
            constants::IPV6_METHOD_DISABLED
        };
        warn_if_not_root("Changing IPv6 method");
        info!("Setting {} of {uuid} to {method}", constants::IPV6_METHOD_KEY);

        self.run_checked(&Invocation::new(
            constants::TOOL_NMCLI,
            &["connection", "modify", uuid, constants::IPV6_METHOD_KEY, method],
            timeouts.command(),
        ))?;
        self.run_checked(&Invocation::new(
            constants::TOOL_SYSTEMCTL,
            &["restart", constants::SERVICE_NETWORK_MANAGER],
            timeouts.restart(),
        ))?;
        Ok(())
    }

    /// Set the IPv6 method of `uuid` and restart NetworkManager.
    ///
    /// # Errors
    ///
    /// Fails if either command cannot be run or exits non-zero. The
    /// restart is skipped when the modify step fails.
    pub fn set_ipv6(&self, uuid: &str, enabled: bool) -> Result<(), ControllerError> {
        let _guard = self.begin();
        self.apply_ipv6(uuid, enabled)
    }

    /// [`Self::set_ipv6`] on the active wifi/ethernet connection.
    ///
    /// Returns `Ok(false)` when there is no active connection to change.
    ///
    /// # Errors
    ///
    /// As [`Self::set_ipv6`].
    pub fn set_active_ipv6(&self, enabled: bool) -> Result<bool, ControllerError> {
        let _guard = self.begin();
        let Some(active) = self.engine.ensure_active_connection() else {
            info!("No active connection, IPv6 left unchanged");
            return Ok(false);
        };
        let uuid = active.connection.uuid().to_string();
        // The lookup above repopulated the cache.
        self.engine.reset_cache();
        self.apply_ipv6(&uuid, enabled)?;
        Ok(true)
    }

    fn run_script(&self, script: &str) -> Result<(), ControllerError> {
        let path = self.scripts_dir.join(script);
        let path = path.to_string_lossy();
        let timeout = self.engine.options().timeouts.script();
        info!("Running {script} script in {}", self.scripts_dir.display());

        let output = self.run(
            &Invocation::new(constants::TOOL_BASH, &[&path], timeout).in_dir(&self.scripts_dir),
        )?;
        if output.success() {
            Ok(())
        } else {
            warn!("{script} script: {}", output.stderr.trim());
            Err(ControllerError::ScriptFailed {
                script: script.to_string(),
                code: output.code,
            })
        }
    }

    /// Persist the OpenVPN setting and run the install or uninstall script.
    ///
    /// # Errors
    ///
    /// Fails if the setting cannot be written or the script fails.
    pub fn set_vpn_enabled(&self, enabled: bool) -> Result<(), ControllerError> {
        let _guard = self.begin();
        warn_if_not_root("Changing OpenVPN support");
        self.settings
            .set_bool(constants::SETTING_OPENVPN_ENABLED, enabled)?;
        if enabled {
            self.run_script(constants::SCRIPT_INSTALL)
        } else {
            self.run_script(constants::SCRIPT_UNINSTALL)
        }
    }

    pub fn is_vpn_enabled(&self) -> bool {
        self.settings
            .get_bool(constants::SETTING_OPENVPN_ENABLED, false)
    }

    /// Host startup: start from an empty cache and reinstall OpenVPN support
    /// if it was enabled.
    ///
    /// # Errors
    ///
    /// Fails if the install script fails.
    pub fn startup(&self) -> Result<(), ControllerError> {
        let _guard = self.begin();
        if self.is_vpn_enabled() {
            self.run_script(constants::SCRIPT_INSTALL)?;
        }
        Ok(())
    }

    /// Host shutdown: remove OpenVPN support.
    ///
    /// # Errors
    ///
    /// Fails if the uninstall script fails.
    pub fn unload(&self) -> Result<(), ControllerError> {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_script(constants::SCRIPT_UNINSTALL)
    }
}
