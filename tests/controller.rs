use std::fs;
use std::path::Path;
use std::sync::Arc;

use mockall::*;
use tunneldeck::core::command::{CommandRunner, Invocation, SystemRunner, ToolOutput};
use tunneldeck::core::controller::ConnectionController;
use tunneldeck::core::engine::{DiagnosticEngine, EngineOptions};
use tunneldeck::core::settings::{SettingsStore, TomlSettings};
use tunneldeck::error::{ControllerError, ToolError};
use tunneldeck::state::DiagnosticCache;

mock! {
    pub Runner {}

    impl CommandRunner for Runner {
        fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
    }
}

fn controller_with<R: CommandRunner>(runner: R, root: &Path) -> ConnectionController<R> {
    let engine = Arc::new(DiagnosticEngine::new(runner, EngineOptions::default()));
    let settings: Arc<dyn SettingsStore> =
        Arc::new(TomlSettings::new(&root.join("settings.toml"), "tunneldeck"));
    ConnectionController::new(engine, settings, &root.join("extensions"))
}

fn write_script(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_every_mutation_resets_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = MockRunner::new();
    runner
        .expect_run()
        .withf(|inv| inv.matches("getent", &[]))
        .returning(|_| Ok(ToolOutput::from_stdout("23.45.67.89 STREAM steampowered.com\n")));
    runner
        .expect_run()
        .withf(|inv| !inv.matches("getent", &[]))
        .returning(|_| Ok(ToolOutput::from_stdout("")));
    let controller = controller_with(runner, dir.path());

    for name in ["activate", "deactivate", "set_ipv6", "enable vpn", "disable vpn"] {
        controller.engine().ensure_anchor_ip();
        assert_ne!(controller.engine().snapshot(), DiagnosticCache::default());
        match name {
            "activate" => {
                controller.activate("u-1").unwrap();
            }
            "deactivate" => {
                controller.deactivate("u-1").unwrap();
            }
            "set_ipv6" => controller.set_ipv6("u-1", false).unwrap(),
            "enable vpn" => controller.set_vpn_enabled(true).unwrap(),
            _ => controller.set_vpn_enabled(false).unwrap(),
        }
        assert_eq!(
            controller.engine().snapshot(),
            DiagnosticCache::default(),
            "{name} left stale state"
        );
    }
}

#[test]
fn test_vpn_setting_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = MockRunner::new();
    runner
        .expect_run()
        .withf(|inv| inv.matches("bash", &[]))
        .times(1)
        .returning(|_| Ok(ToolOutput::from_stdout("")));
    let controller = controller_with(runner, dir.path());
    assert!(!controller.is_vpn_enabled());
    controller.set_vpn_enabled(true).unwrap();

    let reopened = controller_with(MockRunner::new(), dir.path());
    assert!(reopened.is_vpn_enabled());

    let text = fs::read_to_string(dir.path().join("settings.toml")).unwrap();
    assert!(text.contains("[tunneldeck]"));
    assert!(text.contains("openvpn_enabled = true"));
}

#[test]
fn test_install_script_runs_in_scripts_dir() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = dir.path().join("extensions");
    write_script(&scripts, "install", "echo installed > marker\n");

    let controller = controller_with(SystemRunner, dir.path());
    controller.set_vpn_enabled(true).unwrap();

    let marker = fs::read_to_string(scripts.join("marker")).unwrap();
    assert_eq!(marker.trim(), "installed");
}

#[test]
fn test_failing_uninstall_script_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    write_script(&dir.path().join("extensions"), "uninstall", "echo nope >&2\nexit 3\n");

    let controller = controller_with(SystemRunner, dir.path());
    let err = controller.unload().unwrap_err();
    assert!(matches!(
        err,
        ControllerError::ScriptFailed { ref script, code: Some(3) } if script == "uninstall"
    ));
}

#[test]
fn test_startup_reinstalls_enabled_support() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = dir.path().join("extensions");
    write_script(&scripts, "install", "echo again >> marker\n");
    TomlSettings::new(&dir.path().join("settings.toml"), "tunneldeck")
        .set_bool("openvpn_enabled", true)
        .unwrap();

    let controller = controller_with(SystemRunner, dir.path());
    controller.startup().unwrap();
    controller.startup().unwrap();

    let marker = fs::read_to_string(scripts.join("marker")).unwrap();
    assert_eq!(marker.lines().count(), 2);
}

#[test]
fn test_missing_script_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(SystemRunner, dir.path());
    fs::create_dir_all(controller.scripts_dir()).unwrap();

    assert!(matches!(
        controller.unload(),
        Err(ControllerError::ScriptFailed { .. })
    ));
}
