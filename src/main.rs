use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use tracing::{info, warn};

use tunneldeck::app::App;
use tunneldeck::cli::{args::Args, commands};
use tunneldeck::config::{self, AppConfig};
use tunneldeck::constants;
use tunneldeck::core::command::SystemRunner;
use tunneldeck::core::controller::{self, ConnectionController};
use tunneldeck::core::engine::{DiagnosticEngine, EngineOptions};
use tunneldeck::core::settings::{SettingsStore, TomlSettings};
use tunneldeck::core::worker::spawn_panel_worker;
use tunneldeck::event::{Event, EventHandler};
use tunneldeck::{logging, ui};

fn build_controller(config: &AppConfig, config_dir: &Path) -> ConnectionController {
    let engine = Arc::new(DiagnosticEngine::new(
        SystemRunner,
        EngineOptions::from_config(config),
    ));
    let settings: Arc<dyn SettingsStore> = Arc::new(TomlSettings::new(
        &config.settings_path(config_dir),
        &config.settings.namespace,
    ));
    ConnectionController::new(engine, settings, &config.scripts_dir(config_dir))
}

fn run_loop(terminal: &mut ratatui::DefaultTerminal, app: &mut App) -> Result<()> {
    let events = EventHandler::new(constants::DEFAULT_TICK_RATE);
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;
        match events.next()? {
            Event::Key(key) => app.handle_key(key),
            Event::Resize(width, height) => app.on_resize(width, height),
            Event::Tick => app.on_tick(),
        }
    }
    Ok(())
}

fn run_panel(controller: ConnectionController, config: &AppConfig) -> Result<()> {
    let (requests, updates) = spawn_panel_worker(
        Arc::new(controller),
        config.network.vpn_types.clone(),
        Duration::from_secs(config.panel.refresh_secs.max(1)),
    );
    let mut app = App::new().with_worker(requests, updates);

    let mut terminal = ratatui::init();
    let result = run_loop(&mut terminal, &mut app);
    ratatui::restore();

    app.shutdown();
    info!("Panel closed");
    result
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let config_dir = config::app_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join(constants::CONFIG_FILE_NAME));
    let config = AppConfig::load(&config_path)?;

    // The panel owns the terminal, so only one-shot commands may log to stderr.
    let sink = logging::init(&config.logging, args.command.is_some());
    info!(
        "{} v{} starting, config {}, logging to {sink:?}",
        constants::APP_NAME,
        constants::APP_VERSION,
        config_path.display()
    );
    if !controller::is_root() {
        warn!("{}", constants::ERR_NOT_ROOT);
    }

    let controller = build_controller(&config, &config_dir);
    match &args.command {
        Some(command) => commands::execute(command, &controller, args.json, &mut io::stdout().lock()),
        None => run_panel(controller, &config),
    }
}
