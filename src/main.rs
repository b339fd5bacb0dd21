mod actions;
mod app;
mod azure;
mod config;
mod credentials;
mod event;
mod favorites;
mod resource;
mod shell;
mod tree;
mod ui;
mod worker;

/// Version injected at compile time via TAZ_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("TAZ_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use config::Config;
use crossterm::{
    event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use ui::splash::{render as render_splash, SplashState};

/// Terminal UI for Azure
#[derive(Parser, Debug)]
#[command(name = "taz", version, about, long_about = None)]
struct Args {
    /// Azure subscription id to use
    #[arg(short, long)]
    subscription: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long)]
    readonly: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return None;
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("Failed to open log file");

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("taz started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("taz").join("taz.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".taz").join("taz.log");
    }
    PathBuf::from("taz.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Initialize and run
    let result = initialize_with_splash(&mut terminal, &args).await;

    match result {
        Ok(Some(mut app)) => {
            let run_result = run_app(&mut terminal, &mut app);
            cleanup_terminal(&mut terminal)?;

            if let Err(err) = run_result {
                eprintln!("Error: {err:?}");
            }
        }
        Ok(None) => {
            cleanup_terminal(&mut terminal)?;
        }
        Err(err) => {
            cleanup_terminal(&mut terminal)?;
            eprintln!("Initialization error: {err:?}");
        }
    }

    Ok(())
}

fn cleanup_terminal<B: Backend + std::io::Write>(terminal: &mut Terminal<B>) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn initialize_with_splash<B: Backend>(
    terminal: &mut Terminal<B>,
    args: &Args,
) -> Result<Option<App>>
where
    B::Error: Send + Sync + 'static,
{
    let mut splash = SplashState::new();

    // Render initial splash
    terminal.draw(|f| render_splash(f, &splash))?;

    if check_abort()? {
        return Ok(None);
    }

    // Step 1: Load configuration
    let mut config = Config::load();
    let subscription = args
        .subscription
        .clone()
        .unwrap_or_else(|| config.effective_subscription());

    if subscription.is_empty() {
        splash.set_message("Error: No subscription configured");
        terminal.draw(|f| render_splash(f, &splash))?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        return Err(anyhow::anyhow!(
            "No Azure subscription configured. Set AZURE_SUBSCRIPTION_ID or use --subscription"
        ));
    }

    tracing::info!("Using subscription: {}", subscription);

    // Remember an explicitly selected subscription for the next launch
    if args.subscription.is_some() && config.subscription.as_deref() != Some(&subscription) {
        if let Err(e) = config.set_subscription(&subscription) {
            tracing::warn!("Failed to save subscription: {}", e);
        }
    }

    splash.set_message(&format!("Loading config [subscription: {}]", subscription));
    terminal.draw(|f| render_splash(f, &splash))?;
    splash.complete_step();

    if check_abort()? {
        return Ok(None);
    }

    // Step 2: Initialize Azure client (probes for a token)
    splash.set_message("Connecting to Azure");
    terminal.draw(|f| render_splash(f, &splash))?;

    let client = azure::client::AzureClient::new(&subscription).await?;
    splash.complete_step();

    if check_abort()? {
        return Ok(None);
    }

    // Step 3: Build the app state
    splash.set_message("Building explorer");
    terminal.draw(|f| render_splash(f, &splash))?;

    let mut app = App::new(
        Arc::new(client),
        config,
        Config::default_path(),
        subscription,
        args.readonly,
    )?;
    splash.complete_step();

    // Step 4: Kick off the initial resource group enumeration
    splash.set_message("Fetching resource groups");
    terminal.draw(|f| render_splash(f, &splash))?;

    app.load_initial();
    splash.complete_step();

    splash.set_message("Ready!");
    terminal.draw(|f| render_splash(f, &splash))?;

    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(Some(app))
}

fn check_abort() -> Result<bool> {
    if poll(Duration::from_millis(50))? {
        if let Event::Key(key) = read()? {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::handle_events(app)? {
            return Ok(());
        }

        // Apply results posted by background workers
        app.drain_events();
    }
}
