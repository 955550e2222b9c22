//! Application entry point: text-pilot.
//!
//! # Startup sequence (`run`, the default)
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults are written out on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Start the correction service process, if one is configured.
//! 5. Spawn the key listener thread.
//! 6. Forward Ctrl+C as [`InputEvent::Shutdown`].
//! 7. Run the [`Orchestrator`] until shutdown, then stop the service.
//!
//! `correct <TEXT>` sends one sentence to the service and prints the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use text_pilot::{
    config::{AppConfig, AppPaths},
    keyboard::{Hotkey, InputEvent, KeyListener},
    pipeline::Orchestrator,
    rewrite::EnigoSink,
    service::{BackendProcess, CorrectionClient},
};

#[derive(Parser)]
#[command(name = "text-pilot", version, about = "Corrects sentences as you type them")]
struct Cli {
    /// Settings file to use instead of the per-user one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the keyboard and correct sentences in place (default)
    Run,
    /// Correct a single sentence and print the result
    Correct {
        /// Text to correct
        text: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let config = AppConfig::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config ({e}); using defaults");
                AppConfig::default()
            });
            // First run: write the defaults out so they can be edited.
            let settings_file = AppPaths::new().settings_file;
            if !settings_file.exists() {
                match config.save() {
                    Ok(()) => log::info!("Wrote default settings to {}", settings_file.display()),
                    Err(e) => log::warn!("Could not write default settings ({e})"),
                }
            }
            config
        }
    };

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => rt.block_on(run(config)),
        Command::Correct { text } => rt.block_on(correct_once(&config, &text.join(" "))),
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn run(config: AppConfig) -> Result<()> {
    log::info!("text-pilot starting up");

    // 4. Correction service
    let service = if config.service.launch_command.is_empty() {
        log::info!("service: using running instance at {}", config.service.base_url);
        None
    } else {
        match BackendProcess::spawn(&config.service.launch_command) {
            Ok(process) => Some(process),
            Err(e) => {
                log::error!("service: {e:#}; corrections will wait for an external instance");
                None
            }
        }
    };

    // 5. Key listener
    let toggle = match config.capture.toggle_hotkey.parse::<Hotkey>() {
        Ok(hotkey) => Some(hotkey),
        Err(e) => {
            log::warn!(
                "Invalid toggle hotkey '{}' ({e}); toggling disabled",
                config.capture.toggle_hotkey
            );
            None
        }
    };
    let (input_tx, input_rx) = mpsc::channel::<InputEvent>(256);
    let listener = KeyListener::start(input_tx.clone(), toggle);

    // 6. Ctrl+C
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = input_tx.send(InputEvent::Shutdown).await;
        }
    });

    // 7. Orchestrator
    let orchestrator = Orchestrator::from_config(&config, EnigoSink::factory());
    orchestrator.run(input_rx).await;

    listener.stop();
    if let Some(service) = service {
        service.stop().await?;
    }
    log::info!("text-pilot stopped");
    Ok(())
}

async fn correct_once(config: &AppConfig, text: &str) -> Result<()> {
    let client = CorrectionClient::from_config(&config.service);
    let corrected = client.correct_manual(text).await?;
    println!("{corrected}");
    Ok(())
}
