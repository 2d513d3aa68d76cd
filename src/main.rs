//! vMix Remote - console shell
//!
//! Control a vMix mixer over its HTTP API from the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use crate::cli::{parse_command, render_event, Shell};
use vmix_remote::config::{AppConfig, ConfigWatcher};
use vmix_remote::mixer::HttpTransport;
use vmix_remote::paths::AppPaths;
use vmix_remote::sync::{EngineEvent, SyncEngine};
use vmix_remote::Dispatcher;

/// vMix Remote - control vMix from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "VMIX_REMOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the mixer address from the config (host or host:port)
    #[arg(long)]
    mixer: Option<String>,

    /// Do not connect on startup
    #[arg(long)]
    no_connect: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let paths = AppPaths::detect(args.config.as_deref());
    paths.ensure_directories()?;

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(&args.log_level, &paths)?;

    info!("Starting vMix Remote v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());

    let mut config = AppConfig::load_or_create(&paths.config).await?;
    if let Some(address) = &args.mixer {
        let (host, port) = cli::parse_address(address).map_err(anyhow::Error::msg)?;
        config.mixer.host = host;
        if let Some(port) = port {
            config.mixer.port = port;
        }
        config.validate().context("Invalid --mixer address")?;
    }

    let config_watcher = match ConfigWatcher::new(paths.config.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("Config hot-reload disabled: {:#}", e);
            None
        },
    };

    let transport = Arc::new(HttpTransport::new());
    let engine = Arc::new(SyncEngine::new(transport, config.engine_settings()));
    let dispatcher = Dispatcher::new(Arc::clone(&engine));

    run_app(dispatcher, config, config_watcher, args.no_connect, shutdown_signal()).await?;

    info!("vMix Remote shutdown complete");
    Ok(())
}

async fn run_app(
    dispatcher: Dispatcher,
    mut config: AppConfig,
    mut config_watcher: Option<ConfigWatcher>,
    no_connect: bool,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let engine = Arc::clone(dispatcher.engine());
    let mut shell = Shell::new(dispatcher, config.endpoint());

    // Engine callbacks run on engine tasks; hand events to the main loop
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<EngineEvent>();
    engine.subscribe(Arc::new(move |event: EngineEvent| {
        let _ = event_tx.send(event);
    }));

    if config.sync.auto_connect && !no_connect {
        let (host, port) = config.endpoint();
        if let Err(e) = engine.connect(&host, port).await {
            warn!("Auto-connect to {}:{} failed: {}", host, port, e.status_message());
        }
    }

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    cli::spawn_repl(line_tx)?;

    let mut health_check = tokio::time::interval(Duration::from_millis(config.sync.poll_interval_ms));
    health_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else {
                    debug!("Console closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if !shell.execute(command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => println!("{}", message),
                }
            }

            Some(event) = event_rx.recv() => {
                if let Some(line) = render_event(&event, &engine.state()) {
                    println!("{}", line);
                }
            }

            Some(new_config) = next_config(&mut config_watcher) => {
                info!("📝 Configuration file changed, reloading...");
                let endpoint_changed = new_config.endpoint() != config.endpoint()
                    || new_config.engine_settings() != config.engine_settings();
                engine.update_settings(new_config.engine_settings());
                shell.set_default_endpoint(new_config.endpoint());

                if endpoint_changed && engine.is_connected() {
                    let (host, port) = new_config.endpoint();
                    info!("Mixer settings changed, reconnecting to {}:{}", host, port);
                    if let Err(e) = engine.connect(&host, port).await {
                        warn!("Reconnect after config change failed: {}", e.status_message());
                    }
                }
                config = new_config;
            }

            _ = health_check.tick() => {
                check_health(&engine, config.sync.reconnect_after_failures).await;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    engine.disconnect();
    Ok(())
}

async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

/// Reconnect once the poll loop has failed `threshold` times in a row (0 = never)
async fn check_health(engine: &SyncEngine, threshold: u32) {
    if threshold == 0 || !engine.is_connected() {
        return;
    }
    let failures = engine.health().consecutive_failures;
    if failures >= threshold {
        warn!("{} consecutive failed polls, reconnecting", failures);
        if let Err(e) = engine.reconnect().await {
            warn!("Reconnect failed: {}", e.status_message());
        }
    }
}

fn init_logging(
    level: &str,
    paths: &AppPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, "vmix-remote.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
