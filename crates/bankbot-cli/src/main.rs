//! bankbot - a terminal client for the conversational banking portal.
//!
//! Signs in, lists the portal's service schemas, and runs a chat against
//! the chosen one. Session handling (credential refresh, expired-session
//! prompt, sign-in redirects) lives in `bankbot-core`.

mod app;
mod terminal;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bankbot_core::{ClientContext, Config};

use app::App;
use terminal::{TerminalNotifier, TerminalPrompt};

/// Log file name in the cache directory
const LOG_FILE: &str = "bankbot.log";

/// Initialize the tracing subscriber, writing to a log file so log lines
/// never interleave with the chat.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load config")?;
    let cache_dir = config.cache_dir()?;
    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;
    let _log_guard = init_tracing(&cache_dir);
    info!("bankbot starting");

    let ctx = ClientContext::from_config(
        &config,
        Arc::new(TerminalPrompt::new()),
        Arc::new(TerminalNotifier),
    )?;

    let mut app = App::new(ctx);
    let result = app.run().await;
    if let Err(ref e) = result {
        eprintln!("Error: {:#}", e);
    }

    info!("bankbot shutting down");
    result
}
