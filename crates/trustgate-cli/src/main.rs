//! trustgate - command-line front end for the trust service.
//!
//! Stands in for the web UI: every command goes through the same
//! session-aware client, so expired sessions are refreshed and retried
//! transparently.

mod commands;
mod credentials;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trustgate_core::{ApiClient, ClientConfig, Navigator};

use commands::Command;

/// Directory for an optional rolling log file
const LOG_DIR_ENV: &str = "TRUSTGATE_LOG_DIR";

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "trustgate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// There is no page to navigate to; tell the user what the UI would do.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        eprintln!("Session ended. Run `trustgate login` to continue ({}).", path);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, commands::USAGE);
            std::process::exit(2);
        }
    };

    let log_guard = init_tracing();

    let mut config = ClientConfig::load()?;
    let client = ApiClient::with_navigator(&config, Arc::new(TerminalNavigator))?;
    info!(base_url = %config.base_url, "trustgate starting");

    let result = commands::run(command, &client, &mut config).await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        // Flush the log file before exiting
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
