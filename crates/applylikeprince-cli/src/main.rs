//! applylikeprince - a terminal client for the ApplyLikePrince job application tracker.
//!
//! Every backend call goes through the authenticated `ApiClient`, so an
//! expired access token is refreshed and the request replayed without the
//! command noticing.

mod cli;
mod commands;
mod output;

use std::ffi::OsStr;
use std::io;
use std::path::Path;

use anyhow::Result;
use applylikeprince_core::{ApiClient, Config, SessionEvent};
use clap::Parser;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Initialize the tracing subscriber. Logs go to stderr unless a log file is configured.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // RUST_LOG controls the level (e.g. RUST_LOG=applylikeprince_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("applylikeprince.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

/// Report session changes that happened while the command ran.
fn report_session_events(events: &mut Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        debug!(?event, "Session event");
        if event == SessionEvent::LoginRequired {
            eprintln!("Session expired. Please log in again with `applylikeprince login`.");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }

    let _guard = init_tracing(config.log_file.as_deref());
    info!(api_url = %config.api_url, storage = ?config.storage, "applylikeprince starting");

    let storage = config.session_storage()?;
    let client = ApiClient::connect(&config, storage)?;
    let mut events = client.session().subscribe();

    let result = commands::run(cli.command, &client, &mut config).await;
    report_session_events(&mut events);
    result
}
