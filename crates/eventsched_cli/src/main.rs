//! Event scheduler process entry point.
//!
//! # Responsibility
//! - Load configuration, start logging, open the configured snapshot store.
//! - Run the reminder scanner for the lifetime of the process.
//! - Serve line-delimited JSON requests from stdin, one response line each.
//!
//! Usage: `eventsched [serve]` or `eventsched version`.

use eventsched_api::{ApiRequest, ApiResponse, EventApi};
use eventsched_core::{
    core_version, init_logging, AppConfig, EventStore, LogNotifier, ReminderScanner,
};
use log::{error, info};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_LOG_DIR_NAME: &str = "logs";
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let command = std::env::args().nth(1);
    match command.as_deref() {
        None | Some("serve") => match serve() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("eventsched: {err}");
                ExitCode::FAILURE
            }
        },
        Some("version") => {
            println!("eventsched version={}", core_version());
            ExitCode::SUCCESS
        }
        Some(other) => {
            eprintln!("eventsched: unknown command `{other}`; expected serve|version");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn serve() -> Result<(), String> {
    let config = AppConfig::from_env()?;
    let log_dir = resolve_log_dir(config.log_dir.as_ref())?;
    init_logging(&config.log_level, &log_dir.to_string_lossy())?;

    let snapshots = config
        .open_snapshot_store()
        .map_err(|err| format!("failed to open `{}`: {err}", config.data_path.display()))?;
    let store = Arc::new(EventStore::open_with_system_clock(snapshots));
    info!(
        "event=app_start module=cli status=ok version={} backend={:?} events={}",
        core_version(),
        config.backend,
        store.len()
    );

    let scanner = ReminderScanner::new(
        Arc::clone(&store),
        Arc::new(LogNotifier),
        config.scanner_settings(),
    )
    .spawn()
    .map_err(|err| format!("failed to start reminder scanner: {err}"))?;

    let api = EventApi::new(store);
    let served = serve_lines(&api, io::stdin().lock(), io::stdout().lock());

    scanner.stop();
    match &served {
        Ok(count) => info!("event=app_stop module=cli status=ok requests={count}"),
        Err(err) => error!("event=app_stop module=cli status=error error={err}"),
    }
    served.map(|_| ())
}

/// Answers each non-blank input line; returns how many requests were served.
fn serve_lines(api: &EventApi, input: impl BufRead, mut output: impl Write) -> Result<usize, String> {
    let mut served = 0;
    for line in input.lines() {
        let line = line.map_err(|err| format!("failed to read request: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ApiRequest>(&line) {
            Ok(request) => api.handle(&request),
            Err(err) => ApiResponse::error(400, format!("Invalid request: {err}")),
        };
        let encoded = serde_json::to_string(&response)
            .map_err(|err| format!("failed to encode response: {err}"))?;
        writeln!(output, "{encoded}").map_err(|err| format!("failed to write response: {err}"))?;
        output
            .flush()
            .map_err(|err| format!("failed to write response: {err}"))?;
        served += 1;
    }
    Ok(served)
}

fn resolve_log_dir(configured: Option<&PathBuf>) -> Result<PathBuf, String> {
    let cwd = std::env::current_dir()
        .map_err(|err| format!("failed to resolve working directory: {err}"))?;
    Ok(match configured {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => cwd.join(dir),
        None => cwd.join(DEFAULT_LOG_DIR_NAME),
    })
}
