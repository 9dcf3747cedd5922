//! Tracing setup: console output, plus a log file under `/tmp/fleetup/`
//! with `--debug`.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;

use crate::settings::APP;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Install the global subscriber. `RUST_LOG` wins over `--debug`.
///
/// The returned guard flushes the log file on drop and must be held for
/// the life of the process.
pub fn init(debug: bool) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));

    let (file_layer, guard) = match debug.then(open_log_file).flatten() {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    guard
}

/// Best-effort: without a writable log directory only the console is used.
fn open_log_file() -> Option<File> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir).ok()?;
    File::create(dir.join(log_file_name(Local::now()))).ok()
}

fn log_dir() -> PathBuf {
    Path::new("/tmp").join(APP)
}

fn log_file_name(started: DateTime<Local>) -> String {
    format!("{}.log", started.format("%Y-%m-%d_%H-%M-%S"))
}
