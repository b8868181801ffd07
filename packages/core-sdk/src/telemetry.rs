use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/**
 * \brief Install the global tracing subscriber.
 *
 * `RUST_LOG` wins over `verbose`. When `DOCWRIGHT_LOG_FILE` is set, log lines
 * are appended to that file instead of stderr.
 */
pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file_path() {
        Some(path) => {
            let file = open_log_file(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("install tracing subscriber: {}", e))
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("install tracing subscriber: {}", e)),
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "docwright_core_sdk=debug,docwright=debug,info"
    } else {
        "info"
    }
}

fn log_file_path() -> Option<PathBuf> {
    std::env::var("DOCWRIGHT_LOG_FILE")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}
