// File: azuria-core/src/logging.rs

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::Error;

/// Where and how much to log. `RUST_LOG` is honoured on top of `directive`.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub directive: String,
    /// Optional JSON log file, in addition to the console.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directive: "azuria=info".to_string(),
            file: None,
        }
    }
}

/// Installs the global subscriber. Keep the returned guard alive for as long as
/// the file sink should keep flushing.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>, Error> {
    let directive: Directive = settings
        .directive
        .parse()
        .map_err(|e| Error::Parse(format!("log directive '{}': {e}", settings.directive)))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let (file_layer, guard) = match settings.file.as_deref() {
        Some(path) => {
            let (dir, name) = split_log_path(path);
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Platform(format!("Failed to set global subscriber: {e}")))?;

    Ok(guard)
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("combined.log"));
    (dir, name)
}
