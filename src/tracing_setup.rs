use crate::error::Error;
use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING_INITIALIZED: Once = Once::new();

/// Initializes global tracing with a single non-blocking file appender.
///
/// Returns the full path to the log file on success.
pub fn init_tracing(log_file_path: &str, log_level: &str) -> Result<String, Error> {
    let log_path = Path::new(log_file_path);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("invalid log level '{log_level}', defaulting to 'info'");
            tracing::Level::INFO
        }
    };

    let log_file_path_owned = log_file_path.to_string();

    TRACING_INITIALIZED.call_once(|| {
        let file_appender = match std::fs::File::create(&log_file_path_owned) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("failed to create log file {log_file_path_owned}: {e}");
                return;
            }
        };
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(non_blocking_appender)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false),
            )
            .with(
                EnvFilter::builder()
                    .with_default_directive(level.into())
                    .from_env_lossy(),
            );

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("failed to set tracing subscriber: {e}");
        } else {
            tracing::info!(log_file = %log_file_path_owned, "tracing initialized");
        }

        std::panic::set_hook(Box::new(|panic_info| {
            let payload = panic_info.payload();
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };

            let location = panic_info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown location".to_string());

            tracing::error!(panic.message = %message, panic.location = %location, "panic");
        }));

        // the non-blocking worker thread outlives this function; leaking the
        // guard keeps it flushing for the process lifetime
        std::mem::forget(guard);
    });

    Ok(log_file_path.to_string())
}
