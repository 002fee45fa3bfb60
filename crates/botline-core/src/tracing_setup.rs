use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr by default, filtered by `RUST_LOG` (info if unset).
/// Setting `BOTLINE_LOG_FILE` appends plain-text logs to that file instead,
/// which keeps a terminal UI usable while still capturing diagnostics.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Ok(path) = std::env::var("BOTLINE_LOG_FILE") {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .expect("Failed to open log file");

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Arc::new(file))
            .with_ansi(false)
            .with_target(true)
            .init();
        eprintln!("File logging enabled: {}", path);
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
