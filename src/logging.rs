use std::fs;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all(LOG_DIR);

    // Daily-rotated JSON file next to the console output
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, "feedprep.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "feedprep=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    // A second call (tests, embedding binaries) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // The guard must outlive the program so buffered lines are flushed
    std::mem::forget(guard);
}
