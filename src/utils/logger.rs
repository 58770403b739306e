use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks between `info` and
/// `warn`. Output goes to stderr so it never interleaves with chat text.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .try_init();
}

/// Status line for the interactive loop (not a log record)
pub fn log_status(message: impl std::fmt::Display) {
    eprintln!("{}", message);
}
