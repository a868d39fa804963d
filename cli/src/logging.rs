use colored::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "warn";

/// Installs the tracing subscriber. `--verbose` wins over `RUST_LOG`, which wins over the
/// configured level.
pub fn init_tracing(verbose: bool, configured_level: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured_level.unwrap_or(DEFAULT_LEVEL)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Transient notification shown to the user
pub fn notify_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

pub fn notify_info(message: &str) {
    eprintln!("{} {}", "[INFO]".cyan(), message);
}
