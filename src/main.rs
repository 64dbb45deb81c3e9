use clap::Parser;
use home_metrics::app::{self, Options};
use home_metrics::config::{LogFormat, LoggingConfig};
use std::panic::{self, PanicHookInfo};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = config.level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("home_metrics={level}").parse()?)
        .add_directive(format!("bluer={}", Level::WARN).parse()?);

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    let config = match options.load_config() {
        Ok(config) => config,
        Err(why) => {
            eprintln!("error: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    };

    if let Err(why) = init_logging(&config.logging) {
        eprintln!("error: invalid logging configuration: {}", why);
        std::process::exit(EXIT_ERROR);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting home-metrics");

    match app::run(config).await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            error!(error = %why, "Fatal error");
            std::process::exit(EXIT_ERROR);
        }
    }
}
