//! durq - Durable FIFO job queue
//!
//! Command line front end for a SQLite-backed durq queue.

mod cli;
mod cmd_queue;

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use durq_config::{Config, ConfigLoader, ConfigValidator, LogConfig};

use cli::Cli;
use cmd_queue::handle_queue_command;

/// Initialize tracing with console output and, when configured, a log file.
///
/// Log files rotate daily under `log.dir`. `RUST_LOG` overrides `log.level`.
fn init_tracing(log: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log.level));

    let file_layer = match &log.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("durq")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Flushes pending lines on drop, so it lives as long as the process.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    // Stdout carries command output, logs go to stderr.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Load the config file and apply command line overrides.
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load_or_default(&cli.config)?;
    if let Some(db) = &cli.db {
        config.queue.location = if db.is_empty() {
            String::new()
        } else {
            ConfigLoader::expand_path(db)
        };
    }
    if let Some(batch_size) = cli.batch_size {
        config.queue.batch_size = batch_size;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.log)?;

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!("{}: {}", err.path, err.message);
        }
        return Err("invalid configuration".into());
    }

    handle_queue_command(cli.command, &config.queue).await
}
