// scorecast entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries command output)
// 2. Parse arguments
// 3. Load config
// 4. Build the API client, stores and preference database
// 5. Run the command

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use scorecast_cli::{App, Cli};
use scorecast_core::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    info!("scorecast starting: {:?}", cli.command);

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: api={}, poll every {}s",
        config.api.base_url, config.poll.interval_secs
    );

    let app = App::new(config, &cli)?;
    let result = app.run(cli.command).await;
    if let Err(err) = &result {
        error!("command failed: {err:#}");
    }
    result
}

/// Initialize tracing to log to a file so log lines never mix with output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::options()
        .create(true)
        .append(true)
        .open(log_dir.join("scorecast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("scorecast=info,scorecast_cli=info,scorecast_core=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
