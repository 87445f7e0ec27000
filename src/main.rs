use anyhow::Result;
use clap::Parser;
use nada_schedule::cli::Cli;
use nada_schedule::config::Settings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(cli.verbose, settings.log_filter.as_deref());
    cli.run(settings).await
}

/// RUST_LOG wins, then the settings filter, then the verbosity default.
/// Logs go to stderr so stdout stays usable for CSV and JSON.
fn init_tracing(verbose: bool, configured: Option<&str>) {
    let fallback = match (configured, verbose) {
        (Some(filter), _) => filter.to_string(),
        (None, true) => "nada_schedule=debug".to_string(),
        (None, false) => "nada_schedule=info".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
