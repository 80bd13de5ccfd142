//! Runs one aggregation cycle against the configured upstreams and prints the
//! dashboard JSON to stdout.

use rust_argentina_dashboard::{config::Config, handlers::AppState};

/// Main entry point for the snapshot utility.
///
/// Logs go to stderr so stdout stays valid JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_argentina_dashboard=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(config)?;

    let response = state.aggregator.dashboard().await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    eprintln!(
        "{}: {} real, {} fallback",
        response.metadata.source, response.metadata.successful_apis, response.metadata.failed_apis
    );
    Ok(())
}
