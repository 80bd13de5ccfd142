//! Probes every upstream endpoint once and prints a status table, the same
//! checks served by `/api/argenstats/debug`.

use rust_argentina_dashboard::{config::Config, handlers::{self, AppState}};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_argentina_dashboard=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(config)?;
    let report = handlers::debug_report(&state).await;

    println!("Upstream probe at {}", report.timestamp.to_rfc3339());
    for test in &report.tests {
        let status = test
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "---".to_string());
        let mark = if test.success { "✓" } else { "✗" };
        println!(
            "{} {:<18} {:>4} {:>6}ms  {}",
            mark, test.name, status, test.timing, test.url
        );
        if let Some(ref error) = test.error {
            println!("    error: {}", error);
        }
        if let Some(ref parse_error) = test.parse_error {
            println!("    parse error: {}", parse_error);
        }
    }
    println!(
        "{} of {} upstreams reachable (avg {:.0}ms, api key {})",
        report.summary.successful,
        report.summary.total,
        report.summary.avg_response_time,
        if report.summary.api_key_available { "set" } else { "not set" }
    );

    if report.summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
