use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ARGENSTATS_BASE_URL: &str = "https://argenstats.com/api";
pub const DEFAULT_BCRA_BASE_URL: &str = "https://api.bcra.gob.ar/estadisticas/v3";
pub const DEFAULT_SERIES_BASE_URL: &str = "https://apis.datos.gob.ar/series/api";
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
pub const USER_AGENT: &str = "Dashboard-Argentina/2.0";

/// Process configuration, read once at startup and injected through `AppState`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub argenstats_base_url: String,
    pub argenstats_api_key: Option<String>,
    pub bcra_base_url: String,
    pub series_base_url: String,
    pub presupuesto_base_url: Option<String>,
    pub presupuesto_api_token: Option<String>,
    /// Deadline applied to every upstream call.
    pub upstream_timeout_ms: u64,
    /// Polling interval used by the dashboard page.
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            argenstats_base_url: base_url_var("ARGENSTATS_BASE_URL", DEFAULT_ARGENSTATS_BASE_URL)?,
            argenstats_api_key: optional_var("ARGENSTATS_API_KEY"),
            bcra_base_url: base_url_var("BCRA_BASE_URL", DEFAULT_BCRA_BASE_URL)?,
            series_base_url: base_url_var("SERIES_BASE_URL", DEFAULT_SERIES_BASE_URL)?,
            presupuesto_base_url: optional_var("PRESUPUESTO_BASE_URL")
                .map(|url| validate_base_url("PRESUPUESTO_BASE_URL", url))
                .transpose()?,
            presupuesto_api_token: optional_var("PRESUPUESTO_API_TOKEN"),
            upstream_timeout_ms: positive_var("UPSTREAM_TIMEOUT_MS", DEFAULT_UPSTREAM_TIMEOUT_MS)?,
            refresh_interval_secs: positive_var(
                "REFRESH_INTERVAL_SECS",
                DEFAULT_REFRESH_INTERVAL_SECS,
            )?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("ArgenStats Base URL: {}", config.argenstats_base_url);
        tracing::debug!("BCRA Base URL: {}", config.bcra_base_url);
        tracing::debug!("Series Base URL: {}", config.series_base_url);
        match config.presupuesto_base_url {
            Some(ref url) => tracing::info!("Presupuesto API configured: {}", url),
            None => tracing::warn!("PRESUPUESTO_BASE_URL not set, budget routes serve fallback data"),
        }
        if config.argenstats_api_key.is_some() {
            tracing::info!("🔑 ArgenStats API key configured");
        } else {
            tracing::warn!("⚠️ No ArgenStats API key found, some endpoints may fail");
        }
        tracing::debug!("Upstream timeout: {}ms", config.upstream_timeout_ms);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    match optional_var(name) {
        Some(url) => validate_base_url(name, url),
        None => Ok(default.to_string()),
    }
}

fn validate_base_url(name: &str, url: String) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn positive_var(name: &str, default: u64) -> anyhow::Result<u64> {
    let Some(raw) = optional_var(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => anyhow::bail!("{} must be a positive integer, got '{}'", name, raw),
    }
}
