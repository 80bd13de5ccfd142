use crate::config::Config;
use crate::errors::FetchError;
use crate::models::*;
use crate::normalize;
use crate::services::{build_url, send_json};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use url::Url;

/// Client for the ArgenStats indicators API.
///
/// One method per indicator; each performs a single GET and normalizes the
/// body onto the canonical snapshot. There are no retries: the aggregator
/// substitutes fallback data when a call fails.
#[derive(Clone)]
pub struct ArgenStatsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ArgenStatsClient {
    /// Creates a new `ArgenStatsClient`.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared pooled HTTP client.
    /// * `base_url` - Base URL of the API, without trailing slash.
    /// * `api_key` - Optional key sent as `x-api-key`.
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            config.argenstats_base_url.clone(),
            config.argenstats_api_key.clone(),
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
        build_url(&self.base_url, endpoint, params)
    }

    /// GET request with the API key attached when configured.
    pub fn request(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match self.api_key {
            Some(ref key) => request.header("x-api-key", key),
            None => request,
        }
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url(endpoint, params)?;
        tracing::debug!("🔗 Fetching: {}", url);
        send_json(self.request(url), "ArgenStats").await
    }

    /// Fetches and normalizes the latest snapshot of one indicator.
    pub async fn fetch(
        &self,
        indicator: Indicator,
        now: DateTime<Utc>,
    ) -> Result<IndicatorSnapshot, FetchError> {
        let latest = || ("view", "latest".to_string());
        let year = || ("year", now.format("%Y").to_string());

        let snapshot = match indicator {
            Indicator::Dollar => {
                let body = self.get_json("/dollar", &[("type", "latest".to_string())]).await?;
                IndicatorSnapshot::Dollar(normalize::exchange_rates(&body, now)?)
            }
            Indicator::Inflation => {
                let body = self.get_json("/ipc", &[latest()]).await?;
                IndicatorSnapshot::Inflation(normalize::inflation(&body, now)?)
            }
            Indicator::Emae => {
                let body = self.get_json("/emae", &[latest()]).await?;
                IndicatorSnapshot::Emae(normalize::emae(&body, now)?)
            }
            Indicator::RiesgoPais => {
                let body = self.get_json("/riesgo-pais", &[latest()]).await?;
                IndicatorSnapshot::RiesgoPais(normalize::riesgo_pais(&body, now)?)
            }
            Indicator::LaborMarket => {
                let body = self
                    .get_json("/labor-market", &[latest(), ("data_type", "national".to_string())])
                    .await?;
                IndicatorSnapshot::LaborMarket(normalize::labor_market(&body, now)?)
            }
            Indicator::Poverty => IndicatorSnapshot::Poverty(self.fetch_poverty(now).await?),
            Indicator::Calendar => {
                let body = self.get_json("/calendar", &[year()]).await?;
                IndicatorSnapshot::Calendar(normalize::calendar(&body)?)
            }
            Indicator::EmaeSectors => {
                let body = self.get_json("/emae/sectors", &[latest()]).await?;
                IndicatorSnapshot::EmaeSectors(normalize::emae_sectors(&body)?)
            }
        };

        Ok(snapshot)
    }

    /// `/poverty/latest`, falling back to `/poverty?view=latest` on older
    /// deployments.
    async fn fetch_poverty(&self, now: DateTime<Utc>) -> Result<PovertySnapshot, FetchError> {
        match self.get_json("/poverty/latest", &[]).await {
            Ok(body) => normalize::poverty(&body, now),
            Err(e) => {
                tracing::debug!("/poverty/latest failed ({}), trying /poverty?view=latest", e);
                let body = self
                    .get_json("/poverty", &[("view", "latest".to_string())])
                    .await?;
                normalize::poverty(&body, now)
            }
        }
    }

    /// Daily official and blue quotes for the `days` days ending on `today`.
    pub async fn fetch_dollar_history(
        &self,
        days: usize,
        today: NaiveDate,
    ) -> Result<Vec<DollarHistoryPoint>, FetchError> {
        let start = today - Duration::days(days.saturating_sub(1) as i64);
        let body = self
            .get_json(
                "/dollar",
                &[
                    ("type", "daily".to_string()),
                    ("start_date", start.format("%Y-%m-%d").to_string()),
                    ("end_date", today.format("%Y-%m-%d").to_string()),
                    ("dollar_type", "BLUE,OFICIAL".to_string()),
                ],
            )
            .await?;
        normalize::dollar_history(&body)
    }

    /// Monthly IPC variations for `year`, chronological.
    pub async fn fetch_inflation_history(&self, year: i32) -> Result<Vec<InflationHistoryPoint>, FetchError> {
        let body = self
            .get_json(
                "/ipc",
                &[("year", year.to_string()), ("view", "all".to_string())],
            )
            .await?;
        normalize::inflation_history(&body)
    }

    /// Last `months` monthly IPC variations, reaching into the previous year
    /// when the current one has fewer published months.
    pub async fn fetch_recent_inflation(
        &self,
        months: usize,
        year: i32,
    ) -> Result<Vec<InflationHistoryPoint>, FetchError> {
        let current = self.fetch_inflation_history(year).await;
        let mut points = match current {
            Ok(points) if points.len() >= months => points,
            Ok(points) => match self.fetch_inflation_history(year - 1).await {
                Ok(mut previous) => {
                    previous.extend(points);
                    previous
                }
                Err(_) => points,
            },
            Err(e) => {
                tracing::debug!("IPC {} unavailable ({}), trying {}", year, e, year - 1);
                self.fetch_inflation_history(year - 1).await?
            }
        };

        let skip = points.len().saturating_sub(months);
        points.drain(..skip);
        Ok(points)
    }
}

/// Endpoints probed by the debug report: (name, path, params).
pub const PROBE_ENDPOINTS: [(&str, &str, &[(&str, &str)]); 5] = [
    ("Dollar", "/dollar", &[("type", "latest")]),
    ("IPC", "/ipc", &[("view", "latest")]),
    ("EMAE", "/emae", &[("view", "latest")]),
    ("Riesgo País", "/riesgo-pais", &[("view", "latest")]),
    ("Labor Market", "/labor-market", &[("view", "latest")]),
];
