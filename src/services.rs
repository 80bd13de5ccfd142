use crate::config::{Config, USER_AGENT};
use crate::errors::{AppError, FetchError};
use crate::models::*;
use crate::normalize;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::{header, Client, RequestBuilder};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use url::Url;

/// Builds the pooled HTTP client shared by every upstream service.
///
/// No overall request timeout is set here: each call is raced against the
/// configured deadline by the caller, which drops the request on expiry.
pub fn http_client() -> Result<Client, AppError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| AppError::ExternalApiError(format!("Failed to create HTTP client: {}", e)))
}

/// Joins a base URL and a path, encoding `params` as the query string.
pub fn build_url(base_url: &str, path: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
    let raw = format!("{}{}", base_url, path);
    let parsed = if params.is_empty() {
        Url::parse(&raw)
    } else {
        Url::parse_with_params(&raw, params.iter().map(|(k, v)| (*k, v.as_str())))
    };
    parsed.map_err(|e| FetchError::Network(format!("Failed to build URL {}: {}", raw, e)))
}

/// Sends a GET and parses the body as JSON.
///
/// # Returns
///
/// * `Ok(Value)` on a 2xx response with a JSON body.
/// * `FetchError::Http` on non-2xx, `FetchError::Parse` on a non-JSON body,
///   `FetchError::Network` on transport failure.
pub async fn send_json(request: RequestBuilder, upstream: &str) -> Result<Value, FetchError> {
    let response = request
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(FetchError::from)?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::debug!("{} returned {}: {}", upstream, status, truncate(&error_text, 200));
        return Err(FetchError::Http {
            status: status.as_u16(),
            message: truncate(&error_text, 200),
        });
    }

    let text = response.text().await.map_err(FetchError::from)?;
    serde_json::from_str(&text)
        .map_err(|e| FetchError::Parse(format!("{} body is not JSON: {}", upstream, e)))
}

/// Probes one endpoint for the debug report. Never fails: every outcome is
/// described in the returned [`ProbeResult`].
pub async fn probe(
    name: &str,
    url: Url,
    request: RequestBuilder,
    deadline: Duration,
) -> ProbeResult {
    let started = Instant::now();
    let mut result = ProbeResult {
        name: name.to_string(),
        url: url.to_string(),
        status: None,
        success: false,
        timing: 0,
        response: None,
        response_text: None,
        error: None,
        parse_error: None,
    };

    let outcome = tokio::time::timeout(deadline, async {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    })
    .await;

    match outcome {
        Ok(Ok((status, text))) => {
            result.timing = started.elapsed().as_millis() as u64;
            result.status = Some(status.as_u16());
            result.success = status.is_success();
            result.response_text = Some(truncate(&text, 500));
            match serde_json::from_str::<Value>(&text) {
                Ok(json) => result.response = Some(json),
                Err(e) => result.parse_error = Some(e.to_string()),
            }
            if !result.success {
                result.error = Some(format!("HTTP {}", status.as_u16()));
            }
        }
        Ok(Err(e)) => result.error = Some(FetchError::from(e).to_string()),
        Err(_) => {
            result.error = Some(
                FetchError::Timeout {
                    after_ms: deadline.as_millis() as u64,
                }
                .to_string(),
            )
        }
    }

    result
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ============ BCRA Service ============

/// Client for the BCRA statistics API (v3).
#[derive(Clone)]
pub struct BcraService {
    client: Client,
    base_url: String,
}

impl BcraService {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(client, config.bcra_base_url.clone())
    }

    pub fn metadata_url(&self) -> Result<Url, FetchError> {
        build_url(&self.base_url, "/Metadatos", &[])
    }

    pub fn request(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    /// Fetches the variable catalogue.
    pub async fn fetch_metadata(&self) -> Result<Vec<BcraVariable>, FetchError> {
        let url = self.metadata_url()?;
        tracing::debug!("🏦 Fetching BCRA metadata: {}", url);
        let body = send_json(self.client.get(url), "BCRA").await?;

        let variables: Vec<BcraVariable> = normalize::records(&body)
            .into_iter()
            .filter_map(|record| serde_json::from_value(Value::Object(record.clone())).ok())
            .collect();
        if variables.is_empty() {
            return Err(FetchError::Parse("BCRA metadata has no variables".to_string()));
        }
        Ok(variables)
    }

    /// Fetches observations of one variable between two dates, chronological.
    pub async fn fetch_variable(
        &self,
        id_variable: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BcraDataPoint>, FetchError> {
        let path = format!(
            "/Datos/{}/{}/{}",
            id_variable,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        let url = build_url(&self.base_url, &path, &[])?;
        tracing::debug!("🏦 Fetching BCRA variable {}: {}", id_variable, url);
        let body = send_json(self.client.get(url), "BCRA").await?;

        let mut points: Vec<BcraDataPoint> = normalize::records(&body)
            .into_iter()
            .filter_map(|record| {
                Some(BcraDataPoint {
                    fecha: normalize::pick_string(record, &["fecha", "date"])?.to_string(),
                    valor: normalize::pick_number(record, &["valor", "value"])?,
                })
            })
            .collect();
        if points.is_empty() {
            return Err(FetchError::Parse(format!(
                "BCRA variable {} has no observations",
                id_variable
            )));
        }
        points.sort_by(|a, b| a.fecha.cmp(&b.fecha));
        Ok(points)
    }
}

static EXCHANGE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static USD_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static RATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Compiles `pattern` on first use.
fn cached_regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// First variable describing the USD exchange rate.
pub fn find_usd_variable(variables: &[BcraVariable]) -> Option<&BcraVariable> {
    let exchange = cached_regex(&EXCHANGE_PATTERN, r"(?i)tipo de cambio")?;
    let usd = cached_regex(&USD_PATTERN, r"(?i)\b(usd|d[oó]lar)")?;
    variables
        .iter()
        .find(|v| exchange.is_match(&v.descripcion) && usd.is_match(&v.descripcion))
}

/// First variable describing a policy or reference interest rate.
pub fn find_rate_variable(variables: &[BcraVariable]) -> Option<&BcraVariable> {
    let rate = cached_regex(&RATE_PATTERN, r"(?i)\b(tasa|leliq)")?;
    variables.iter().find(|v| rate.is_match(&v.descripcion))
}

// ============ Series de Tiempo Service ============

/// Candidate IPC series, tried in order until one answers with data.
pub const INFLATION_SERIES_IDS: [&str; 3] = [
    "148.3_INIVELNAL_DICI_M_26",
    "148.3_INIVELNAL_DICI_M_19",
    "103.1_I2N_2016_M_19",
];

/// Client for the datos.gob.ar time series API.
#[derive(Clone)]
pub struct SeriesService {
    client: Client,
    base_url: String,
}

impl SeriesService {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(client, config.series_base_url.clone())
    }

    pub fn series_url(&self, series_id: &str, last: usize) -> Result<Url, FetchError> {
        build_url(
            &self.base_url,
            "/series",
            &[
                ("ids", series_id.to_string()),
                ("last", last.to_string()),
                ("format", "json".to_string()),
            ],
        )
    }

    pub fn request(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    /// Fetches the last `last` observations of one series.
    pub async fn fetch_series(&self, series_id: &str, last: usize) -> Result<SeriesData, FetchError> {
        let url = self.series_url(series_id, last)?;
        tracing::debug!("📈 Fetching series {}: {}", series_id, url);
        let body = send_json(self.client.get(url), "Series de Tiempo").await?;
        parse_series(series_id, &body)
    }

    /// Tries each candidate id in order, returning the first series with data.
    pub async fn fetch_first_available(
        &self,
        series_ids: &[&str],
        last: usize,
    ) -> Result<SeriesData, FetchError> {
        let mut last_error = FetchError::Parse("no series ids to try".to_string());
        for series_id in series_ids {
            match self.fetch_series(series_id, last).await {
                Ok(series) => {
                    tracing::info!("✅ Series {} answered with {} points", series_id, series.values.len());
                    return Ok(series);
                }
                Err(e) => {
                    tracing::debug!("Series {} unavailable ({}): {}", series_id, e.kind(), e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Normalizes either `data: [[date, value], ...]` or
/// `data: [{values: [{date, value}, ...]}]`.
pub fn parse_series(series_id: &str, body: &Value) -> Result<SeriesData, FetchError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("series response has no data array".to_string()))?;

    let mut values: Vec<(String, f64)> = Vec::new();
    let mut title = None;

    for row in data {
        match row {
            Value::Array(pair) => {
                let date = pair.first().and_then(Value::as_str);
                let value = pair.get(1).and_then(Value::as_f64);
                if let (Some(date), Some(value)) = (date, value) {
                    values.push((date.to_string(), value));
                }
            }
            Value::Object(series) => {
                title = title.or_else(|| {
                    normalize::pick_string(series, &["series_title", "title"]).map(str::to_string)
                });
                let points = series.get("values").and_then(Value::as_array);
                for point in points.into_iter().flatten().filter_map(Value::as_object) {
                    let date = normalize::pick_string(point, &["date", "index"]);
                    let value = normalize::pick_number(point, &["value"]);
                    if let (Some(date), Some(value)) = (date, value) {
                        values.push((date.to_string(), value));
                    }
                }
            }
            _ => {}
        }
    }

    if values.is_empty() {
        return Err(FetchError::Parse(format!("series {} has no values", series_id)));
    }
    values.sort_by(|a, b| a.0.cmp(&b.0));

    if title.is_none() {
        title = body
            .get("meta")
            .and_then(Value::as_array)
            .and_then(|meta| meta.get(1))
            .and_then(|field| field.pointer("/field/description"))
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    Ok(SeriesData {
        series_id: series_id.to_string(),
        title,
        values,
    })
}

// ============ Presupuesto Service ============

/// Client for the national budget execution API. Optional: when no base URL
/// is configured every call fails and the budget routes serve fallback data.
#[derive(Clone)]
pub struct PresupuestoService {
    client: Client,
    base_url: Option<String>,
    api_token: Option<String>,
}

impl PresupuestoService {
    pub fn new(client: Client, base_url: Option<String>, api_token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            config.presupuesto_base_url.clone(),
            config.presupuesto_api_token.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Fetches budget execution for fiscal year `year`.
    pub async fn fetch_execution(&self, year: i32) -> Result<BudgetSnapshot, FetchError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| FetchError::Network("budget provider not configured".to_string()))?;
        let url = build_url(
            base_url,
            "/ejecucion",
            &[("ejercicio", year.to_string()), ("formato", "json".to_string())],
        )?;
        tracing::debug!("💰 Fetching budget execution: {}", url);

        let mut request = self.client.get(url);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }
        let body = send_json(request, "Presupuesto").await?;
        normalize::budget(&body, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variable(id: i64, descripcion: &str) -> BcraVariable {
        BcraVariable {
            id_variable: id,
            cd_serie: None,
            descripcion: descripcion.to_string(),
            fecha: None,
            valor: None,
        }
    }

    #[test]
    fn test_find_bcra_variables() {
        let catalogue = vec![
            variable(1, "Reservas Internacionales del BCRA"),
            variable(4, "Tipo de Cambio Minorista ($ por USD) Comunicación B 9791"),
            variable(6, "Tasa de Política Monetaria (en % n.a.)"),
        ];
        assert_eq!(find_usd_variable(&catalogue).map(|v| v.id_variable), Some(4));
        assert_eq!(find_rate_variable(&catalogue).map(|v| v.id_variable), Some(6));
        assert!(find_usd_variable(&catalogue[..1]).is_none());
    }

    #[test]
    fn test_variable_patterns_compile_once() {
        let catalogue = vec![variable(5, "Tipo de cambio mayorista de referencia en dólares")];
        assert_eq!(find_usd_variable(&catalogue).map(|v| v.id_variable), Some(5));
        assert_eq!(find_usd_variable(&catalogue).map(|v| v.id_variable), Some(5));

        let first = cached_regex(&USD_PATTERN, r"(?i)\b(usd|d[oó]lar)").unwrap() as *const Regex;
        let second = cached_regex(&USD_PATTERN, r"(?i)\b(usd|d[oó]lar)").unwrap() as *const Regex;
        assert_eq!(first, second);
        assert!(find_rate_variable(&catalogue).is_none());
    }

    #[test]
    fn test_parse_series_pairs() {
        let body = json!({
            "data": [["2024-02-01", 13.2], ["2024-01-01", 20.6]],
            "meta": [{"frequency": "month"}, {"field": {"description": "IPC Nivel General"}}]
        });
        let series = parse_series("148.3_INIVELNAL_DICI_M_26", &body).unwrap();
        assert_eq!(series.values[0], ("2024-01-01".to_string(), 20.6));
        assert_eq!(series.title.as_deref(), Some("IPC Nivel General"));
    }

    #[test]
    fn test_parse_series_values_objects() {
        let body = json!({
            "data": [{"series_title": "IPC", "values": [{"date": "2024-01-01", "value": 20.6}]}]
        });
        let series = parse_series("x", &body).unwrap();
        assert_eq!(series.values.len(), 1);
        assert_eq!(series.title.as_deref(), Some("IPC"));
    }

    #[test]
    fn test_parse_series_empty_is_error() {
        assert_eq!(parse_series("x", &json!({"data": []})).unwrap_err().kind(), "parse");
        assert_eq!(parse_series("x", &json!({"error": "bad id"})).unwrap_err().kind(), "parse");
    }

    #[test]
    fn test_build_url_encodes_params() {
        let url = build_url(
            "https://apis.datos.gob.ar/series/api",
            "/series",
            &[("ids", "148.3_INIVELNAL_DICI_M_26".to_string()), ("last", "12".to_string())],
        )
        .unwrap();
        assert_eq!(url.path(), "/series/api/series");
        assert_eq!(url.query(), Some("ids=148.3_INIVELNAL_DICI_M_26&last=12"));

        let bare = build_url("https://api.bcra.gob.ar/estadisticas/v3", "/Metadatos", &[]).unwrap();
        assert_eq!(bare.query(), None);
    }

    #[tokio::test]
    async fn test_unconfigured_presupuesto_fails() {
        let service = PresupuestoService::new(http_client().unwrap(), None, None);
        assert!(!service.is_configured());
        let err = service.fetch_execution(2026).await.unwrap_err();
        assert_eq!(err.kind(), "network");
    }
}
