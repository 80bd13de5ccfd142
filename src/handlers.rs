use crate::aggregator::{with_deadline, Aggregator};
use crate::argenstats_client::{ArgenStatsClient, PROBE_ENDPOINTS};
use crate::config::Config;
use crate::dashboard;
use crate::errors::{AppError, FetchError};
use crate::fallback;
use crate::models::*;
use crate::services::{
    self, find_rate_variable, find_usd_variable, BcraService, PresupuestoService, SeriesService,
    INFLATION_SERIES_IDS,
};
use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NO_CACHE: &str = "no-cache";
const PUBLIC_FIVE_MINUTES: &str = "public, max-age=300";

/// Shared application state injected into handlers.
///
/// Holds only immutable configuration and cloneable clients; nothing is
/// cached between requests.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// ArgenStats fan-out with the configured deadline.
    pub aggregator: Aggregator,
    /// BCRA statistics client.
    pub bcra: BcraService,
    /// datos.gob.ar time series client.
    pub series: SeriesService,
    /// Budget execution client (optional upstream).
    pub presupuesto: PresupuestoService,
}

impl AppState {
    /// Builds every upstream client over one shared connection pool.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let client = services::http_client()?;
        let argenstats = ArgenStatsClient::from_config(client.clone(), &config);
        Ok(Self {
            aggregator: Aggregator::new(argenstats, config.upstream_timeout()),
            bcra: BcraService::from_config(client.clone(), &config),
            series: SeriesService::from_config(client.clone(), &config),
            presupuesto: PresupuestoService::from_config(client, &config),
            config,
        })
    }

    fn argenstats(&self) -> &ArgenStatsClient {
        self.aggregator.client()
    }
}

fn json_with_cache<T: Serialize>(cache_control: &'static str, body: T) -> Response {
    ([(header::CACHE_CONTROL, cache_control)], Json(body)).into_response()
}

/// Lenient integer query value: unparseable input yields `default`, numbers
/// are clamped to `min..=max`, including ones too long for an `i64`.
pub fn parse_bounded(raw: Option<&str>, default: usize, min: usize, max: usize) -> usize {
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(n) => n.clamp(min as i64, max as i64) as usize,
        Err(_) if all_digits(raw.strip_prefix('+').unwrap_or(raw)) => max,
        Err(_) if raw.strip_prefix('-').is_some_and(all_digits) => min,
        Err(_) => default,
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn log_fallback(route: &str, name: &str, e: &FetchError) {
    tracing::warn!(
        route = route,
        indicator = name,
        kind = e.kind(),
        "Upstream fetch failed, using fallback: {}",
        e
    );
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with service status.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-argentina-dashboard",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Any non-GET method on a data route.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// GET /
///
/// Dashboard page rendered from one aggregation cycle.
pub async fn dashboard_page(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET / - rendering dashboard");
    let data = state.aggregator.dashboard().await;
    let html = dashboard::render(&data, state.config.refresh_interval_secs);
    ([(header::CACHE_CONTROL, NO_CACHE)], Html(html)).into_response()
}

/// GET /api/argenstats
///
/// Every dashboard indicator, each from ArgenStats or its fallback.
pub async fn dashboard_data(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/argenstats");
    let response = state.aggregator.dashboard().await;
    tracing::info!(
        "📊 /api/argenstats served: {} real, {} fallback",
        response.metadata.successful_apis,
        response.metadata.failed_apis
    );
    json_with_cache(NO_CACHE, response)
}

/// GET /api/argenstats/historical?type=all|dollar|inflation&days=30&months=12
///
/// # Arguments
///
/// * `state` - The application state.
/// * `query` - Raw query; invalid values fall back to their defaults.
///
/// # Returns
///
/// * `Response` - `HistoricalResponse` JSON, cacheable for five minutes.
pub async fn historical(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());
    let kind = HistoryKind::parse(query.get("type"));
    let days = parse_bounded(query.get("days"), 30, 1, 365);
    let months = parse_bounded(query.get("months"), 12, 1, 12);
    tracing::info!(
        "GET /api/argenstats/historical - type={:?} days={} months={}",
        kind,
        days,
        months
    );

    let now = Utc::now();
    let today = now.date_naive();
    let deadline = state.config.upstream_timeout();
    let client = state.argenstats();
    let mut metadata = ResponseMetadata::new("", now);

    let dollar_history = if kind.includes_dollar() {
        match with_deadline(deadline, client.fetch_dollar_history(days, today)).await {
            Ok(real) => {
                metadata.record_success("dollarHistory", "ArgenStats API - Dollar");
                fallback::fill_dollar_history(&real, days, today)
            }
            Err(e) => {
                log_fallback("historical", "dollarHistory", &e);
                metadata.record_failure("dollarHistory", e.kind());
                fallback::dollar_history(days, today)
            }
        }
    } else {
        Vec::new()
    };

    let inflation_history = if kind.includes_inflation() {
        let year = fallback::current_year(now);
        match with_deadline(deadline, client.fetch_recent_inflation(months, year)).await {
            Ok(real) if !real.is_empty() => {
                metadata.record_success("inflationHistory", "ArgenStats API - IPC");
                real
            }
            Ok(_) => {
                let e = FetchError::Parse("no IPC months published".to_string());
                log_fallback("historical", "inflationHistory", &e);
                metadata.record_failure("inflationHistory", e.kind());
                fallback::inflation_history(months)
            }
            Err(e) => {
                log_fallback("historical", "inflationHistory", &e);
                metadata.record_failure("inflationHistory", e.kind());
                fallback::inflation_history(months)
            }
        }
    } else {
        Vec::new()
    };

    let metadata = metadata
        .with_source_from_counts("ArgenStats API")
        .with_detail("type", json!(kind))
        .with_detail("days", json!(days))
        .with_detail("months", json!(months));

    json_with_cache(
        PUBLIC_FIVE_MINUTES,
        HistoricalResponse {
            dollar_history,
            inflation_history,
            metadata,
        },
    )
}

/// GET /api/argenstats/debug
///
/// Probes each upstream endpoint concurrently and reports status, timing and
/// a body excerpt.
pub async fn debug(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/argenstats/debug");
    json_with_cache(NO_CACHE, debug_report(&state).await)
}

/// Runs every upstream probe concurrently.
pub async fn debug_report(state: &AppState) -> DebugReport {
    let deadline = state.config.upstream_timeout();
    let client = state.argenstats();

    let mut targets = Vec::new();
    for (name, path, params) in PROBE_ENDPOINTS {
        let params: Vec<(&str, String)> = params.iter().map(|(k, v)| (*k, v.to_string())).collect();
        match client.url(path, &params) {
            Ok(url) => targets.push((name.to_string(), url.clone(), client.request(url))),
            Err(e) => tracing::error!("Cannot build probe URL for {}: {}", name, e),
        }
    }
    if let Ok(url) = state.bcra.metadata_url() {
        targets.push(("BCRA Metadatos".to_string(), url.clone(), state.bcra.request(url)));
    }
    if let Ok(url) = state.series.series_url(INFLATION_SERIES_IDS[0], 1) {
        targets.push(("Series de Tiempo".to_string(), url.clone(), state.series.request(url)));
    }

    let tests = join_all(
        targets
            .into_iter()
            .map(|(name, url, request)| async move { services::probe(&name, url, request, deadline).await }),
    )
    .await;

    let successful = tests.iter().filter(|t| t.success).count();
    let avg_response_time = if tests.is_empty() {
        0.0
    } else {
        tests.iter().map(|t| t.timing as f64).sum::<f64>() / tests.len() as f64
    };
    let summary = ProbeSummary {
        total: tests.len(),
        successful,
        failed: tests.len() - successful,
        avg_response_time,
        api_key_available: client.has_api_key(),
        api_key_used: client.has_api_key(),
    };

    DebugReport {
        timestamp: Utc::now(),
        tests,
        summary,
    }
}

/// GET /api/bcra
///
/// Official exchange rate and reference interest rate from the BCRA
/// statistics API. Blue is estimated from the official rate.
pub async fn bcra(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/bcra");
    let now = Utc::now();
    let today = now.date_naive();
    let deadline = state.config.upstream_timeout();

    let mut metadata = ResponseMetadata::new("", now);
    let mut exchange_rate = BcraExchangeRate {
        oficial: fallback::OFICIAL,
        blue: fallback::BLUE,
        date: now.to_rfc3339(),
    };
    let mut interest_rate = BcraInterestRate {
        rate: fallback::INTEREST_RATE,
        date: now.to_rfc3339(),
    };

    match with_deadline(deadline, state.bcra.fetch_metadata()).await {
        Ok(variables) => {
            let usd_id = find_usd_variable(&variables).map(|v| v.id_variable);
            let rate_id = find_rate_variable(&variables).map(|v| v.id_variable);
            tracing::debug!("BCRA variables: usd={:?} rate={:?}", usd_id, rate_id);

            let fetch_latest = |id: Option<i64>, window: i64, what: &'static str| {
                let bcra = &state.bcra;
                async move {
                    let id = id.ok_or_else(|| {
                        FetchError::Parse(format!("no {} variable in BCRA metadata", what))
                    })?;
                    let points = with_deadline(
                        deadline,
                        bcra.fetch_variable(id, today - Duration::days(window), today),
                    )
                    .await?;
                    points
                        .last()
                        .cloned()
                        .ok_or_else(|| FetchError::Parse(format!("empty {} series", what)))
                }
            };
            let (usd, rate) = tokio::join!(
                fetch_latest(usd_id, 30, "USD exchange rate"),
                fetch_latest(rate_id, 7, "interest rate")
            );

            match usd {
                Ok(point) => {
                    exchange_rate = BcraExchangeRate {
                        oficial: point.valor,
                        blue: fallback::round_cents(point.valor * fallback::BLUE_GAP),
                        date: point.fecha,
                    };
                    metadata.record_success("exchangeRate", "BCRA API v3");
                }
                Err(e) => {
                    log_fallback("bcra", "exchangeRate", &e);
                    metadata.record_failure("exchangeRate", e.kind());
                }
            }
            match rate {
                Ok(point) => {
                    interest_rate = BcraInterestRate {
                        rate: point.valor,
                        date: point.fecha,
                    };
                    metadata.record_success("interestRate", "BCRA API v3");
                }
                Err(e) => {
                    log_fallback("bcra", "interestRate", &e);
                    metadata.record_failure("interestRate", e.kind());
                }
            }

            metadata = metadata
                .with_detail("usdVariableId", json!(usd_id))
                .with_detail("rateVariableId", json!(rate_id));
        }
        Err(e) => {
            log_fallback("bcra", "metadata", &e);
            metadata.record_failure("exchangeRate", e.kind());
            metadata.record_failure("interestRate", e.kind());
        }
    }

    json_with_cache(
        NO_CACHE,
        BcraResponse {
            exchange_rate,
            interest_rate,
            metadata: metadata.with_source_from_counts("BCRA API v3"),
        },
    )
}

/// GET /api/bcra/exchange-history?days=30
///
/// Daily official rate from BCRA with an estimated blue rate. Sparse real
/// series are completed by interpolation; a failed upstream yields a fully
/// synthetic series.
pub async fn bcra_exchange_history(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let days = parse_bounded(QueryParams::parse(raw.as_deref()).get("days"), 30, 1, 365);
    tracing::info!("GET /api/bcra/exchange-history - days={}", days);
    let now = Utc::now();
    let today = now.date_naive();
    let deadline = state.config.upstream_timeout();
    let mut metadata = ResponseMetadata::new("", now).with_detail("days", json!(days));

    let from = today - Duration::days(days.saturating_sub(1) as i64);
    let real = with_deadline(deadline, async {
        let variables = state.bcra.fetch_metadata().await?;
        let usd = find_usd_variable(&variables).ok_or_else(|| {
            FetchError::Parse("no USD exchange rate variable in BCRA metadata".to_string())
        })?;
        state.bcra.fetch_variable(usd.id_variable, from, today).await
    })
    .await;

    let data = match real {
        Ok(points) => {
            let mut rng = rand::thread_rng();
            let real_points: Vec<DollarHistoryPoint> = points
                .into_iter()
                .filter_map(|p| {
                    let day = fallback::parse_day(&p.fecha)?;
                    Some(DollarHistoryPoint {
                        date: day.format("%Y-%m-%d").to_string(),
                        oficial: p.valor,
                        blue: fallback::round_cents(fallback::random_blue(p.valor, &mut rng)),
                    })
                })
                .collect();
            metadata.record_success("exchangeHistory", "BCRA API v3");
            let real_count = real_points.len();
            metadata = metadata.with_detail("realPoints", json!(real_count));
            if real_count * 2 < days {
                metadata = metadata.with_detail("interpolated", json!(true));
                fallback::fill_dollar_history(&real_points, days, today)
            } else {
                real_points
            }
        }
        Err(e) => {
            log_fallback("bcra/exchange-history", "exchangeHistory", &e);
            metadata.record_failure("exchangeHistory", e.kind());
            fallback::dollar_history(days, today)
        }
    };

    json_with_cache(
        PUBLIC_FIVE_MINUTES,
        ExchangeHistoryResponse {
            data,
            metadata: metadata.with_source_from_counts("BCRA API v3"),
        },
    )
}

/// GET /api/series
///
/// Latest monthly IPC from Series de Tiempo; annual is the sum of the last
/// twelve monthly values.
pub async fn series_inflation(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/series");
    let now = Utc::now();
    let mut metadata = ResponseMetadata::new("", now);

    let fetched = with_deadline(
        state.config.upstream_timeout(),
        state.series.fetch_first_available(&INFLATION_SERIES_IDS, 12),
    )
    .await;

    let (values, series_id, title): (Vec<(String, f64)>, Option<String>, Option<String>) =
        match fetched {
            Ok(series) => {
                metadata.record_success("inflation", "Series de Tiempo API");
                (series.values, Some(series.series_id), series.title)
            }
            Err(e) => {
                log_fallback("series", "inflation", &e);
                metadata.record_failure("inflation", e.kind());
                let reference = fallback::REFERENCE_INFLATION
                    .iter()
                    .map(|(_, value, date)| (date.to_string(), *value))
                    .collect();
                (
                    reference,
                    None,
                    Some("IPC Nacional Mensual (Datos de referencia)".to_string()),
                )
            }
        };

    let inflation = summarize_inflation(&values, now);
    let metadata = metadata
        .with_source_from_counts("Series de Tiempo API")
        .with_detail("seriesId", json!(series_id))
        .with_detail("seriesTitle", json!(title));

    json_with_cache(NO_CACHE, SeriesInflationResponse { inflation, metadata })
}

/// Latest monthly value plus the sum of the last twelve.
pub fn summarize_inflation(values: &[(String, f64)], now: chrono::DateTime<Utc>) -> SeriesInflation {
    let window = &values[values.len().saturating_sub(12)..];
    match window.last() {
        Some((date, monthly)) => SeriesInflation {
            monthly: *monthly,
            annual: fallback::round_cents(window.iter().map(|(_, v)| v).sum()),
            date: date.clone(),
        },
        None => SeriesInflation {
            monthly: fallback::INFLATION_MONTHLY,
            annual: fallback::INFLATION_ANNUAL,
            date: now.to_rfc3339(),
        },
    }
}

/// GET /api/series/inflation-history
///
/// Always exactly twelve monthly points.
pub async fn series_inflation_history(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/series/inflation-history");
    let now = Utc::now();
    let mut metadata = ResponseMetadata::new("", now);

    let fetched = with_deadline(
        state.config.upstream_timeout(),
        state.series.fetch_first_available(&INFLATION_SERIES_IDS, 12),
    )
    .await;

    let (points, series_id) = match fetched {
        Ok(series) => {
            metadata.record_success("inflationHistory", "Series de Tiempo API");
            let points = series
                .values
                .iter()
                .map(|(date, value)| InflationHistoryPoint {
                    month: fallback::month_label(date),
                    value: *value,
                    date: Some(date.clone()),
                })
                .collect();
            (points, Some(series.series_id))
        }
        Err(e) => {
            log_fallback("series/inflation-history", "inflationHistory", &e);
            metadata.record_failure("inflationHistory", e.kind());
            (fallback::inflation_history(12), None)
        }
    };

    let mut data = fallback::pad_inflation_history(points, 12);
    let total_points = data.len();
    data.drain(..total_points.saturating_sub(12));

    let metadata = metadata
        .with_source_from_counts("Series de Tiempo API")
        .with_detail("seriesId", json!(series_id))
        .with_detail("totalPoints", json!(total_points));

    json_with_cache(PUBLIC_FIVE_MINUTES, SeriesHistoryResponse { data, metadata })
}

async fn budget_for_year(
    state: &AppState,
    raw_year: Option<&str>,
    route: &str,
) -> (BudgetSnapshot, ResponseMetadata) {
    let now = Utc::now();
    let current = fallback::current_year(now);
    let year = raw_year
        .and_then(|y| y.trim().parse::<i32>().ok())
        .filter(|y| (2000..=current + 1).contains(y))
        .unwrap_or(current);
    let mut metadata = ResponseMetadata::new("", now);

    let budget = if !state.presupuesto.is_configured() {
        tracing::debug!("Budget provider not configured, serving fallback for {}", year);
        metadata.record_failure("budget", "not_configured");
        fallback::budget(year)
    } else {
        match with_deadline(
            state.config.upstream_timeout(),
            state.presupuesto.fetch_execution(year),
        )
        .await
        {
            Ok(budget) => {
                metadata.record_success("budget", "Presupuesto Abierto API");
                budget
            }
            Err(e) => {
                log_fallback(route, "budget", &e);
                metadata.record_failure("budget", e.kind());
                fallback::budget(year)
            }
        }
    };

    (
        budget,
        metadata.with_source_from_counts("Presupuesto Abierto API"),
    )
}

/// GET /api/presupuesto?year=2026
pub async fn presupuesto(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    tracing::info!("GET /api/presupuesto");
    let query = QueryParams::parse(raw.as_deref());
    let (budget, metadata) = budget_for_year(&state, query.get("year"), "presupuesto").await;
    json_with_cache(NO_CACHE, BudgetResponse { budget, metadata })
}

/// GET /api/presupuesto/execution?year=2026
///
/// Executed and total budget split across the main spending areas.
pub async fn presupuesto_execution(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    tracing::info!("GET /api/presupuesto/execution");
    let query = QueryParams::parse(raw.as_deref());
    let (budget, metadata) =
        budget_for_year(&state, query.get("year"), "presupuesto/execution").await;
    let areas = fallback::budget_areas(&budget);
    json_with_cache(
        NO_CACHE,
        BudgetExecutionResponse {
            executed: budget.executed,
            total: budget.total,
            areas,
            metadata: metadata.with_detail("year", json!(budget.year)),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounded() {
        assert_eq!(parse_bounded(None, 30, 1, 365), 30);
        assert_eq!(parse_bounded(Some("abc"), 30, 1, 365), 30);
        assert_eq!(parse_bounded(Some("7"), 30, 1, 365), 7);
        assert_eq!(parse_bounded(Some("0"), 30, 1, 365), 1);
        assert_eq!(parse_bounded(Some("-4"), 30, 1, 365), 1);
        assert_eq!(parse_bounded(Some("9999"), 30, 1, 365), 365);
        assert_eq!(parse_bounded(Some(" 6 "), 12, 1, 12), 6);
    }

    #[test]
    fn test_parse_bounded_overflow_clamps() {
        assert_eq!(parse_bounded(Some("99999999999999999999"), 30, 1, 365), 365);
        assert_eq!(parse_bounded(Some("+99999999999999999999"), 30, 1, 365), 365);
        assert_eq!(parse_bounded(Some("-99999999999999999999"), 30, 1, 365), 1);
        assert_eq!(parse_bounded(Some("9999999999999999999x"), 30, 1, 365), 30);
        assert_eq!(parse_bounded(Some("-"), 30, 1, 365), 30);
        assert_eq!(parse_bounded(Some(""), 30, 1, 365), 30);
    }

    #[test]
    fn test_summarize_inflation_sums_last_twelve() {
        let values: Vec<(String, f64)> = (1..=14)
            .map(|m| (format!("2024-{:02}-01", m.min(12)), 1.0))
            .collect();
        let summary = summarize_inflation(&values, Utc::now());
        assert_eq!(summary.annual, 12.0);
        assert_eq!(summary.monthly, 1.0);
    }

    #[test]
    fn test_summarize_reference_series() {
        let values: Vec<(String, f64)> = fallback::REFERENCE_INFLATION
            .iter()
            .map(|(_, v, d)| (d.to_string(), *v))
            .collect();
        let summary = summarize_inflation(&values, Utc::now());
        assert_eq!(summary.monthly, 2.5);
        assert_eq!(summary.annual, 81.7);
        assert_eq!(summary.date, "2024-12-31");
    }
}
