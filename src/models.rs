use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============ Indicators ============

/// One named economic metric served by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Indicator {
    Dollar,
    Inflation,
    Emae,
    RiesgoPais,
    LaborMarket,
    Poverty,
    Calendar,
    EmaeSectors,
}

impl Indicator {
    /// Indicators fetched by one dashboard aggregation cycle.
    pub const ALL: [Indicator; 8] = [
        Indicator::Dollar,
        Indicator::Inflation,
        Indicator::Emae,
        Indicator::RiesgoPais,
        Indicator::LaborMarket,
        Indicator::Poverty,
        Indicator::Calendar,
        Indicator::EmaeSectors,
    ];

    /// Key used in `api_status` / `sources` maps.
    pub fn key(&self) -> &'static str {
        match self {
            Indicator::Dollar => "dollar",
            Indicator::Inflation => "inflation",
            Indicator::Emae => "emae",
            Indicator::RiesgoPais => "riesgoPais",
            Indicator::LaborMarket => "laborMarket",
            Indicator::Poverty => "poverty",
            Indicator::Calendar => "calendar",
            Indicator::EmaeSectors => "emaeSectors",
        }
    }

    /// Human label used in source strings ("ArgenStats API - IPC").
    pub fn label(&self) -> &'static str {
        match self {
            Indicator::Dollar => "Dollar",
            Indicator::Inflation => "IPC",
            Indicator::Emae => "EMAE",
            Indicator::RiesgoPais => "Riesgo País",
            Indicator::LaborMarket => "Labor Market",
            Indicator::Poverty => "Poverty",
            Indicator::Calendar => "Calendar",
            Indicator::EmaeSectors => "EMAE Sectors",
        }
    }
}

// ============ Snapshots ============

/// Exchange rates in ARS per USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateSnapshot {
    pub oficial: f64,
    pub blue: f64,
    pub mep: f64,
    pub ccl: f64,
    /// Card rate (official plus taxes).
    pub tarjeta: f64,
    pub date: DateTime<Utc>,
}

/// Consumer price index (IPC) variations in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflationSnapshot {
    pub monthly: f64,
    pub annual: f64,
    pub accumulated: f64,
    pub index: f64,
    pub date: DateTime<Utc>,
}

/// Monthly economic activity estimator (EMAE).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityIndexSnapshot {
    pub monthly: f64,
    pub annual: f64,
    pub index: f64,
    pub date: DateTime<Utc>,
}

/// Country risk spread in basis points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRiskSnapshot {
    pub value: i64,
    pub variation: f64,
    pub variation_pct: f64,
    pub date: DateTime<Utc>,
}

/// Labor market rates in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborMarketSnapshot {
    pub unemployment: f64,
    pub employment: f64,
    pub activity: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PovertySnapshot {
    pub poverty_rate: f64,
    pub indigence_rate: f64,
    pub poverty_population: u64,
    pub indigence_population: u64,
    pub period: String,
    pub date: DateTime<Utc>,
}

/// Upcoming INDEC release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: String,
    pub day_week: String,
    pub indicator: String,
    pub period: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaeSector {
    pub sector: String,
    pub annual_variation: f64,
    pub index_value: f64,
}

/// The value set produced by one upstream call (or its fallback).
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorSnapshot {
    Dollar(ExchangeRateSnapshot),
    Inflation(InflationSnapshot),
    Emae(ActivityIndexSnapshot),
    RiesgoPais(CountryRiskSnapshot),
    LaborMarket(LaborMarketSnapshot),
    Poverty(PovertySnapshot),
    Calendar(Vec<CalendarEvent>),
    EmaeSectors(Vec<EmaeSector>),
}

impl IndicatorSnapshot {
    pub fn indicator(&self) -> Indicator {
        match self {
            IndicatorSnapshot::Dollar(_) => Indicator::Dollar,
            IndicatorSnapshot::Inflation(_) => Indicator::Inflation,
            IndicatorSnapshot::Emae(_) => Indicator::Emae,
            IndicatorSnapshot::RiesgoPais(_) => Indicator::RiesgoPais,
            IndicatorSnapshot::LaborMarket(_) => Indicator::LaborMarket,
            IndicatorSnapshot::Poverty(_) => Indicator::Poverty,
            IndicatorSnapshot::Calendar(_) => Indicator::Calendar,
            IndicatorSnapshot::EmaeSectors(_) => Indicator::EmaeSectors,
        }
    }
}

// ============ Aggregation ============

/// Merged outcome of one aggregation cycle. Built per request, never stored.
#[derive(Debug, Clone, Default)]
pub struct AggregationResult {
    pub exchange_rates: Option<ExchangeRateSnapshot>,
    pub inflation: Option<InflationSnapshot>,
    pub emae: Option<ActivityIndexSnapshot>,
    pub riesgo_pais: Option<CountryRiskSnapshot>,
    pub labor_market: Option<LaborMarketSnapshot>,
    pub poverty: Option<PovertySnapshot>,
    pub calendar: Option<Vec<CalendarEvent>>,
    pub emae_sectors: Option<Vec<EmaeSector>>,
    pub successful: usize,
    pub failed: usize,
    /// Indicator key -> "success" | "fallback: <reason>".
    pub api_status: BTreeMap<String, String>,
    /// Indicator key -> source label.
    pub sources: BTreeMap<String, String>,
    /// One line per failed indicator.
    pub errors: Vec<String>,
}

impl AggregationResult {
    pub fn attempted(&self) -> usize {
        self.successful + self.failed
    }

    /// Stores a snapshot in the slot matching its indicator.
    pub fn insert(&mut self, snapshot: IndicatorSnapshot) {
        match snapshot {
            IndicatorSnapshot::Dollar(s) => self.exchange_rates = Some(s),
            IndicatorSnapshot::Inflation(s) => self.inflation = Some(s),
            IndicatorSnapshot::Emae(s) => self.emae = Some(s),
            IndicatorSnapshot::RiesgoPais(s) => self.riesgo_pais = Some(s),
            IndicatorSnapshot::LaborMarket(s) => self.labor_market = Some(s),
            IndicatorSnapshot::Poverty(s) => self.poverty = Some(s),
            IndicatorSnapshot::Calendar(s) => self.calendar = Some(s),
            IndicatorSnapshot::EmaeSectors(s) => self.emae_sectors = Some(s),
        }
    }

    pub fn is_real(&self, indicator: Indicator) -> bool {
        self.api_status
            .get(indicator.key())
            .is_some_and(|status| status == "success")
    }

    /// Overall source label: all real, partial, or all fallback.
    pub fn source_label(&self) -> &'static str {
        if self.failed == 0 {
            "ArgenStats API"
        } else if self.successful == 0 {
            "Fallback data"
        } else {
            "ArgenStats API + Fallback"
        }
    }
}

// ============ API Response Models ============

/// Metadata block shared by every data route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub successful_apis: usize,
    pub failed_apis: usize,
    pub api_status: BTreeMap<String, String>,
    pub sources: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Route-specific extras (series id, variable ids, parameters...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ResponseMetadata {
    pub fn new(source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            timestamp,
            successful_apis: 0,
            failed_apis: 0,
            api_status: BTreeMap::new(),
            sources: BTreeMap::new(),
            error: None,
            details: Map::new(),
        }
    }

    /// Records a successful upstream call.
    pub fn record_success(&mut self, name: &str, source: impl Into<String>) {
        self.successful_apis += 1;
        self.api_status.insert(name.to_string(), "success".to_string());
        self.sources.insert(name.to_string(), source.into());
    }

    /// Records a failed upstream call and appends its reason to `error`.
    pub fn record_failure(&mut self, name: &str, reason: &str) {
        self.failed_apis += 1;
        self.api_status
            .insert(name.to_string(), format!("fallback: {}", reason));
        self.sources
            .insert(name.to_string(), "Fallback data".to_string());
        let line = format!("{}: {}", name, reason);
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{}; {}", existing, line),
            None => line,
        });
    }

    /// Derives `source` from the counts: `primary` when nothing failed,
    /// "Fallback data" when nothing succeeded, "<primary> + Fallback" otherwise.
    pub fn with_source_from_counts(mut self, primary: &str) -> Self {
        self.source = if self.failed_apis == 0 {
            primary.to_string()
        } else if self.successful_apis == 0 {
            "Fallback data".to_string()
        } else {
            format!("{} + Fallback", primary)
        };
        self
    }

    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// Body of `GET /api/argenstats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rates: Option<ExchangeRateSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflation: Option<InflationSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emae: Option<ActivityIndexSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub riesgo_pais: Option<CountryRiskSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_market: Option<LaborMarketSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poverty: Option<PovertySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Vec<CalendarEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emae_sectors: Option<Vec<EmaeSector>>,
    pub metadata: ResponseMetadata,
}

impl DashboardResponse {
    pub fn from_aggregation(
        result: AggregationResult,
        timestamp: DateTime<Utc>,
        has_api_key: bool,
    ) -> Self {
        let error = if result.errors.is_empty() {
            None
        } else {
            Some(result.errors.join("; "))
        };
        let metadata = ResponseMetadata {
            source: result.source_label().to_string(),
            timestamp,
            successful_apis: result.successful,
            failed_apis: result.failed,
            api_status: result.api_status,
            sources: result.sources,
            error,
            details: Map::new(),
        }
        .with_detail("has_api_key", Value::Bool(has_api_key));

        Self {
            exchange_rates: result.exchange_rates,
            inflation: result.inflation,
            emae: result.emae,
            riesgo_pais: result.riesgo_pais,
            labor_market: result.labor_market,
            poverty: result.poverty,
            calendar: result.calendar,
            emae_sectors: result.emae_sectors,
            metadata,
        }
    }
}

// ============ Historical Models ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DollarHistoryPoint {
    /// ISO date (YYYY-MM-DD).
    pub date: String,
    pub oficial: f64,
    pub blue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflationHistoryPoint {
    /// Short Spanish month label, e.g. "Ene 24".
    pub month: String,
    /// Monthly variation in percent.
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Which series the historical route should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    All,
    Dollar,
    Inflation,
}

impl HistoryKind {
    /// Unknown values fall back to `All`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("dollar") => HistoryKind::Dollar,
            Some("inflation") => HistoryKind::Inflation,
            _ => HistoryKind::All,
        }
    }

    pub fn includes_dollar(&self) -> bool {
        matches!(self, HistoryKind::All | HistoryKind::Dollar)
    }

    pub fn includes_inflation(&self) -> bool {
        matches!(self, HistoryKind::All | HistoryKind::Inflation)
    }
}

/// Decoded query string of a data route.
///
/// Never rejects input, so a bad query never turns into a 400: repeated keys
/// keep their first value and malformed percent escapes decode lossily.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self(pairs)
    }

    /// First value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Body of `GET /api/argenstats/historical`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalResponse {
    pub dollar_history: Vec<DollarHistoryPoint>,
    pub inflation_history: Vec<InflationHistoryPoint>,
    pub metadata: ResponseMetadata,
}

// ============ Debug Probe Models ============

/// Result of probing one upstream endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub name: String,
    pub url: String,
    pub status: Option<u16>,
    pub success: bool,
    /// Elapsed milliseconds; 0 when the request never completed.
    pub timing: u64,
    pub response: Option<Value>,
    /// First 500 characters of the raw body.
    pub response_text: Option<String>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(rename = "avgResponseTime")]
    pub avg_response_time: f64,
    pub api_key_available: bool,
    pub api_key_used: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugReport {
    pub timestamp: DateTime<Utc>,
    pub tests: Vec<ProbeResult>,
    pub summary: ProbeSummary,
}

// ============ BCRA Models ============

/// Entry of the BCRA `/Metadatos` catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcraVariable {
    #[serde(rename = "idVariable")]
    pub id_variable: i64,
    #[serde(rename = "cdSerie", default)]
    pub cd_serie: Option<i64>,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub valor: Option<f64>,
}

/// One observation of a BCRA variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcraDataPoint {
    pub fecha: String,
    pub valor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcraExchangeRate {
    pub oficial: f64,
    pub blue: f64,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcraInterestRate {
    pub rate: f64,
    pub date: String,
}

/// Body of `GET /api/bcra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BcraResponse {
    pub exchange_rate: BcraExchangeRate,
    pub interest_rate: BcraInterestRate,
    pub metadata: ResponseMetadata,
}

/// Body of `GET /api/bcra/exchange-history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeHistoryResponse {
    pub data: Vec<DollarHistoryPoint>,
    pub metadata: ResponseMetadata,
}

// ============ Series de Tiempo Models ============

/// One time series returned by the datos.gob.ar series API, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub series_id: String,
    pub title: Option<String>,
    /// (ISO date, value) in chronological order.
    pub values: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInflation {
    pub monthly: f64,
    pub annual: f64,
    pub date: String,
}

/// Body of `GET /api/series`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInflationResponse {
    pub inflation: SeriesInflation,
    pub metadata: ResponseMetadata,
}

/// Body of `GET /api/series/inflation-history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesHistoryResponse {
    pub data: Vec<InflationHistoryPoint>,
    pub metadata: ResponseMetadata,
}

// ============ Budget Models ============

/// National budget execution in ARS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub executed: f64,
    pub total: f64,
    pub percentage: f64,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetArea {
    pub name: String,
    pub executed: f64,
    pub total: f64,
}

/// Body of `GET /api/presupuesto`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetResponse {
    #[serde(flatten)]
    pub budget: BudgetSnapshot,
    pub metadata: ResponseMetadata,
}

/// Body of `GET /api/presupuesto/execution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetExecutionResponse {
    pub executed: f64,
    pub total: f64,
    pub areas: Vec<BudgetArea>,
    pub metadata: ResponseMetadata,
}
