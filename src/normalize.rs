//! Maps the several upstream JSON shapes onto canonical snapshots.
//!
//! Upstreams wrap records as `{success, data: [...]}`, `{data: {...}}`,
//! `{results: [...]}`, a bare array or a bare object, and name the same
//! field differently across versions. Fields the upstream omits are filled
//! from the fallback constants; a record with no recognizable field at all is
//! a parse error.

use crate::errors::FetchError;
use crate::fallback;
use crate::models::*;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Record = Map<String, Value>;

/// Records carried by an upstream body, in upstream order.
pub fn records(body: &Value) -> Vec<&Record> {
    let payload = match body {
        Value::Object(obj) => obj
            .get("data")
            .or_else(|| obj.get("results"))
            .unwrap_or(body),
        _ => body,
    };

    match payload {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => vec![obj],
        _ => Vec::new(),
    }
}

/// Message of an in-band error body (`{"success": false, ...}` or an
/// `error` key) answered with a 2xx status.
pub fn upstream_error(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    let failed = obj.get("success").and_then(Value::as_bool) == Some(false);
    let error = obj.get("error").filter(|e| !e.is_null());
    if !failed && error.is_none() {
        return None;
    }
    Some(match error {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => "success: false".to_string(),
    })
}

/// Whether the body carries its records as a list (`[...]`, `data: [...]`
/// or `results: [...]`), so that an empty list is a real empty answer.
fn is_listing(body: &Value) -> bool {
    match body {
        Value::Array(_) => true,
        Value::Object(obj) => obj
            .get("data")
            .or_else(|| obj.get("results"))
            .is_some_and(Value::is_array),
        _ => false,
    }
}

/// Most recent record. Upstreams list records chronologically.
pub fn latest_record<'a>(rows: &[&'a Record]) -> Option<&'a Record> {
    rows.last().copied()
}

/// First key holding a number or a numeric string.
pub fn pick_number(record: &Record, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    })
    .filter(|n| n.is_finite())
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    trimmed.parse::<f64>().ok().or_else(|| {
        // "1290,50" style decimals
        if trimmed.contains(',') && !trimmed.contains('.') {
            trimmed.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })
}

pub fn pick_string<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub const DATE_KEYS: &[&str] = &["date", "fecha", "period_date", "timestamp"];

/// Accepts RFC 3339, `YYYY-MM-DD[...]` and `DD/MM/YYYY`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let day = fallback::parse_day(raw)
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())?;
    day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

pub fn pick_date(record: &Record, keys: &[&str]) -> Option<DateTime<Utc>> {
    pick_string(record, keys).and_then(parse_timestamp)
}

fn latest(body: &Value, what: &str) -> Result<Record, FetchError> {
    if let Some(message) = upstream_error(body) {
        return Err(FetchError::Parse(format!("{} upstream error: {}", what, message)));
    }
    let rows = records(body);
    latest_record(&rows)
        .cloned()
        .ok_or_else(|| FetchError::Parse(format!("no {} records in response", what)))
}

fn require_any(found: &[Option<f64>], what: &str) -> Result<(), FetchError> {
    if found.iter().all(Option::is_none) {
        return Err(FetchError::Parse(format!(
            "no recognizable {} fields in response",
            what
        )));
    }
    Ok(())
}

// ============ Dollar ============

const DOLLAR_TYPE_KEYS: &[&str] = &["dollar_type", "type", "casa", "tipo"];
const DOLLAR_PRICE_KEYS: &[&str] = &["sell_price", "venta", "sell", "value", "valor", "price"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DollarKind {
    Oficial,
    Blue,
    Mep,
    Ccl,
    Tarjeta,
}

fn dollar_kind(raw: &str) -> Option<DollarKind> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "OFICIAL" | "OFFICIAL" | "MINORISTA" => Some(DollarKind::Oficial),
        "BLUE" | "INFORMAL" => Some(DollarKind::Blue),
        "MEP" | "BOLSA" => Some(DollarKind::Mep),
        "CCL" | "CONTADOCONLIQUI" | "CONTADO_CON_LIQUI" => Some(DollarKind::Ccl),
        "TARJETA" | "CARD" | "TURISTA" => Some(DollarKind::Tarjeta),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct DollarFields {
    oficial: Option<f64>,
    blue: Option<f64>,
    mep: Option<f64>,
    ccl: Option<f64>,
    tarjeta: Option<f64>,
    date: Option<DateTime<Utc>>,
}

impl DollarFields {
    fn set(&mut self, kind: DollarKind, value: Option<f64>) {
        let slot = match kind {
            DollarKind::Oficial => &mut self.oficial,
            DollarKind::Blue => &mut self.blue,
            DollarKind::Mep => &mut self.mep,
            DollarKind::Ccl => &mut self.ccl,
            DollarKind::Tarjeta => &mut self.tarjeta,
        };
        if value.is_some() {
            *slot = value;
        }
    }

    fn from_wide(record: &Record) -> Self {
        Self {
            oficial: pick_number(record, &["oficial", "official", "oficial_sell"]),
            blue: pick_number(record, &["blue", "blue_sell", "informal"]),
            mep: pick_number(record, &["mep", "bolsa"]),
            ccl: pick_number(record, &["ccl", "contado_con_liqui"]),
            tarjeta: pick_number(record, &["tarjeta", "card", "turista"]),
            date: pick_date(record, DATE_KEYS),
        }
    }
}

fn is_typed(record: &Record) -> bool {
    pick_string(record, DOLLAR_TYPE_KEYS)
        .and_then(dollar_kind)
        .is_some()
}

/// Latest exchange rates from either a wide (one record per date) or a long
/// (one record per dollar type) response.
pub fn exchange_rates(body: &Value, now: DateTime<Utc>) -> Result<ExchangeRateSnapshot, FetchError> {
    let rows = records(body);
    let typed: Vec<&Record> = rows.iter().copied().filter(|r| is_typed(r)).collect();

    let fields = if typed.is_empty() {
        let record = latest_record(&rows)
            .ok_or_else(|| FetchError::Parse("no dollar records in response".to_string()))?;
        DollarFields::from_wide(record)
    } else {
        // later rows win, so the most recent quote of each type is kept
        let mut fields = DollarFields::default();
        let mut ordered = typed;
        ordered.sort_by_key(|r| pick_date(r, DATE_KEYS));
        for row in ordered {
            if let Some(kind) = pick_string(row, DOLLAR_TYPE_KEYS).and_then(dollar_kind) {
                fields.set(kind, pick_number(row, DOLLAR_PRICE_KEYS));
            }
            if let Some(date) = pick_date(row, DATE_KEYS) {
                fields.date = Some(date);
            }
        }
        fields
    };

    require_any(
        &[fields.oficial, fields.blue, fields.mep, fields.ccl, fields.tarjeta],
        "dollar",
    )?;

    Ok(ExchangeRateSnapshot {
        oficial: fields.oficial.unwrap_or(fallback::OFICIAL),
        blue: fields.blue.unwrap_or(fallback::BLUE),
        mep: fields.mep.unwrap_or(fallback::MEP),
        ccl: fields.ccl.unwrap_or(fallback::CCL),
        tarjeta: fields.tarjeta.unwrap_or(fallback::TARJETA),
        date: fields.date.unwrap_or(now),
    })
}

/// Daily official/blue series, chronological. Dates with only an official
/// quote get a blue rate at the typical gap.
pub fn dollar_history(body: &Value) -> Result<Vec<DollarHistoryPoint>, FetchError> {
    let rows = records(body);
    let mut by_day: BTreeMap<NaiveDate, DollarFields> = BTreeMap::new();

    for row in rows {
        let Some(day) = pick_date(row, DATE_KEYS).map(|d| d.date_naive()) else {
            continue;
        };
        let entry = by_day.entry(day).or_default();
        match pick_string(row, DOLLAR_TYPE_KEYS).and_then(dollar_kind) {
            Some(kind) => entry.set(kind, pick_number(row, DOLLAR_PRICE_KEYS)),
            None => {
                let wide = DollarFields::from_wide(row);
                entry.set(DollarKind::Oficial, wide.oficial);
                entry.set(DollarKind::Blue, wide.blue);
            }
        }
    }

    let points: Vec<DollarHistoryPoint> = by_day
        .into_iter()
        .filter_map(|(day, fields)| {
            let oficial = fields.oficial?;
            Some(DollarHistoryPoint {
                date: day.format("%Y-%m-%d").to_string(),
                oficial,
                blue: fields.blue.unwrap_or(oficial * fallback::BLUE_GAP),
            })
        })
        .collect();

    if points.is_empty() {
        return Err(FetchError::Parse(
            "no dated official quotes in dollar history".to_string(),
        ));
    }
    Ok(points)
}

// ============ INDEC indicators ============

const MONTHLY_KEYS: &[&str] = &["monthly_variation", "monthly", "monthly_pct", "variacion_mensual"];
const ANNUAL_KEYS: &[&str] = &[
    "annual_variation",
    "yoy_variation",
    "interannual_variation",
    "annual",
    "variacion_interanual",
];

pub fn inflation(body: &Value, now: DateTime<Utc>) -> Result<InflationSnapshot, FetchError> {
    let record = latest(body, "IPC")?;
    let monthly = pick_number(&record, MONTHLY_KEYS);
    let annual = pick_number(&record, ANNUAL_KEYS);
    let accumulated = pick_number(
        &record,
        &["accumulated_variation", "ytd_variation", "accumulated", "variacion_acumulada"],
    );
    let index = pick_number(&record, &["index_value", "index", "valor_indice"]);
    require_any(&[monthly, annual, accumulated], "IPC")?;

    Ok(InflationSnapshot {
        monthly: monthly.unwrap_or(fallback::INFLATION_MONTHLY),
        annual: annual.unwrap_or(fallback::INFLATION_ANNUAL),
        accumulated: accumulated.unwrap_or(fallback::INFLATION_ACCUMULATED),
        index: index.unwrap_or(fallback::INFLATION_INDEX),
        date: pick_date(&record, DATE_KEYS).unwrap_or(now),
    })
}

/// Monthly IPC variations, chronological, labelled "Ene 24" style.
pub fn inflation_history(body: &Value) -> Result<Vec<InflationHistoryPoint>, FetchError> {
    let mut dated: Vec<(DateTime<Utc>, f64)> = records(body)
        .into_iter()
        .filter_map(|row| Some((pick_date(row, DATE_KEYS)?, pick_number(row, MONTHLY_KEYS)?)))
        .collect();
    if dated.is_empty() {
        return Err(FetchError::Parse("no dated IPC records in response".to_string()));
    }
    dated.sort_by_key(|(date, _)| *date);
    dated.dedup_by_key(|(date, _)| date.date_naive());

    Ok(dated
        .into_iter()
        .map(|(date, value)| InflationHistoryPoint {
            month: crate::format::short_month_label(date.date_naive()),
            value,
            date: Some(date.format("%Y-%m-%d").to_string()),
        })
        .collect())
}

pub fn emae(body: &Value, now: DateTime<Utc>) -> Result<ActivityIndexSnapshot, FetchError> {
    let record = latest(body, "EMAE")?;
    let monthly = pick_number(&record, MONTHLY_KEYS);
    let annual = pick_number(&record, ANNUAL_KEYS);
    let index = pick_number(&record, &["index_value", "original_value", "index", "valor"]);
    require_any(&[monthly, annual, index], "EMAE")?;

    Ok(ActivityIndexSnapshot {
        monthly: monthly.unwrap_or(fallback::EMAE_MONTHLY),
        annual: annual.unwrap_or(fallback::EMAE_ANNUAL),
        index: index.unwrap_or(fallback::EMAE_INDEX),
        date: pick_date(&record, DATE_KEYS).unwrap_or(now),
    })
}

pub fn riesgo_pais(body: &Value, now: DateTime<Utc>) -> Result<CountryRiskSnapshot, FetchError> {
    let record = latest(body, "riesgo país")?;
    let value = pick_number(&record, &["value", "points", "valor", "closing_value"])
        .ok_or_else(|| FetchError::Parse("riesgo país record has no value".to_string()))?;
    let variation = pick_number(&record, &["variation", "change", "daily_change"]);
    let variation_pct = pick_number(
        &record,
        &["variation_pct", "change_pct", "variation_percentage", "pct_change"],
    )
    .or_else(|| {
        // derive from the absolute change when only that is published
        let change = variation?;
        let previous = value - change;
        (previous != 0.0).then(|| (change / previous * 1000.0).round() / 10.0)
    });

    Ok(CountryRiskSnapshot {
        value: value.round() as i64,
        variation: variation.unwrap_or(fallback::RIESGO_PAIS_VARIATION),
        variation_pct: variation_pct.unwrap_or(fallback::RIESGO_PAIS_VARIATION_PCT),
        date: pick_date(&record, DATE_KEYS).unwrap_or(now),
    })
}

pub fn labor_market(body: &Value, now: DateTime<Utc>) -> Result<LaborMarketSnapshot, FetchError> {
    let record = latest(body, "labor market")?;
    let unemployment = pick_number(&record, &["unemployment_rate", "unemployment", "desocupacion"]);
    let employment = pick_number(&record, &["employment_rate", "employment", "empleo"]);
    let activity = pick_number(&record, &["activity_rate", "activity", "actividad"]);
    require_any(&[unemployment, employment, activity], "labor market")?;

    Ok(LaborMarketSnapshot {
        unemployment: unemployment.unwrap_or(fallback::UNEMPLOYMENT),
        employment: employment.unwrap_or(fallback::EMPLOYMENT),
        activity: activity.unwrap_or(fallback::ACTIVITY),
        date: pick_date(&record, DATE_KEYS).unwrap_or(now),
    })
}

pub fn poverty(body: &Value, now: DateTime<Utc>) -> Result<PovertySnapshot, FetchError> {
    let record = latest(body, "poverty")?;
    let poverty_rate = pick_number(&record, &["poverty_rate", "poverty", "pobreza"]);
    let indigence_rate = pick_number(&record, &["indigence_rate", "indigence", "indigencia"]);
    require_any(&[poverty_rate, indigence_rate], "poverty")?;

    let population = |keys: &[&str], default: u64| {
        pick_number(&record, keys)
            .filter(|n| *n >= 0.0)
            .map(|n| n.round() as u64)
            .unwrap_or(default)
    };

    Ok(PovertySnapshot {
        poverty_rate: poverty_rate.unwrap_or(fallback::POVERTY_RATE),
        indigence_rate: indigence_rate.unwrap_or(fallback::INDIGENCE_RATE),
        poverty_population: population(
            &["poverty_population", "poor_population"],
            fallback::POVERTY_POPULATION,
        ),
        indigence_population: population(
            &["indigence_population", "indigent_population"],
            fallback::INDIGENCE_POPULATION,
        ),
        period: pick_string(&record, &["period", "periodo", "semester"])
            .unwrap_or(fallback::POVERTY_PERIOD)
            .to_string(),
        date: pick_date(&record, DATE_KEYS).unwrap_or(now),
    })
}

/// Release calendar; an empty list is a valid answer, an error body or a
/// bare object without any event is not.
pub fn calendar(body: &Value) -> Result<Vec<CalendarEvent>, FetchError> {
    if !body.is_object() && !body.is_array() {
        return Err(FetchError::Parse("calendar response is not JSON object or array".to_string()));
    }
    if let Some(message) = upstream_error(body) {
        return Err(FetchError::Parse(format!("calendar upstream error: {}", message)));
    }
    let events: Vec<CalendarEvent> = records(body)
        .into_iter()
        .filter_map(|row| {
            let indicator = pick_string(row, &["indicator", "name", "title", "indicador"])?;
            let raw_date = pick_string(row, DATE_KEYS)?;
            let parsed = parse_timestamp(raw_date);
            let day_week = pick_string(row, &["day_week", "weekday", "dia"])
                .map(str::to_string)
                .or_else(|| parsed.map(|d| crate::format::weekday_es(d.date_naive()).to_string()))
                .unwrap_or_default();
            Some(CalendarEvent {
                date: parsed.map(|d| d.to_rfc3339()).unwrap_or_else(|| raw_date.to_string()),
                day_week,
                indicator: indicator.to_string(),
                period: pick_string(row, &["period", "periodo"]).unwrap_or_default().to_string(),
                source: pick_string(row, &["source", "fuente"]).unwrap_or("INDEC").to_string(),
            })
        })
        .collect();

    if events.is_empty() && !is_listing(body) {
        return Err(FetchError::Parse("no calendar events in response".to_string()));
    }
    Ok(events)
}

pub fn emae_sectors(body: &Value) -> Result<Vec<EmaeSector>, FetchError> {
    let sectors: Vec<EmaeSector> = records(body)
        .into_iter()
        .filter_map(|row| {
            let sector = pick_string(row, &["sector", "name", "sector_name"])?;
            let annual_variation = pick_number(row, ANNUAL_KEYS);
            let index_value = pick_number(row, &["index_value", "index", "original_value"]);
            if annual_variation.is_none() && index_value.is_none() {
                return None;
            }
            Some(EmaeSector {
                sector: sector.to_string(),
                annual_variation: annual_variation.unwrap_or(0.0),
                index_value: index_value.unwrap_or(0.0),
            })
        })
        .collect();

    if sectors.is_empty() {
        return Err(FetchError::Parse("no EMAE sectors in response".to_string()));
    }
    Ok(sectors)
}

// ============ Budget ============

pub fn budget(body: &Value, year: i32) -> Result<BudgetSnapshot, FetchError> {
    let record = latest(body, "budget")?;
    let executed = pick_number(&record, &["executed", "devengado", "ejecutado"]);
    let total = pick_number(&record, &["total", "credito_vigente", "vigente"]);
    require_any(&[executed, total], "budget")?;

    let fallback = fallback::budget(year);
    let executed = executed.unwrap_or(fallback.executed);
    let total = total.filter(|t| *t > 0.0).unwrap_or(fallback.total);
    let percentage = pick_number(&record, &["percentage", "porcentaje"])
        .unwrap_or(executed / total * 100.0);

    Ok(BudgetSnapshot {
        executed,
        total,
        percentage,
        year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_envelopes() {
        assert_eq!(records(&json!({"success": true, "data": [{"a": 1}, {"a": 2}]})).len(), 2);
        assert_eq!(records(&json!({"data": {"a": 1}})).len(), 1);
        assert_eq!(records(&json!({"results": [{"a": 1}]})).len(), 1);
        assert_eq!(records(&json!([{"a": 1}, 3, {"b": 2}])).len(), 2);
        assert_eq!(records(&json!({"a": 1})).len(), 1);
        assert!(records(&json!({"data": null})).is_empty());
        assert!(records(&json!("text")).is_empty());
    }

    #[test]
    fn test_pick_number_accepts_strings() {
        let record = json!({"a": "1290.5", "b": "2,2", "c": "3.1%", "d": "n/a"});
        let record = record.as_object().unwrap();
        assert_eq!(pick_number(record, &["a"]), Some(1290.5));
        assert_eq!(pick_number(record, &["b"]), Some(2.2));
        assert_eq!(pick_number(record, &["c"]), Some(3.1));
        assert_eq!(pick_number(record, &["d"]), None);
        assert_eq!(pick_number(record, &["missing", "a"]), Some(1290.5));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-06-01T12:00:00Z").is_some());
        assert!(parse_timestamp("2025-06-01T12:00:00.000-03:00").is_some());
        assert!(parse_timestamp("2025-06-01").is_some());
        assert!(parse_timestamp("01/06/2025").is_some());
        assert!(parse_timestamp("junio").is_none());
    }

    #[test]
    fn test_exchange_rates_long_shape() {
        let body = json!({
            "success": true,
            "data": [
                {"date": "2025-06-01", "dollar_type": "OFICIAL", "buy_price": 1180.0, "sell_price": 1200.0},
                {"date": "2025-06-02", "dollar_type": "OFICIAL", "buy_price": 1185.0, "sell_price": 1205.0},
                {"date": "2025-06-02", "dollar_type": "BLUE", "buy_price": 1210.0, "sell_price": 1230.0}
            ]
        });
        let snapshot = exchange_rates(&body, Utc::now()).unwrap();
        assert_eq!(snapshot.oficial, 1205.0);
        assert_eq!(snapshot.blue, 1230.0);
        assert_eq!(snapshot.mep, fallback::MEP);
        assert_eq!(snapshot.date.date_naive().to_string(), "2025-06-02");
    }

    #[test]
    fn test_exchange_rates_wide_shape() {
        let body = json!({"data": [
            {"date": "2025-06-01", "oficial": 1000, "blue": 1100},
            {"date": "2025-06-02", "oficial": 1010, "blue": 1110, "mep": 1090, "ccl": 1095, "tarjeta": 1313}
        ]});
        let snapshot = exchange_rates(&body, Utc::now()).unwrap();
        assert_eq!(snapshot.oficial, 1010.0);
        assert_eq!(snapshot.tarjeta, 1313.0);
    }

    #[test]
    fn test_exchange_rates_unrecognized_is_parse_error() {
        let err = exchange_rates(&json!({"message": "rate limited"}), Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_dollar_history_groups_by_day() {
        let body = json!([
            {"date": "2025-06-02", "dollar_type": "BLUE", "sell_price": 1230.0},
            {"date": "2025-06-01", "dollar_type": "OFICIAL", "sell_price": 1200.0},
            {"date": "2025-06-02", "dollar_type": "OFICIAL", "sell_price": 1205.0},
            {"dollar_type": "OFICIAL", "sell_price": 1.0}
        ]);
        let points = dollar_history(&body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2025-06-01");
        assert_eq!(points[0].blue, 1200.0 * fallback::BLUE_GAP);
        assert_eq!(points[1].blue, 1230.0);
    }

    #[test]
    fn test_inflation_picks_last_record() {
        let body = json!({"data": [
            {"date": "2025-04-01", "monthly_variation": 2.8, "annual_variation": 47.3},
            {"date": "2025-05-01", "monthly_variation": 1.5, "annual_variation": 43.5}
        ]});
        let snapshot = inflation(&body, Utc::now()).unwrap();
        assert_eq!(snapshot.monthly, 1.5);
        assert_eq!(snapshot.accumulated, fallback::INFLATION_ACCUMULATED);
    }

    #[test]
    fn test_inflation_history_sorted_and_labelled() {
        let body = json!({"data": [
            {"date": "2025-02-01", "monthly_variation": 2.4},
            {"date": "2025-01-01", "monthly_variation": 2.2}
        ]});
        let history = inflation_history(&body).unwrap();
        assert_eq!(history[0].month, "Ene 25");
        assert_eq!(history[1].value, 2.4);
    }

    #[test]
    fn test_riesgo_pais_derives_pct() {
        let body = json!({"data": {"date": "2025-06-02", "value": 690, "variation": -10}});
        let snapshot = riesgo_pais(&body, Utc::now()).unwrap();
        assert_eq!(snapshot.value, 690);
        assert_eq!(snapshot.variation_pct, -1.4);
    }

    #[test]
    fn test_missing_date_defaults_to_now() {
        let now = Utc::now();
        let body = json!({"unemployment_rate": 7.9});
        let snapshot = labor_market(&body, now).unwrap();
        assert_eq!(snapshot.date, now);
        assert_eq!(snapshot.employment, fallback::EMPLOYMENT);
    }

    #[test]
    fn test_calendar_error_body_is_parse_error() {
        let err = calendar(&json!({"success": false, "error": "Invalid API key"})).unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("Invalid API key"));
        assert!(calendar(&json!({"success": false})).is_err());
        assert!(calendar(&json!({"message": "maintenance"})).is_err());

        assert!(calendar(&json!({"success": true, "data": []})).unwrap().is_empty());
        assert!(calendar(&json!({"results": []})).unwrap().is_empty());
        assert!(calendar(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_error_body_fails_latest_record() {
        let body = json!({"success": false, "error": "rate limited", "monthly_variation": 2.0});
        assert_eq!(inflation(&body, Utc::now()).unwrap_err().kind(), "parse");
        assert!(upstream_error(&json!({"success": true, "error": null})).is_none());
        assert_eq!(
            upstream_error(&json!({"error": {"code": 401}})).as_deref(),
            Some(r#"{"code":401}"#)
        );
    }

    #[test]
    fn test_emae_sectors_skips_unnamed() {
        let body = json!({"data": [
            {"sector": "Pesca", "annual_variation": -1.5, "index_value": 98.7},
            {"annual_variation": 1.0}
        ]});
        assert_eq!(emae_sectors(&body).unwrap().len(), 1);
        assert!(emae_sectors(&json!({"data": []})).is_err());
    }

    #[test]
    fn test_calendar_computes_weekday() {
        let body = json!({"data": [{"date": "2026-10-19", "indicator": "IPC"}]});
        let events = calendar(&body).unwrap();
        assert_eq!(events[0].day_week, "Lunes");
        assert_eq!(events[0].source, "INDEC");
        assert!(calendar(&json!(null)).is_err());
    }

    #[test]
    fn test_budget_alternate_names() {
        let body = json!({"credito_vigente": 200.0, "devengado": 50.0});
        let snapshot = budget(&body, 2026).unwrap();
        assert_eq!(snapshot.percentage, 25.0);
    }
}
