//! Documented fallback values substituted when an upstream call fails.
//!
//! Snapshots are built from fixed constants so that a fallback response is
//! predictable. Historical series are synthetic and carry bounded random
//! perturbation; they are display filler, not data of record.

use crate::format::{month_period, short_month_label, weekday_es};
use crate::models::*;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rand::Rng;

// Exchange rates (ARS per USD)
pub const OFICIAL: f64 = 1290.0;
pub const BLUE: f64 = 1325.0;
pub const MEP: f64 = 1310.0;
pub const CCL: f64 = 1320.0;
pub const TARJETA: f64 = 1677.0;

/// Typical blue/official gap used when only the official rate is known.
pub const BLUE_GAP: f64 = 1.45;

// IPC (percent)
pub const INFLATION_MONTHLY: f64 = 2.2;
pub const INFLATION_ANNUAL: f64 = 84.5;
pub const INFLATION_ACCUMULATED: f64 = 15.1;
pub const INFLATION_INDEX: f64 = 8855.57;

// EMAE
pub const EMAE_MONTHLY: f64 = -0.07;
pub const EMAE_ANNUAL: f64 = 4.98;
pub const EMAE_INDEX: f64 = 164.58;

// Riesgo país (basis points)
pub const RIESGO_PAIS_VALUE: i64 = 850;
pub const RIESGO_PAIS_VARIATION: f64 = -15.0;
pub const RIESGO_PAIS_VARIATION_PCT: f64 = -1.7;

// Labor market (percent)
pub const UNEMPLOYMENT: f64 = 5.2;
pub const EMPLOYMENT: f64 = 42.8;
pub const ACTIVITY: f64 = 45.1;

// Poverty
pub const POVERTY_RATE: f64 = 41.7;
pub const INDIGENCE_RATE: f64 = 11.9;
pub const POVERTY_POPULATION: u64 = 19_500_000;
pub const INDIGENCE_POPULATION: u64 = 5_600_000;
pub const POVERTY_PERIOD: &str = "Primer semestre 2024";

// BCRA
pub const INTEREST_RATE: f64 = 35.0;

// Budget (ARS)
pub const BUDGET_TOTAL: f64 = 50_000_000_000_000.0;
pub const BUDGET_EXECUTED_SHARE: f64 = 0.65;

/// Budget areas and their share of executed/total.
pub const BUDGET_AREAS: [(&str, f64); 5] = [
    ("Salud", 0.25),
    ("Educación", 0.20),
    ("Seguridad", 0.15),
    ("Infraestructura", 0.20),
    ("Otros", 0.20),
];

/// Monthly IPC variation published by INDEC for 2024: (label, value, month end).
pub const REFERENCE_INFLATION: [(&str, f64, &str); 12] = [
    ("Ene 24", 20.6, "2024-01-31"),
    ("Feb 24", 13.2, "2024-02-29"),
    ("Mar 24", 11.0, "2024-03-31"),
    ("Abr 24", 8.8, "2024-04-30"),
    ("May 24", 4.2, "2024-05-31"),
    ("Jun 24", 4.6, "2024-06-30"),
    ("Jul 24", 4.0, "2024-07-31"),
    ("Ago 24", 4.2, "2024-08-31"),
    ("Sep 24", 3.5, "2024-09-30"),
    ("Oct 24", 2.7, "2024-10-31"),
    ("Nov 24", 2.4, "2024-11-30"),
    ("Dic 24", 2.5, "2024-12-31"),
];

const EMAE_SECTORS: [(&str, f64, f64); 14] = [
    ("Agricultura, ganadería, caza y silvicultura", 2.1, 142.3),
    ("Pesca", -1.5, 98.7),
    ("Explotación de minas y canteras", 5.2, 156.8),
    ("Industria manufacturera", 3.8, 187.4),
    ("Electricidad, gas y agua", 1.9, 134.6),
    ("Construcción", -2.3, 78.9),
    ("Comercio mayorista, minorista y reparaciones", 4.1, 165.2),
    ("Hoteles y restaurantes", 6.7, 201.3),
    ("Transporte, almacenamiento y comunicaciones", 2.8, 149.1),
    ("Intermediación financiera", 8.9, 223.7),
    ("Actividades inmobiliarias, empresariales y de alquiler", 3.5, 172.8),
    ("Administración pública y defensa", 1.2, 128.4),
    ("Enseñanza", 0.8, 115.9),
    ("Servicios sociales y de salud", 2.4, 138.7),
];

pub fn exchange_rates(now: DateTime<Utc>) -> ExchangeRateSnapshot {
    ExchangeRateSnapshot {
        oficial: OFICIAL,
        blue: BLUE,
        mep: MEP,
        ccl: CCL,
        tarjeta: TARJETA,
        date: now,
    }
}

pub fn inflation(now: DateTime<Utc>) -> InflationSnapshot {
    InflationSnapshot {
        monthly: INFLATION_MONTHLY,
        annual: INFLATION_ANNUAL,
        accumulated: INFLATION_ACCUMULATED,
        index: INFLATION_INDEX,
        date: now,
    }
}

pub fn emae(now: DateTime<Utc>) -> ActivityIndexSnapshot {
    ActivityIndexSnapshot {
        monthly: EMAE_MONTHLY,
        annual: EMAE_ANNUAL,
        index: EMAE_INDEX,
        date: now,
    }
}

pub fn riesgo_pais(now: DateTime<Utc>) -> CountryRiskSnapshot {
    CountryRiskSnapshot {
        value: RIESGO_PAIS_VALUE,
        variation: RIESGO_PAIS_VARIATION,
        variation_pct: RIESGO_PAIS_VARIATION_PCT,
        date: now,
    }
}

pub fn labor_market(now: DateTime<Utc>) -> LaborMarketSnapshot {
    LaborMarketSnapshot {
        unemployment: UNEMPLOYMENT,
        employment: EMPLOYMENT,
        activity: ACTIVITY,
        date: now,
    }
}

pub fn poverty(now: DateTime<Utc>) -> PovertySnapshot {
    PovertySnapshot {
        poverty_rate: POVERTY_RATE,
        indigence_rate: INDIGENCE_RATE,
        poverty_population: POVERTY_POPULATION,
        indigence_population: INDIGENCE_POPULATION,
        period: POVERTY_PERIOD.to_string(),
        date: now,
    }
}

/// Next two INDEC releases: IPC in three days, EMAE in a week.
pub fn calendar(now: DateTime<Utc>) -> Vec<CalendarEvent> {
    let today = now.date_naive();
    let release = |days: i64, indicator: &str, months_back: u32| {
        let date = now + Duration::days(days);
        let period = today
            .checked_sub_months(Months::new(months_back))
            .unwrap_or(today);
        CalendarEvent {
            date: date.to_rfc3339(),
            day_week: weekday_es(date.date_naive()).to_string(),
            indicator: indicator.to_string(),
            period: month_period(period),
            source: "INDEC".to_string(),
        }
    };

    vec![
        release(3, "IPC - Índice de Precios al Consumidor", 1),
        release(7, "EMAE - Estimador Mensual de Actividad Económica", 2),
    ]
}

pub fn emae_sectors() -> Vec<EmaeSector> {
    EMAE_SECTORS
        .iter()
        .map(|(sector, annual_variation, index_value)| EmaeSector {
            sector: sector.to_string(),
            annual_variation: *annual_variation,
            index_value: *index_value,
        })
        .collect()
}

/// Fallback snapshot for any indicator.
pub fn snapshot(indicator: Indicator, now: DateTime<Utc>) -> IndicatorSnapshot {
    match indicator {
        Indicator::Dollar => IndicatorSnapshot::Dollar(exchange_rates(now)),
        Indicator::Inflation => IndicatorSnapshot::Inflation(inflation(now)),
        Indicator::Emae => IndicatorSnapshot::Emae(emae(now)),
        Indicator::RiesgoPais => IndicatorSnapshot::RiesgoPais(riesgo_pais(now)),
        Indicator::LaborMarket => IndicatorSnapshot::LaborMarket(labor_market(now)),
        Indicator::Poverty => IndicatorSnapshot::Poverty(poverty(now)),
        Indicator::Calendar => IndicatorSnapshot::Calendar(calendar(now)),
        Indicator::EmaeSectors => IndicatorSnapshot::EmaeSectors(emae_sectors()),
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Blue rate drawn from the usual 40-50% gap over `oficial`.
pub fn random_blue<R: Rng>(oficial: f64, rng: &mut R) -> f64 {
    oficial * rng.gen_range(1.40..1.50)
}

/// Synthetic daily series of `days` points ending on `today`.
///
/// The official rate drifts up half a peso per day with ±7.5 pesos of daily
/// noise around [`OFICIAL`]; blue always sits 40-50% above it.
pub fn dollar_history(days: usize, today: NaiveDate) -> Vec<DollarHistoryPoint> {
    let mut rng = rand::thread_rng();
    (0..days)
        .map(|offset| {
            let days_back = (days - 1 - offset) as i64;
            let date = today - Duration::days(days_back);
            let trend = days_back as f64 * 0.5;
            let volatility = rng.gen_range(-7.5..7.5);
            let oficial = OFICIAL - trend + volatility;
            let blue = random_blue(oficial, &mut rng);
            DollarHistoryPoint {
                date: date.format("%Y-%m-%d").to_string(),
                oficial: round_cents(oficial),
                blue: round_cents(blue),
            }
        })
        .collect()
}

/// Completes a sparse real series to `days` daily points ending on `today`.
///
/// Dates with a real observation keep it; missing dates are interpolated
/// around the latest real official rate (±10 pesos) with the typical gap.
pub fn fill_dollar_history(
    real: &[DollarHistoryPoint],
    days: usize,
    today: NaiveDate,
) -> Vec<DollarHistoryPoint> {
    let base = real.last().map(|p| p.oficial).unwrap_or(OFICIAL);
    let mut rng = rand::thread_rng();

    (0..days)
        .map(|offset| {
            let date = today - Duration::days((days - 1 - offset) as i64);
            let key = date.format("%Y-%m-%d").to_string();
            if let Some(existing) = real.iter().find(|p| p.date == key) {
                return existing.clone();
            }
            let oficial = base + rng.gen_range(-10.0..10.0);
            DollarHistoryPoint {
                date: key,
                oficial: round_cents(oficial),
                blue: round_cents(oficial * BLUE_GAP),
            }
        })
        .collect()
}

/// Last `months` entries of the INDEC reference series, chronological.
pub fn inflation_history(months: usize) -> Vec<InflationHistoryPoint> {
    let take = months.min(REFERENCE_INFLATION.len());
    REFERENCE_INFLATION[REFERENCE_INFLATION.len() - take..]
        .iter()
        .map(|(month, value, date)| InflationHistoryPoint {
            month: month.to_string(),
            value: *value,
            date: Some(date.to_string()),
        })
        .collect()
}

/// Extends a monthly series to `target` points with a small random walk.
pub fn pad_inflation_history(
    mut points: Vec<InflationHistoryPoint>,
    target: usize,
) -> Vec<InflationHistoryPoint> {
    let mut rng = rand::thread_rng();
    while points.len() < target {
        let last = points.last().map(|p| p.value).unwrap_or(2.5);
        let value = (last + rng.gen_range(-0.5..0.5)).max(0.0);
        points.push(InflationHistoryPoint {
            month: format!("Mes {}", points.len() + 1),
            value: round_cents(value),
            date: None,
        });
    }
    points
}

pub fn budget(year: i32) -> BudgetSnapshot {
    let executed = BUDGET_TOTAL * BUDGET_EXECUTED_SHARE;
    BudgetSnapshot {
        executed,
        total: BUDGET_TOTAL,
        percentage: BUDGET_EXECUTED_SHARE * 100.0,
        year,
    }
}

/// Splits executed/total across the fixed area shares.
pub fn budget_areas(budget: &BudgetSnapshot) -> Vec<BudgetArea> {
    BUDGET_AREAS
        .iter()
        .map(|(name, share)| BudgetArea {
            name: name.to_string(),
            executed: budget.executed * share,
            total: budget.total * share,
        })
        .collect()
}

/// Short label for a month-end date string, falling back to the raw string.
pub fn month_label(date: &str) -> String {
    parse_day(date)
        .map(short_month_label)
        .unwrap_or_else(|| date.to_string())
}

/// Parses the leading `YYYY-MM-DD` of an ISO date or timestamp.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// Current year, used as default `year` query parameter.
pub fn current_year(now: DateTime<Utc>) -> i32 {
    now.year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_exchange_constants() {
        let snapshot = exchange_rates(Utc::now());
        assert_eq!(snapshot.oficial, 1290.0);
        assert_eq!(snapshot.blue, 1325.0);
        assert!(snapshot.oficial < snapshot.blue);
    }

    #[test]
    fn test_snapshot_matches_indicator() {
        let now = Utc::now();
        for indicator in Indicator::ALL {
            assert_eq!(snapshot(indicator, now).indicator(), indicator);
        }
    }

    #[test]
    fn test_dollar_history_length_and_order() {
        let history = dollar_history(30, today());
        assert_eq!(history.len(), 30);
        assert_eq!(history.last().unwrap().date, "2026-10-19");
        assert_eq!(history.first().unwrap().date, "2026-09-20");
        for point in &history {
            assert!(point.oficial < point.blue);
            assert!(parse_day(&point.date).is_some());
        }
    }

    #[test]
    fn test_dollar_history_zero_days() {
        assert!(dollar_history(0, today()).is_empty());
    }

    #[test]
    fn test_fill_dollar_history_keeps_real_points() {
        let real = vec![DollarHistoryPoint {
            date: "2026-10-18".to_string(),
            oficial: 1300.0,
            blue: 1400.0,
        }];
        let filled = fill_dollar_history(&real, 30, today());
        assert_eq!(filled.len(), 30);
        let kept = filled.iter().find(|p| p.date == "2026-10-18").unwrap();
        assert_eq!(kept.blue, 1400.0);
    }

    #[test]
    fn test_inflation_history_last_months() {
        let history = inflation_history(6);
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![4.0, 4.2, 3.5, 2.7, 2.4, 2.5]);
        assert_eq!(history[0].month, "Jul 24");
        assert_eq!(inflation_history(40).len(), 12);
    }

    #[test]
    fn test_reference_labels_match_dates() {
        for (label, _, date) in REFERENCE_INFLATION {
            assert_eq!(month_label(date), label);
        }
    }

    #[test]
    fn test_pad_inflation_history() {
        let padded = pad_inflation_history(inflation_history(3), 12);
        assert_eq!(padded.len(), 12);
        assert_eq!(padded[3].month, "Mes 4");
        assert!(padded.iter().all(|p| p.value >= 0.0));
    }

    #[test]
    fn test_budget_areas_sum_to_total() {
        let budget = budget(2026);
        assert_eq!(budget.percentage, 65.0);
        let areas = budget_areas(&budget);
        let total: f64 = areas.iter().map(|a| a.total).sum();
        assert!((total - budget.total).abs() < 1.0);
    }

    #[test]
    fn test_calendar_upcoming() {
        let now = Utc::now();
        let events = calendar(now);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.source == "INDEC"));
    }
}
