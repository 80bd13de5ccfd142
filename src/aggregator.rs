//! Concurrent fan-out over the indicator endpoints with per-call deadlines
//! and fallback substitution.
//!
//! Every indicator is fetched concurrently and raced against the same
//! deadline. All calls settle; a failure never short-circuits the others. A
//! call that loses the race is dropped, which aborts its HTTP request.

use crate::argenstats_client::ArgenStatsClient;
use crate::errors::FetchError;
use crate::fallback;
use crate::models::*;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;

/// Races `fut` against `deadline`, mapping expiry to [`FetchError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            after_ms: deadline.as_millis() as u64,
        }),
    }
}

#[derive(Clone)]
pub struct Aggregator {
    client: ArgenStatsClient,
    deadline: Duration,
}

impl Aggregator {
    pub fn new(client: ArgenStatsClient, deadline: Duration) -> Self {
        Self { client, deadline }
    }

    pub fn client(&self) -> &ArgenStatsClient {
        &self.client
    }

    /// Runs one aggregation cycle over `indicators`.
    ///
    /// # Returns
    ///
    /// * `AggregationResult` - one snapshot per indicator (upstream or
    ///   fallback), with `successful + failed == indicators.len()`.
    pub async fn aggregate(&self, indicators: &[Indicator]) -> AggregationResult {
        let now = Utc::now();
        tracing::info!(
            "📊 Aggregating {} indicators (deadline {}ms)",
            indicators.len(),
            self.deadline.as_millis()
        );

        let outcomes = join_all(indicators.iter().map(|&indicator| async move {
            let outcome = with_deadline(self.deadline, self.client.fetch(indicator, now)).await;
            (indicator, outcome)
        }))
        .await;

        let mut result = AggregationResult::default();
        for (indicator, outcome) in outcomes {
            settle(&mut result, indicator, outcome, now);
        }

        if result.failed > 0 {
            tracing::warn!(
                "⚠️ Aggregation finished with {} of {} indicators on fallback data",
                result.failed,
                result.attempted()
            );
        } else {
            tracing::info!("✅ All {} indicators fetched", result.successful);
        }

        result
    }

    /// Aggregates the full dashboard indicator set.
    pub async fn dashboard(&self) -> DashboardResponse {
        let result = self.aggregate(&Indicator::ALL).await;
        DashboardResponse::from_aggregation(result, Utc::now(), self.client.has_api_key())
    }
}

/// Folds one settled call into `result`, substituting fallback data on error.
pub fn settle(
    result: &mut AggregationResult,
    indicator: Indicator,
    outcome: Result<IndicatorSnapshot, FetchError>,
    now: DateTime<Utc>,
) {
    let key = indicator.key().to_string();
    match outcome {
        Ok(snapshot) => {
            result.successful += 1;
            result.api_status.insert(key.clone(), "success".to_string());
            result
                .sources
                .insert(key, format!("ArgenStats API - {}", indicator.label()));
            result.insert(snapshot);
        }
        Err(e) => {
            tracing::warn!(
                indicator = indicator.key(),
                kind = e.kind(),
                "Upstream fetch failed, using fallback: {}",
                e
            );
            result.failed += 1;
            result
                .api_status
                .insert(key.clone(), format!("fallback: {}", e.kind()));
            result.sources.insert(key, "Fallback data".to_string());
            result.errors.push(format!("{}: {}", indicator.key(), e));
            result.insert(fallback::snapshot(indicator, now));
        }
    }
}
