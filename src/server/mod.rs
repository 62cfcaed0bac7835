//! Metrics and health endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::strategy::{Strategy, StrategyError};

#[derive(Clone)]
pub struct AppState {
    pub strategy: Arc<dyn Strategy>,
    pub cfg: Arc<Config>,
    pub scrape_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/health", get(handle_health))
        .with_state(state)
}

#[derive(Deserialize)]
struct MetricsParams {
    measurement_id: Option<String>,
}

async fn handle_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsParams>,
) -> Response {
    // explicit ids win over the configured measurement list
    let ids: Vec<String> = match params.measurement_id {
        Some(raw) => raw
            .split(',')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
        None => state.cfg.measurement_ids(),
    };

    if ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "parameter measurement_id has to be defined",
        )
            .into_response();
    }

    let cancel = CancellationToken::new();
    let result = tokio::select! {
        result = state.strategy.measurement_results(&cancel, &ids) => result,
        _ = tokio::time::sleep(state.scrape_timeout) => {
            cancel.cancel();
            Err(StrategyError::Cancelled)
        }
    };

    let measurements = match result {
        Ok(measurements) => measurements,
        Err(err) => {
            warn!(%err, "scrape failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let families = merge_families(measurements.iter().flat_map(|m| m.collect()).collect());

    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buf) {
        warn!(%err, "could not encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    ([(CONTENT_TYPE, encoder.format_type().to_string())], buf).into_response()
}

/// Merges families with the same name so every family appears once in the
/// exposition, regardless of how many measurements contributed to it.
fn merge_families(families: Vec<MetricFamily>) -> Vec<MetricFamily> {
    let mut merged: Vec<MetricFamily> = Vec::with_capacity(families.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut family in families {
        match index.get(family.get_name()) {
            Some(&at) => {
                for metric in family.take_metric().into_iter() {
                    merged[at].mut_metric().push(metric);
                }
            }
            None => {
                index.insert(family.get_name().to_string(), merged.len());
                merged.push(family);
            }
        }
    }

    merged
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    service: &'static str,
}

async fn handle_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: "probewatch",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;
    use prometheus::{GaugeVec, Opts};

    fn family(name: &str, label: &str) -> MetricFamily {
        let vec = GaugeVec::new(Opts::new(name, "help"), &["probe"]).unwrap();
        vec.with_label_values(&[label]).set(1.0);
        vec.collect().remove(0)
    }

    #[test]
    fn families_with_the_same_name_are_merged() {
        let families = vec![
            family("probewatch_ping_success", "1"),
            family("probewatch_ping_sent", "1"),
            family("probewatch_ping_success", "2"),
        ];

        let merged = merge_families(families);
        assert_eq!(merged.len(), 2);

        let success = merged
            .iter()
            .find(|f| f.get_name() == "probewatch_ping_success")
            .unwrap();
        assert_eq!(success.get_metric().len(), 2);
    }

    #[test]
    fn merge_preserves_first_seen_order() {
        let families = vec![family("b_metric", "1"), family("a_metric", "1")];
        let merged = merge_families(families);

        assert_eq!(merged[0].get_name(), "b_metric");
        assert_eq!(merged[1].get_name(), "a_metric");
    }
}
