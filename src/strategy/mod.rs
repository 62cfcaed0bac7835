//! Acquisition strategies.
//!
//! A [`Strategy`] turns a list of measurement ids into aggregated,
//! probe-enriched measurements: either by fetching the latest result sets
//! on demand ([`RequestStrategy`]) or by folding long-lived result
//! subscriptions in the background ([`StreamingStrategy`]).

pub mod request;
pub mod stream;
mod worker;

pub use request::RequestStrategy;
pub use stream::StreamingStrategy;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::exporter::Measurement;

#[derive(Debug, Error)]
pub enum StrategyError {
    /// The whole batch call was cancelled before completion. Failures of
    /// individual measurements are logged and skipped, never propagated.
    #[error("measurement retrieval cancelled")]
    Cancelled,
}

/// A strategy to retrieve data for generating metrics.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Gets aggregated results for a list of measurement ids. Ids without
    /// data are omitted from the output; order is unspecified.
    async fn measurement_results(
        &self,
        cancel: &CancellationToken,
        ids: &[String],
    ) -> Result<Vec<Arc<Measurement>>, StrategyError>;
}
