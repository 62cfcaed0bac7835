use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{Strategy, StrategyError};
use crate::client::ResultSource;
use crate::config::Config;
use crate::exporter::{ExporterRegistry, Measurement};
use crate::probe::ProbeResolver;

/// Strategy fetching the latest result set of every requested measurement
/// on demand.
pub struct RequestStrategy {
    source: Arc<dyn ResultSource>,
    resolver: Arc<ProbeResolver>,
    registry: Arc<ExporterRegistry>,
    cfg: Arc<Config>,
}

impl RequestStrategy {
    pub fn new(
        source: Arc<dyn ResultSource>,
        resolver: Arc<ProbeResolver>,
        registry: Arc<ExporterRegistry>,
        cfg: Arc<Config>,
    ) -> Self {
        Self {
            source,
            resolver,
            registry,
            cfg,
        }
    }

    /// Builds the aggregated measurement for one id. Any failure or an
    /// empty result set drops the id from the batch, it never fails the
    /// batch itself.
    async fn measurement_for_id(
        source: Arc<dyn ResultSource>,
        resolver: Arc<ProbeResolver>,
        registry: Arc<ExporterRegistry>,
        cfg: Arc<Config>,
        id: String,
    ) -> Option<Measurement> {
        let results = match source.latest(&id).await {
            Ok(results) => results,
            Err(err) => {
                warn!(measurement = %id, %err, "could not retrieve measurement results");
                return None;
            }
        };

        let first = results.first()?;
        let measurement = match registry.create(first.type_tag(), &id, first.af(), &cfg) {
            Ok(measurement) => measurement,
            Err(err) => {
                warn!(measurement = %id, %err, "skipping measurement");
                return None;
            }
        };

        let probes = match resolver.resolve_all(&results).await {
            Ok(probes) => probes,
            Err(err) => {
                warn!(measurement = %id, %err, "skipping measurement");
                return None;
            }
        };

        for result in results {
            if let Some(probe) = probes.get(&result.prb_id()) {
                measurement.add(result, probe.clone());
            }
        }

        Some(measurement)
    }
}

#[async_trait]
impl Strategy for RequestStrategy {
    async fn measurement_results(
        &self,
        cancel: &CancellationToken,
        ids: &[String],
    ) -> Result<Vec<Arc<Measurement>>, StrategyError> {
        let (tx, mut rx) = mpsc::channel(ids.len().max(1));

        for id in ids {
            let tx = tx.clone();
            let source = self.source.clone();
            let resolver = self.resolver.clone();
            let registry = self.registry.clone();
            let cfg = self.cfg.clone();
            let id = id.clone();

            tokio::spawn(async move {
                if let Some(measurement) =
                    Self::measurement_for_id(source, resolver, registry, cfg, id).await
                {
                    let _ = tx.send(Arc::new(measurement)).await;
                }
            });
        }
        drop(tx);

        let mut measurements = Vec::new();
        loop {
            tokio::select! {
                // per-id tasks are not cancelled, only abandoned; their
                // sends fail once the receiver is gone
                _ = cancel.cancelled() => return Err(StrategyError::Cancelled),
                received = rx.recv() => match received {
                    Some(measurement) => measurements.push(measurement),
                    None => return Ok(measurements),
                }
            }
        }
    }
}
