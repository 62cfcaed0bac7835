use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::worker::StreamWorker;
use super::{Strategy, StrategyError};
use crate::client::ResultSource;
use crate::config::Config;
use crate::exporter::{ExporterRegistry, Measurement};
use crate::measurement::MeasurementResult;
use crate::probe::ProbeResolver;

type MeasurementMap = Arc<Mutex<HashMap<String, Arc<Measurement>>>>;

const RESULT_CHANNEL_CAPACITY: usize = 64;
const RESET_CHANNEL_CAPACITY: usize = 16;

/// Strategy folding long-lived result subscriptions into persistent
/// per-measurement aggregators.
///
/// One [`StreamWorker`] per configured measurement feeds a shared results
/// channel; a single background fold loop is the only writer of the
/// measurements map. Snapshot queries never touch the network.
pub struct StreamingStrategy {
    measurements: MeasurementMap,
}

impl StreamingStrategy {
    pub fn new(
        cancel: &CancellationToken,
        cfg: Arc<Config>,
        source: Arc<dyn ResultSource>,
        resolver: Arc<ProbeResolver>,
        registry: Arc<ExporterRegistry>,
        default_timeout: Duration,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let (reset_tx, reset_rx) = mpsc::channel(RESET_CHANNEL_CAPACITY);

        for m in &cfg.measurements {
            let worker = StreamWorker {
                id: m.id.clone(),
                idle_timeout: m
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(default_timeout),
                source: source.clone(),
                result_tx: result_tx.clone(),
                reset_tx: reset_tx.clone(),
            };
            tokio::spawn(worker.run(cancel.clone()));
        }

        let measurements: MeasurementMap = Arc::new(Mutex::new(HashMap::new()));
        let fold = FoldLoop {
            measurements: measurements.clone(),
            resolver,
            registry,
            cfg,
        };
        tokio::spawn(fold.run(result_rx, reset_rx, cancel.clone()));

        Self { measurements }
    }
}

/// Single consumer of the shared result and reset channels, and sole
/// writer of the measurements map.
struct FoldLoop {
    measurements: MeasurementMap,
    resolver: Arc<ProbeResolver>,
    registry: Arc<ExporterRegistry>,
    cfg: Arc<Config>,
}

impl FoldLoop {
    async fn run(
        self,
        mut result_rx: mpsc::Receiver<MeasurementResult>,
        mut reset_rx: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                Some(id) = reset_rx.recv() => {
                    info!(measurement = %id, "dropping accumulated state after reconnect");
                    self.measurements.lock().remove(&id);
                }
                Some(result) = result_rx.recv() => self.fold(result).await,
            }
        }
    }

    async fn fold(&self, result: MeasurementResult) {
        debug!(
            measurement = result.msm_id(),
            probe = result.prb_id(),
            "got result"
        );

        // resolve before taking the map lock, no I/O under the lock
        let probe = match self.resolver.resolve(result.prb_id()).await {
            Ok(probe) => probe,
            Err(err) => {
                warn!(%err, "dropping result without probe metadata");
                return;
            }
        };

        let id = result.msm_id().to_string();
        let measurement = {
            let mut measurements = self.measurements.lock();
            match measurements.get(&id) {
                Some(measurement) => measurement.clone(),
                None => {
                    let measurement =
                        match self
                            .registry
                            .create(result.type_tag(), &id, result.af(), &self.cfg)
                        {
                            Ok(measurement) => Arc::new(measurement),
                            Err(err) => {
                                warn!(measurement = %id, %err, "dropping result");
                                return;
                            }
                        };
                    measurements.insert(id.clone(), measurement.clone());
                    measurement
                }
            }
        };

        measurement.add(result, probe);
    }
}

#[async_trait]
impl Strategy for StreamingStrategy {
    /// Non-blocking snapshot of the current per-measurement state. Ids
    /// without accumulated state are omitted; never fails.
    async fn measurement_results(
        &self,
        _cancel: &CancellationToken,
        ids: &[String],
    ) -> Result<Vec<Arc<Measurement>>, StrategyError> {
        let measurements = self.measurements.lock();
        Ok(ids
            .iter()
            .filter_map(|id| measurements.get(id).cloned())
            .collect())
    }
}
