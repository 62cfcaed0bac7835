use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::ResultSource;
use crate::measurement::{MeasurementResult, StreamItem};

const CONNECTION_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Per-measurement subscription worker.
///
/// Opens a subscription and forwards results on the shared channel until
/// the upstream disconnects or goes quiet for longer than the idle timeout.
/// Every such drop emits a reset notification for the measurement before
/// the next subscription attempt; cancellation terminates the worker
/// without one.
pub(crate) struct StreamWorker {
    pub id: String,
    pub idle_timeout: Duration,
    pub source: Arc<dyn ResultSource>,
    pub result_tx: mpsc::Sender<MeasurementResult>,
    pub reset_tx: mpsc::Sender<String>,
}

impl StreamWorker {
    pub(crate) async fn run(self, cancel: CancellationToken) {
        loop {
            match self.source.subscribe(&self.id).await {
                Ok(rx) => {
                    info!(measurement = %self.id, "subscribed to measurement results");
                    self.listen(rx, &cancel).await;
                }
                Err(err) => {
                    warn!(measurement = %self.id, %err, "could not subscribe to measurement results");
                }
            }

            if cancel.is_cancelled() {
                return;
            }

            let _ = self.reset_tx.send(self.id.clone()).await;

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(CONNECTION_RETRY_INTERVAL) => {}
            }
        }
    }

    async fn listen(&self, mut rx: mpsc::Receiver<StreamItem>, cancel: &CancellationToken) {
        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return,
                item = timeout(self.idle_timeout, rx.recv()) => item,
            };

            match item {
                Err(_) => {
                    warn!(
                        measurement = %self.id,
                        timeout_secs = self.idle_timeout.as_secs(),
                        "idle timeout reached, reconnecting"
                    );
                    return;
                }
                Ok(None) => {
                    warn!(measurement = %self.id, "subscription channel closed, reconnecting");
                    return;
                }
                Ok(Some(Ok(result))) => {
                    if self.result_tx.send(result).await.is_err() {
                        return;
                    }
                }
                Ok(Some(Err(err))) if err.is_disconnect() => {
                    warn!(measurement = %self.id, %err, "upstream disconnected, reconnecting");
                    return;
                }
                Ok(Some(Err(err))) => {
                    warn!(measurement = %self.id, %err, "dropping unparsable result");
                }
            }
        }
    }
}
