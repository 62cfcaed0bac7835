use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use super::{Probe, ProbeCache, ProbeSource};
use crate::measurement::MeasurementResult;

/// Failure to resolve metadata for one probe. Fails the whole batch: a
/// measurement cannot be exported with missing probe ASN metadata.
#[derive(Debug, Error)]
#[error("could not retrieve probe information for probe {id}")]
pub struct ResolveError {
    pub id: i64,
    #[source]
    pub source: anyhow::Error,
}

/// Resolves batches of probe ids to metadata, cache-first, with a bounded
/// number of concurrent fetches.
pub struct ProbeResolver {
    cache: Arc<ProbeCache>,
    source: Arc<dyn ProbeSource>,
    workers: usize,
}

impl ProbeResolver {
    pub fn new(cache: Arc<ProbeCache>, source: Arc<dyn ProbeSource>, workers: usize) -> Self {
        Self {
            cache,
            source,
            workers: workers.max(1),
        }
    }

    /// Resolves every distinct probe id appearing in `results`, each exactly
    /// once. Returns on the first fetch error; partial results are discarded
    /// and still-running fetches are abandoned.
    pub async fn resolve_all(
        &self,
        results: &[MeasurementResult],
    ) -> Result<HashMap<i64, Probe>, ResolveError> {
        let unique: HashSet<i64> = results.iter().map(|r| r.prb_id()).collect();
        let total = unique.len();
        if total == 0 {
            return Ok(HashMap::new());
        }

        let queue = Arc::new(Mutex::new(unique.into_iter().collect::<Vec<_>>()));
        let (tx, mut rx) = mpsc::channel(self.workers);

        for _ in 0..self.workers.min(total) {
            let queue = queue.clone();
            let tx = tx.clone();
            let cache = self.cache.clone();
            let source = self.source.clone();

            tokio::spawn(async move {
                loop {
                    let id = queue.lock().pop();
                    let Some(id) = id else { break };

                    let resolved = resolve_cached(&cache, source.as_ref(), id).await;
                    if tx.send(resolved).await.is_err() {
                        // receiver already returned an error
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut probes = HashMap::with_capacity(total);
        while let Some(resolved) = rx.recv().await {
            let probe = resolved?;
            probes.insert(probe.id, probe);
        }

        Ok(probes)
    }

    /// Resolves a single probe id with the same cache-first semantics.
    pub async fn resolve(&self, id: i64) -> Result<Probe, ResolveError> {
        resolve_cached(&self.cache, self.source.as_ref(), id).await
    }
}

async fn resolve_cached(
    cache: &ProbeCache,
    source: &dyn ProbeSource,
    id: i64,
) -> Result<Probe, ResolveError> {
    if let Some(probe) = cache.get(id) {
        return Ok(probe);
    }

    let probe = source
        .probe(id)
        .await
        .map_err(|err| ResolveError { id, source: err })?;

    cache.add(id, probe.clone());
    Ok(probe)
}
