use async_trait::async_trait;

use super::Probe;

/// Source of raw probe metadata, typically the mesh API.
#[async_trait]
pub trait ProbeSource: Send + Sync {
    /// Fetches metadata for a single probe.
    async fn probe(&self, id: i64) -> anyhow::Result<Probe>;
}
