//! HTTP client for the probe-mesh API.
//!
//! [`ResultSource`] and [`crate::probe::ProbeSource`] are the seams the
//! strategies and the resolver consume; [`ApiClient`] is the production
//! implementation of both.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::measurement::{MeasurementResult, StreamError, StreamItem};
use crate::probe::{Probe, ProbeSource};

/// Source of raw measurement results.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Fetches the current latest result set of a measurement.
    async fn latest(&self, id: &str) -> anyhow::Result<Vec<MeasurementResult>>;

    /// Opens a live subscription for a measurement. Items arrive on the
    /// returned channel until the transport disconnects.
    async fn subscribe(&self, id: &str) -> anyhow::Result<mpsc::Receiver<StreamItem>>;
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Client for the probe-mesh HTTP API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("could not build API client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ResultSource for ApiClient {
    async fn latest(&self, id: &str) -> anyhow::Result<Vec<MeasurementResult>> {
        let url = format!("{}/measurements/{}/latest", self.base_url, id);
        let results = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(results)
    }

    // no request timeout here, the subscription body is unbounded
    async fn subscribe(&self, id: &str) -> anyhow::Result<mpsc::Receiver<StreamItem>> {
        let url = format!("{}/measurements/{}/stream", self.base_url, id);
        let resp = self.http.get(&url).send().await?.error_for_status()?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(forward_stream(resp, tx));
        Ok(rx)
    }
}

#[async_trait]
impl ProbeSource for ApiClient {
    async fn probe(&self, id: i64) -> anyhow::Result<Probe> {
        let url = format!("{}/probes/{}", self.base_url, id);
        let probe = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(probe)
    }
}

/// Pumps a newline-delimited JSON response body into per-item stream
/// events. Transport errors and the end of the body surface as the
/// disconnect signal.
async fn forward_stream(resp: reqwest::Response, tx: mpsc::Sender<StreamItem>) {
    let mut body = Box::pin(resp.bytes_stream());
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = tx
                    .send(Err(StreamError::Disconnected(err.to_string())))
                    .await;
                return;
            }
        };

        buf.extend_from_slice(&bytes);
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            let Some(item) = parse_line(&line) else {
                continue;
            };
            if tx.send(item).await.is_err() {
                return;
            }
        }
    }

    debug!("result stream ended");
    let _ = tx
        .send(Err(StreamError::Disconnected(
            "stream closed by remote".to_string(),
        )))
        .await;
}

/// Parses one line of the stream; blank and non-UTF-8 lines are skipped.
fn parse_line(line: &[u8]) -> Option<StreamItem> {
    let line = std::str::from_utf8(line).ok()?.trim();
    if line.is_empty() {
        return None;
    }

    Some(serde_json::from_str(line).map_err(|err| StreamError::Parse(err.to_string())))
}
