use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Measurements used as source for metrics generation.
    #[serde(default)]
    pub measurements: Vec<MeasurementConfig>,
    /// Bucket overrides for the per-protocol RTT histograms.
    #[serde(default)]
    pub histogram_buckets: HistogramBuckets,
    /// Drop results a validator rejects (default: true).
    #[serde(default = "default_filter_invalid_results")]
    pub filter_invalid_results: bool,
}

fn default_filter_invalid_results() -> bool {
    true
}

/// Configuration for one measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    pub id: String,
    /// Idle timeout for the streaming subscription in seconds; the global
    /// default applies when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Buckets for the RTT histograms of the protocols that have one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramBuckets {
    #[serde(default)]
    pub ping: RttBuckets,
    #[serde(default)]
    pub dns: RttBuckets,
    #[serde(default)]
    pub http: RttBuckets,
    #[serde(default)]
    pub traceroute: RttBuckets,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RttBuckets {
    #[serde(default)]
    pub rtt: Option<Vec<f64>>,
}

impl Config {
    /// Ids of all configured measurements.
    pub fn measurement_ids(&self) -> Vec<String> {
        self.measurements.iter().map(|m| m.id.clone()).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            measurements: Vec::new(),
            histogram_buckets: HistogramBuckets::default(),
            filter_invalid_results: true,
        }
    }
}
