use prometheus::HistogramOpts;

use super::Histogram;
use crate::measurement::MeasurementResult;

const DEFAULT_BUCKETS: &[f64] = &[10.0, 20.0, 50.0, 100.0];

/// Round-trip-time histogram shared by the protocol exporters. Each
/// protocol supplies a function extracting the RTT samples of a result;
/// non-positive samples are skipped.
pub struct RttHistogram {
    rtt: prometheus::Histogram,
    extract: fn(&MeasurementResult) -> Vec<f64>,
}

impl RttHistogram {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        help: &str,
        id: &str,
        af: u8,
        buckets: Option<Vec<f64>>,
        extract: fn(&MeasurementResult) -> Vec<f64>,
    ) -> Self {
        let buckets = buckets.unwrap_or_else(|| DEFAULT_BUCKETS.to_vec());
        let opts = HistogramOpts::new("rtt_hist", help)
            .namespace(namespace)
            .subsystem(subsystem)
            .buckets(buckets)
            .const_label("measurement", id)
            .const_label("ip_version", af.to_string());

        Self {
            rtt: prometheus::Histogram::with_opts(opts).expect("valid histogram options"),
            extract,
        }
    }
}

impl Histogram for RttHistogram {
    fn process_result(&self, res: &MeasurementResult) {
        for rtt in (self.extract)(res) {
            if rtt > 0.0 {
                self.rtt.observe(rtt);
            }
        }
    }

    fn hist(&self) -> &prometheus::Histogram {
        &self.rtt
    }
}
