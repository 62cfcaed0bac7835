//! Aggregation and export of measurement results.
//!
//! One [`Measurement`] accumulates enriched results for one measurement id
//! and answers the describe/collect pull contract of a metrics scraper. The
//! protocol-specific parts plug in through the three capability traits:
//! [`MetricExporter`] turns latest results into metric families,
//! [`ResultValidator`] filters results before they are folded in, and
//! [`Histogram`] observes every accepted result.

pub mod histogram;
pub mod measurement;
pub mod registry;
pub mod validator;

pub use histogram::RttHistogram;
pub use measurement::Measurement;
pub use registry::{ExporterRegistry, MeasurementFactory, UnsupportedType};
pub use validator::DefaultResultValidator;

use prometheus::core::Desc;
use prometheus::proto::MetricFamily;

use crate::measurement::MeasurementResult;
use crate::probe::Probe;

/// Set of metrics for one measurement type.
pub trait MetricExporter: Send + Sync {
    /// Descriptors of every metric this exporter can emit.
    fn describe(&self) -> Vec<Desc>;

    /// Clears all series recorded since the last collection cycle.
    fn reset(&self);

    /// Records the metrics of one result, labeled with its probe metadata.
    fn export(&self, res: &MeasurementResult, probe: &Probe);

    /// Gathers the families recorded since the last `reset`.
    fn collect(&self) -> Vec<MetricFamily>;
}

/// Validates results before they are folded into a measurement.
pub trait ResultValidator: Send + Sync {
    fn is_valid(&self, res: &MeasurementResult, probe: &Probe) -> bool;
}

/// State of a single histogram of a measurement.
pub trait Histogram: Send + Sync {
    fn process_result(&self, res: &MeasurementResult);
    fn hist(&self) -> &prometheus::Histogram;
}
