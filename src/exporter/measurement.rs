use std::collections::HashMap;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

use super::{Histogram, MetricExporter, ResultValidator};
use crate::measurement::MeasurementResult;
use crate::probe::Probe;

/// Accumulates enriched results for one measurement id and converts them to
/// metrics on demand.
///
/// `latest` keeps the most recent valid result per probe; `probes` is kept
/// in lockstep under the same lock. Histograms observe every accepted
/// result independently of `latest`.
pub struct Measurement {
    exporter: Box<dyn MetricExporter>,
    histograms: Vec<Box<dyn Histogram>>,
    validator: Option<Box<dyn ResultValidator>>,
    state: RwLock<State>,
}

impl std::fmt::Debug for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Measurement")
            .field("histograms", &self.histograms.len())
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct State {
    latest: HashMap<i64, MeasurementResult>,
    probes: HashMap<i64, Probe>,
}

impl Measurement {
    pub fn new(exporter: Box<dyn MetricExporter>) -> Self {
        Self {
            exporter,
            histograms: Vec::new(),
            validator: None,
            state: RwLock::new(State::default()),
        }
    }

    /// Adds histograms fed by every accepted result.
    pub fn with_histograms(mut self, histograms: Vec<Box<dyn Histogram>>) -> Self {
        self.histograms.extend(histograms);
        self
    }

    /// Sets a validator deciding which results are folded in.
    pub fn with_validator(mut self, validator: Box<dyn ResultValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Folds one result into the measurement. A result rejected by the
    /// validator is dropped silently; otherwise it becomes the latest result
    /// for its probe and is fed to every histogram in configuration order.
    pub fn add(&self, result: MeasurementResult, probe: Probe) {
        if let Some(validator) = &self.validator {
            if !validator.is_valid(&result, &probe) {
                return;
            }
        }

        for histogram in &self.histograms {
            histogram.process_result(&result);
        }

        let mut state = self.state.write();
        let prb_id = result.prb_id();
        state.latest.insert(prb_id, result);
        state.probes.insert(prb_id, probe);
    }

    /// Descriptors of all metrics: the exporter's followed by each
    /// histogram's, in configuration order.
    pub fn describe(&self) -> Vec<Desc> {
        let mut descs = self.exporter.describe();
        for histogram in &self.histograms {
            descs.extend(histogram.hist().desc().into_iter().cloned());
        }
        descs
    }

    /// Exports one set of metrics per probe currently in `latest`, followed
    /// by each histogram's snapshot. Iteration order over probes is
    /// unspecified.
    pub fn collect(&self) -> Vec<MetricFamily> {
        let state = self.state.read();

        self.exporter.reset();
        for (prb_id, result) in &state.latest {
            if let Some(probe) = state.probes.get(prb_id) {
                self.exporter.export(result, probe);
            }
        }

        let mut families = self.exporter.collect();
        for histogram in &self.histograms {
            families.extend(histogram.hist().collect());
        }
        families
    }
}
