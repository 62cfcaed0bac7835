use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use tracing::warn;

use super::NAMESPACE;
use crate::config::Config;
use crate::exporter::{DefaultResultValidator, Measurement, MetricExporter, RttHistogram};
use crate::measurement::{MeasurementResult, ResultPayload};
use crate::probe::Probe;

const SUBSYSTEM: &str = "http";

const LABELS: &[&str] = &[
    "measurement",
    "probe",
    "dst_addr",
    "asn",
    "ip_version",
    "uri",
    "method",
    "country_code",
    "lat",
    "long",
];

/// Builds the aggregator for an HTTP measurement.
pub fn measurement(id: &str, af: u8, cfg: &Config) -> Measurement {
    let rtt_hist = RttHistogram::new(
        NAMESPACE,
        SUBSYSTEM,
        "Histogram of round trip times over all HTTP requests",
        id,
        af,
        cfg.histogram_buckets.http.rtt.clone(),
        attempt_rtts,
    );

    let mut m = Measurement::new(Box::new(HttpExporter::new(id)))
        .with_histograms(vec![Box::new(rtt_hist)]);
    if cfg.filter_invalid_results {
        m = m.with_validator(Box::new(DefaultResultValidator));
    }
    m
}

fn attempt_rtts(res: &MeasurementResult) -> Vec<f64> {
    match res.payload() {
        ResultPayload::Http(http) => http.attempts.iter().map(|a| a.rt).collect(),
        _ => Vec::new(),
    }
}

struct HttpExporter {
    id: String,
    success: GaugeVec,
    result: GaugeVec,
    version: GaugeVec,
    body_size: GaugeVec,
    header_size: GaugeVec,
    rtt: GaugeVec,
    dns_error: GaugeVec,
}

fn gauge(name: &str, help: &str) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
    GaugeVec::new(opts, LABELS).expect("valid metric options")
}

impl HttpExporter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: gauge("success", "Destination was reachable"),
            result: gauge("result", "Code returned from http server"),
            version: gauge("version", "HTTP version used for the request"),
            body_size: gauge("body_size", "Body size in bytes"),
            header_size: gauge("header_size", "Header size in bytes"),
            rtt: gauge("rtt", "Round trip time in ms"),
            dns_error: gauge("dns_error", "A DNS error occurred (0 if not)"),
        }
    }

    fn vecs(&self) -> [&GaugeVec; 7] {
        [
            &self.success,
            &self.result,
            &self.version,
            &self.body_size,
            &self.header_size,
            &self.rtt,
            &self.dns_error,
        ]
    }
}

impl MetricExporter for HttpExporter {
    fn describe(&self) -> Vec<Desc> {
        self.vecs()
            .iter()
            .flat_map(|v| v.desc().into_iter().cloned())
            .collect()
    }

    fn reset(&self) {
        for vec in self.vecs() {
            vec.reset();
        }
    }

    fn export(&self, res: &MeasurementResult, probe: &Probe) {
        let ResultPayload::Http(http) = res.payload() else {
            return;
        };

        for attempt in &http.attempts {
            let af = if attempt.af > 0 { attempt.af } else { res.af() };
            let values = vec![
                self.id.clone(),
                probe.id.to_string(),
                attempt.dst_addr.clone(),
                probe.asn_for_ip_version(af).to_string(),
                af.to_string(),
                http.uri.clone(),
                attempt.method.clone(),
                probe.country_code.clone(),
                probe.latitude(),
                probe.longitude(),
            ];
            let labels: Vec<&str> = values.iter().map(String::as_str).collect();

            let version = attempt.ver.parse::<f64>().unwrap_or_else(|err| {
                warn!(version = %attempt.ver, %err, "error parsing http version");
                0.0
            });

            self.result.with_label_values(&labels).set(attempt.res as f64);
            self.version.with_label_values(&labels).set(version);
            self.body_size
                .with_label_values(&labels)
                .set(attempt.bsize as f64);
            self.header_size
                .with_label_values(&labels)
                .set(attempt.hsize as f64);
            self.dns_error
                .with_label_values(&labels)
                .set(if attempt.dnserr.is_empty() { 0.0 } else { 1.0 });

            if attempt.rt > 0.0 {
                self.success.with_label_values(&labels).set(1.0);
                self.rtt.with_label_values(&labels).set(attempt.rt);
            } else {
                self.success.with_label_values(&labels).set(0.0);
            }
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vecs().iter().flat_map(|v| v.collect()).collect()
    }
}
