use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use super::NAMESPACE;
use crate::config::Config;
use crate::exporter::{DefaultResultValidator, Measurement, MetricExporter, RttHistogram};
use crate::measurement::{MeasurementResult, ResultPayload};
use crate::probe::Probe;

const SUBSYSTEM: &str = "ping";

const LABELS: &[&str] = &[
    "measurement",
    "probe",
    "dst_addr",
    "dst_name",
    "asn",
    "ip_version",
    "country_code",
    "lat",
    "long",
];

/// Builds the aggregator for a ping measurement.
pub fn measurement(id: &str, af: u8, cfg: &Config) -> Measurement {
    let rtt_hist = RttHistogram::new(
        NAMESPACE,
        SUBSYSTEM,
        "Histogram of round trip times over all ICMP requests",
        id,
        af,
        cfg.histogram_buckets.ping.rtt.clone(),
        reply_rtts,
    );

    let mut m = Measurement::new(Box::new(PingExporter::new(id)))
        .with_histograms(vec![Box::new(rtt_hist)]);
    if cfg.filter_invalid_results {
        m = m.with_validator(Box::new(DefaultResultValidator));
    }
    m
}

fn reply_rtts(res: &MeasurementResult) -> Vec<f64> {
    match res.payload() {
        ResultPayload::Ping(ping) => ping.replies.iter().map(|r| r.rtt).collect(),
        _ => Vec::new(),
    }
}

struct PingExporter {
    id: String,
    success: GaugeVec,
    min_latency: GaugeVec,
    max_latency: GaugeVec,
    avg_latency: GaugeVec,
    sent: GaugeVec,
    rcvd: GaugeVec,
    dup: GaugeVec,
    ttl: GaugeVec,
    size: GaugeVec,
}

fn gauge(name: &str, help: &str) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
    GaugeVec::new(opts, LABELS).expect("valid metric options")
}

impl PingExporter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: gauge("success", "Destination was reachable"),
            min_latency: gauge("min_latency", "Minimum latency"),
            max_latency: gauge("max_latency", "Maximum latency"),
            avg_latency: gauge("avg_latency", "Average latency"),
            sent: gauge("sent", "Number of sent icmp requests"),
            rcvd: gauge("received", "Number of received icmp responses"),
            dup: gauge("dup", "Number of duplicate icmp responses"),
            ttl: gauge("ttl", "Time-to-live field in the response"),
            size: gauge("size", "Size of ICMP packet"),
        }
    }

    fn vecs(&self) -> [&GaugeVec; 9] {
        [
            &self.success,
            &self.min_latency,
            &self.max_latency,
            &self.avg_latency,
            &self.sent,
            &self.rcvd,
            &self.dup,
            &self.ttl,
            &self.size,
        ]
    }

    fn label_values(&self, res: &MeasurementResult, probe: &Probe) -> Vec<String> {
        vec![
            self.id.clone(),
            probe.id.to_string(),
            res.dst_addr().to_string(),
            res.dst_name().to_string(),
            probe.asn_for_ip_version(res.af()).to_string(),
            res.af().to_string(),
            probe.country_code.clone(),
            probe.latitude(),
            probe.longitude(),
        ]
    }
}

impl MetricExporter for PingExporter {
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
        let ResultPayload::Ping(ping) = res.payload() else {
            return;
        };

        let values = self.label_values(res, probe);
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        if ping.min > 0.0 {
            self.success.with_label_values(&labels).set(1.0);
            self.min_latency.with_label_values(&labels).set(ping.min);
            self.max_latency.with_label_values(&labels).set(ping.max);
            self.avg_latency.with_label_values(&labels).set(ping.avg);
        } else {
            self.success.with_label_values(&labels).set(0.0);
        }

        self.sent.with_label_values(&labels).set(ping.sent as f64);
        self.rcvd.with_label_values(&labels).set(ping.rcvd as f64);
        self.dup.with_label_values(&labels).set(ping.dup as f64);
        self.ttl.with_label_values(&labels).set(ping.ttl as f64);
        self.size.with_label_values(&labels).set(ping.size as f64);
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vecs().iter().flat_map(|v| v.collect()).collect()
    }
}
