use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use super::NAMESPACE;
use crate::config::Config;
use crate::exporter::{DefaultResultValidator, Measurement, MetricExporter, RttHistogram};
use crate::measurement::{MeasurementResult, ResultPayload};
use crate::probe::Probe;

const SUBSYSTEM: &str = "dns";

const LABELS: &[&str] = &[
    "measurement",
    "probe",
    "dst_addr",
    "asn",
    "ip_version",
    "country_code",
    "lat",
    "long",
    "rdata1",
];

/// Builds the aggregator for a DNS measurement.
pub fn measurement(id: &str, af: u8, cfg: &Config) -> Measurement {
    let rtt_hist = RttHistogram::new(
        NAMESPACE,
        SUBSYSTEM,
        "Histogram of round trip times over all DNS requests",
        id,
        af,
        cfg.histogram_buckets.dns.rtt.clone(),
        response_rtt,
    );

    let mut m = Measurement::new(Box::new(DnsExporter::new(id)))
        .with_histograms(vec![Box::new(rtt_hist)]);
    if cfg.filter_invalid_results {
        m = m.with_validator(Box::new(DefaultResultValidator));
    }
    m
}

fn response_rtt(res: &MeasurementResult) -> Vec<f64> {
    match res.payload() {
        ResultPayload::Dns(dns) => dns.result.as_ref().map(|r| vec![r.rt]).unwrap_or_default(),
        _ => Vec::new(),
    }
}

struct DnsExporter {
    id: String,
    success: GaugeVec,
    rtt: GaugeVec,
}

fn gauge(name: &str, help: &str) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
    GaugeVec::new(opts, LABELS).expect("valid metric options")
}

impl DnsExporter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: gauge("success", "Destination was reachable"),
            rtt: gauge("rtt", "Round trip time in ms"),
        }
    }
}

impl MetricExporter for DnsExporter {
    fn describe(&self) -> Vec<Desc> {
        [&self.success, &self.rtt]
            .iter()
            .flat_map(|v| v.desc().into_iter().cloned())
            .collect()
    }

    fn reset(&self) {
        self.success.reset();
        self.rtt.reset();
    }

    fn export(&self, res: &MeasurementResult, probe: &Probe) {
        let ResultPayload::Dns(dns) = res.payload() else {
            return;
        };

        let rtt = dns.result.as_ref().map(|r| r.rt).unwrap_or(0.0);
        let rdata1 = dns
            .result
            .as_ref()
            .and_then(|r| r.answers.first())
            .and_then(|a| a.rdata.first())
            .cloned()
            .unwrap_or_default();

        let values = vec![
            self.id.clone(),
            probe.id.to_string(),
            res.dst_addr().to_string(),
            probe.asn_for_ip_version(res.af()).to_string(),
            res.af().to_string(),
            probe.country_code.clone(),
            probe.latitude(),
            probe.longitude(),
            rdata1,
        ];
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        if rtt > 0.0 {
            self.success.with_label_values(&labels).set(1.0);
            self.rtt.with_label_values(&labels).set(rtt);
        } else {
            self.success.with_label_values(&labels).set(0.0);
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        [&self.success, &self.rtt]
            .iter()
            .flat_map(|v| v.collect())
            .collect()
    }
}
