use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use super::NAMESPACE;
use crate::config::Config;
use crate::exporter::{Measurement, MetricExporter, ResultValidator, RttHistogram};
use crate::measurement::{MeasurementResult, ResultPayload};
use crate::probe::Probe;

const SUBSYSTEM: &str = "traceroute";

const LABELS: &[&str] = &[
    "measurement",
    "probe",
    "dst_addr",
    "dst_name",
    "asn",
    "ip_version",
    "protocol",
    "country_code",
    "lat",
    "long",
];

/// Builds the aggregator for a traceroute measurement.
pub fn measurement(id: &str, af: u8, cfg: &Config) -> Measurement {
    let rtt_hist = RttHistogram::new(
        NAMESPACE,
        SUBSYSTEM,
        "Histogram of round trip times over all traceroute requests",
        id,
        af,
        cfg.histogram_buckets.traceroute.rtt.clone(),
        destination_rtt,
    );

    let mut m = Measurement::new(Box::new(TracerouteExporter::new(id)))
        .with_histograms(vec![Box::new(rtt_hist)]);
    if cfg.filter_invalid_results {
        m = m.with_validator(Box::new(TracerouteResultValidator));
    }
    m
}

/// Success and RTT derived from the replies of the last hop.
fn process_last_hop(res: &MeasurementResult) -> (bool, f64) {
    let ResultPayload::Traceroute(tr) = res.payload() else {
        return (false, 0.0);
    };
    let Some(last) = tr.hops.last() else {
        return (false, 0.0);
    };

    let success = last.replies.iter().any(|r| r.from == res.dst_addr());
    let rtt = last.replies.last().map(|r| r.rtt).unwrap_or(0.0);
    (success, rtt)
}

fn destination_rtt(res: &MeasurementResult) -> Vec<f64> {
    match process_last_hop(res) {
        (true, rtt) if rtt > 0.0 => vec![rtt],
        _ => Vec::new(),
    }
}

/// Besides the ASN check, a traceroute with a single hop carries no path
/// information and is dropped.
struct TracerouteResultValidator;

impl ResultValidator for TracerouteResultValidator {
    fn is_valid(&self, res: &MeasurementResult, probe: &Probe) -> bool {
        let hops = match res.payload() {
            ResultPayload::Traceroute(tr) => tr.hops.len(),
            _ => 0,
        };
        probe.asn_for_ip_version(res.af()) > 0 && hops > 1
    }
}

struct TracerouteExporter {
    id: String,
    success: GaugeVec,
    hops: GaugeVec,
    rtt: GaugeVec,
}

fn gauge(name: &str, help: &str) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
    GaugeVec::new(opts, LABELS).expect("valid metric options")
}

impl TracerouteExporter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: gauge("success", "Destination was reachable"),
            hops: gauge("hops", "Number of hops"),
            rtt: gauge("rtt", "Round trip time in ms"),
        }
    }

    fn label_values(&self, res: &MeasurementResult, probe: &Probe) -> Vec<String> {
        let proto = match res.payload() {
            ResultPayload::Traceroute(tr) => tr.proto.clone(),
            _ => String::new(),
        };

        vec![
            self.id.clone(),
            probe.id.to_string(),
            res.dst_addr().to_string(),
            res.dst_name().to_string(),
            probe.asn_for_ip_version(res.af()).to_string(),
            res.af().to_string(),
            proto,
            probe.country_code.clone(),
            probe.latitude(),
            probe.longitude(),
        ]
    }
}

impl MetricExporter for TracerouteExporter {
    fn describe(&self) -> Vec<Desc> {
        [&self.success, &self.hops, &self.rtt]
            .iter()
            .flat_map(|v| v.desc().into_iter().cloned())
            .collect()
    }

    fn reset(&self) {
        self.success.reset();
        self.hops.reset();
        self.rtt.reset();
    }

    fn export(&self, res: &MeasurementResult, probe: &Probe) {
        let ResultPayload::Traceroute(tr) = res.payload() else {
            return;
        };

        let values = self.label_values(res, probe);
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        let (success, rtt) = process_last_hop(res);
        self.success
            .with_label_values(&labels)
            .set(if success { 1.0 } else { 0.0 });
        self.hops.with_label_values(&labels).set(tr.hops.len() as f64);

        if rtt > 0.0 {
            self.rtt.with_label_values(&labels).set(rtt);
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        [&self.success, &self.hops, &self.rtt]
            .iter()
            .flat_map(|v| v.collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(hops: serde_json::Value) -> MeasurementResult {
        serde_json::from_value(serde_json::json!({
            "msm_id": 1, "prb_id": 2, "type": "traceroute", "af": 4,
            "dst_addr": "192.0.2.1", "proto": "UDP", "result": hops
        }))
        .unwrap()
    }

    #[test]
    fn last_hop_reaching_destination_counts_as_success() {
        let res = result(serde_json::json!([
            {"hop": 1, "result": [{"from": "10.0.0.1", "rtt": 1.5}]},
            {"hop": 2, "result": [{"from": "192.0.2.1", "rtt": 9.25}]}
        ]));

        let (success, rtt) = process_last_hop(&res);
        assert!(success);
        assert_eq!(rtt, 9.25);
        assert_eq!(destination_rtt(&res), vec![9.25]);
    }

    #[test]
    fn unreached_destination_is_no_success() {
        let res = result(serde_json::json!([
            {"hop": 1, "result": [{"from": "10.0.0.1", "rtt": 1.5}]},
            {"hop": 2, "result": [{"x": "*"}]}
        ]));

        let (success, _) = process_last_hop(&res);
        assert!(!success);
        assert!(destination_rtt(&res).is_empty());
    }

    #[test]
    fn single_hop_results_are_invalid() {
        let probe = Probe {
            id: 2,
            asn_v4: Some(64500),
            ..Default::default()
        };
        let res = result(serde_json::json!([
            {"hop": 1, "result": [{"from": "10.0.0.1", "rtt": 1.5}]}
        ]));

        assert!(!TracerouteResultValidator.is_valid(&res, &probe));
    }
}
