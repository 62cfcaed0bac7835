use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use super::NAMESPACE;
use crate::config::Config;
use crate::exporter::{DefaultResultValidator, Measurement, MetricExporter};
use crate::measurement::{MeasurementResult, ResultPayload};
use crate::probe::Probe;

const SUBSYSTEM: &str = "ntp";

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

/// Builds the aggregator for an NTP measurement.
pub fn measurement(id: &str, _af: u8, cfg: &Config) -> Measurement {
    let mut m = Measurement::new(Box::new(NtpExporter::new(id)));
    if cfg.filter_invalid_results {
        m = m.with_validator(Box::new(DefaultResultValidator));
    }
    m
}

struct NtpExporter {
    id: String,
    poll: GaugeVec,
    precision: GaugeVec,
    root_delay: GaugeVec,
    root_dispersion: GaugeVec,
    version: GaugeVec,
}

fn gauge(name: &str, help: &str) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
    GaugeVec::new(opts, LABELS).expect("valid metric options")
}

impl NtpExporter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            poll: gauge("poll", "Poll interval"),
            precision: gauge("precision", "Precision"),
            root_delay: gauge("root_delay", "Root delay"),
            root_dispersion: gauge("root_dispersion", "Root dispersion"),
            version: gauge("ntp_version", "NTP version"),
        }
    }

    fn vecs(&self) -> [&GaugeVec; 5] {
        [
            &self.poll,
            &self.precision,
            &self.root_delay,
            &self.root_dispersion,
            &self.version,
        ]
    }
}

impl MetricExporter for NtpExporter {
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
        let ResultPayload::Ntp(ntp) = res.payload() else {
            return;
        };

        let values = vec![
            self.id.clone(),
            probe.id.to_string(),
            res.dst_addr().to_string(),
            res.dst_name().to_string(),
            probe.asn_for_ip_version(res.af()).to_string(),
            res.af().to_string(),
            probe.country_code.clone(),
            probe.latitude(),
            probe.longitude(),
        ];
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        self.poll.with_label_values(&labels).set(ntp.poll);
        self.precision.with_label_values(&labels).set(ntp.precision);
        self.root_delay.with_label_values(&labels).set(ntp.root_delay);
        self.root_dispersion
            .with_label_values(&labels)
            .set(ntp.root_dispersion);
        self.version
            .with_label_values(&labels)
            .set(ntp.version as f64);
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vecs().iter().flat_map(|v| v.collect()).collect()
    }
}
