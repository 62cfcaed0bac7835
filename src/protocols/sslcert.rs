use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use sha2::{Digest, Sha256};

use super::NAMESPACE;
use crate::config::Config;
use crate::exporter::{DefaultResultValidator, Measurement, MetricExporter};
use crate::measurement::{MeasurementResult, ResultPayload};
use crate::probe::Probe;

const SUBSYSTEM: &str = "sslcert";

const LABELS: &[&str] = &[
    "measurement",
    "probe",
    "dst_addr",
    "asn",
    "ip_version",
    "country_code",
    "lat",
    "long",
    "cert_fingerprint",
];

/// Builds the aggregator for a TLS certificate measurement.
pub fn measurement(id: &str, _af: u8, cfg: &Config) -> Measurement {
    let mut m = Measurement::new(Box::new(SslCertExporter::new(id)));
    if cfg.filter_invalid_results {
        m = m.with_validator(Box::new(DefaultResultValidator));
    }
    m
}

/// Hex SHA-256 digest of the leaf certificate as reported (PEM), used to
/// detect certificate changes across scrapes.
fn cert_fingerprint(certs: &[String]) -> String {
    let Some(leaf) = certs.first() else {
        return String::new();
    };

    let digest = Sha256::digest(leaf.trim().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

struct SslCertExporter {
    id: String,
    success: GaugeVec,
    rtt: GaugeVec,
    version: GaugeVec,
    alert_level: GaugeVec,
    alert_description: GaugeVec,
}

fn gauge(name: &str, help: &str) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
    GaugeVec::new(opts, LABELS).expect("valid metric options")
}

impl SslCertExporter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: gauge("success", "Destination was reachable"),
            rtt: gauge("rtt", "Round trip time in ms"),
            version: gauge("version", "SSL/TLS version used for the request"),
            alert_level: gauge("alert_level", "Status of the SSL/TLS certificate (0 = valid)"),
            alert_description: gauge(
                "alert_description",
                "Description for the alert level (see upstream API documentation)",
            ),
        }
    }

    fn vecs(&self) -> [&GaugeVec; 5] {
        [
            &self.success,
            &self.rtt,
            &self.version,
            &self.alert_level,
            &self.alert_description,
        ]
    }
}

impl MetricExporter for SslCertExporter {
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
        let ResultPayload::Sslcert(cert) = res.payload() else {
            return;
        };

        let values = vec![
            self.id.clone(),
            probe.id.to_string(),
            res.dst_addr().to_string(),
            probe.asn_for_ip_version(res.af()).to_string(),
            res.af().to_string(),
            probe.country_code.clone(),
            probe.latitude(),
            probe.longitude(),
            cert_fingerprint(&cert.cert),
        ];
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        self.version
            .with_label_values(&labels)
            .set(cert.ver.parse::<f64>().unwrap_or(0.0));

        let (level, description) = cert
            .alert
            .as_ref()
            .map(|a| (a.level as f64, a.description as f64))
            .unwrap_or((0.0, 0.0));
        self.alert_level.with_label_values(&labels).set(level);
        self.alert_description
            .with_label_values(&labels)
            .set(description);

        if cert.rt > 0.0 {
            self.success.with_label_values(&labels).set(1.0);
            self.rtt.with_label_values(&labels).set(cert.rt);
        } else {
            self.success.with_label_values(&labels).set(0.0);
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vecs().iter().flat_map(|v| v.collect()).collect()
    }
}
