//! Measurement results as delivered by the upstream API.
//!
//! A result is one probe's observation for one measurement at one point in
//! time. The protocol-specific part lives in [`ResultPayload`], dispatched
//! on the `type` tag of the wire format.

pub mod stream;

pub use stream::{StreamError, StreamItem};

use serde::Deserialize;

/// Address family tag used by the upstream API for IPv6 results.
pub const IPV6: u8 = 6;

fn default_af() -> u8 {
    4
}

/// A single probe's observation for one measurement.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementResult {
    msm_id: i64,
    prb_id: i64,
    #[serde(default)]
    timestamp: i64,
    #[serde(default = "default_af")]
    af: u8,
    #[serde(default)]
    dst_addr: String,
    #[serde(default)]
    dst_name: String,
    #[serde(flatten)]
    payload: ResultPayload,
}

impl MeasurementResult {
    pub fn msm_id(&self) -> i64 {
        self.msm_id
    }

    pub fn prb_id(&self) -> i64 {
        self.prb_id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn af(&self) -> u8 {
        self.af
    }

    pub fn dst_addr(&self) -> &str {
        &self.dst_addr
    }

    pub fn dst_name(&self) -> &str {
        &self.dst_name
    }

    pub fn payload(&self) -> &ResultPayload {
        &self.payload
    }

    /// The protocol tag of the wire format ("ping", "dns", ...).
    pub fn type_tag(&self) -> &'static str {
        match self.payload {
            ResultPayload::Ping(_) => "ping",
            ResultPayload::Traceroute(_) => "traceroute",
            ResultPayload::Dns(_) => "dns",
            ResultPayload::Http(_) => "http",
            ResultPayload::Ntp(_) => "ntp",
            ResultPayload::Sslcert(_) => "sslcert",
        }
    }
}

/// Protocol-specific result payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultPayload {
    Ping(PingPayload),
    Traceroute(TraceroutePayload),
    Dns(DnsPayload),
    Http(HttpPayload),
    Ntp(NtpPayload),
    Sslcert(SslCertPayload),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingPayload {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub sent: i64,
    #[serde(default)]
    pub rcvd: i64,
    #[serde(default)]
    pub dup: i64,
    #[serde(default)]
    pub ttl: i64,
    #[serde(default)]
    pub size: i64,
    /// Per-request replies; entries without an `rtt` are lost packets.
    #[serde(default, rename = "result")]
    pub replies: Vec<PingReply>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingReply {
    #[serde(default)]
    pub rtt: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceroutePayload {
    #[serde(default)]
    pub proto: String,
    #[serde(default, rename = "result")]
    pub hops: Vec<TracerouteHop>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TracerouteHop {
    #[serde(default)]
    pub hop: i64,
    #[serde(default, rename = "result")]
    pub replies: Vec<HopReply>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HopReply {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub rtt: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DnsPayload {
    #[serde(default)]
    pub result: Option<DnsResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DnsResponse {
    #[serde(default)]
    pub rt: f64,
    #[serde(default, rename = "answers")]
    pub answers: Vec<DnsAnswer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DnsAnswer {
    #[serde(default, rename = "RDATA")]
    pub rdata: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpPayload {
    #[serde(default)]
    pub uri: String,
    #[serde(default, rename = "result")]
    pub attempts: Vec<HttpAttempt>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpAttempt {
    #[serde(default)]
    pub af: u8,
    #[serde(default)]
    pub dst_addr: String,
    #[serde(default)]
    pub method: String,
    /// HTTP status code returned by the server.
    #[serde(default)]
    pub res: i64,
    #[serde(default)]
    pub ver: String,
    #[serde(default)]
    pub bsize: i64,
    #[serde(default)]
    pub hsize: i64,
    #[serde(default)]
    pub rt: f64,
    #[serde(default)]
    pub dnserr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtpPayload {
    #[serde(default)]
    pub poll: f64,
    #[serde(default)]
    pub precision: f64,
    #[serde(default, rename = "root-delay")]
    pub root_delay: f64,
    #[serde(default, rename = "root-dispersion")]
    pub root_dispersion: f64,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SslCertPayload {
    #[serde(default)]
    pub rt: f64,
    #[serde(default)]
    pub ver: String,
    /// PEM-encoded certificate chain, leaf first.
    #[serde(default)]
    pub cert: Vec<String>,
    #[serde(default)]
    pub alert: Option<SslAlert>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SslAlert {
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub description: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ping_result() {
        let res: MeasurementResult = serde_json::from_str(
            r#"{
                "msm_id": 1001,
                "prb_id": 42,
                "timestamp": 1700000000,
                "type": "ping",
                "af": 4,
                "dst_addr": "192.0.2.1",
                "dst_name": "example.net",
                "min": 12.5,
                "max": 30.1,
                "avg": 20.0,
                "sent": 3,
                "rcvd": 3,
                "result": [{"rtt": 12.5}, {"rtt": 30.1}, {"x": "*"}]
            }"#,
        )
        .unwrap();

        assert_eq!(res.msm_id(), 1001);
        assert_eq!(res.prb_id(), 42);
        assert_eq!(res.type_tag(), "ping");
        let ResultPayload::Ping(ping) = res.payload() else {
            panic!("expected ping payload");
        };
        assert_eq!(ping.min, 12.5);
        assert_eq!(ping.replies.len(), 3);
        assert_eq!(ping.replies[2].rtt, 0.0);
    }

    #[test]
    fn parses_ntp_wire_names() {
        let res: MeasurementResult = serde_json::from_str(
            r#"{
                "msm_id": 7,
                "prb_id": 9,
                "type": "ntp",
                "af": 6,
                "root-delay": 0.02,
                "root-dispersion": 0.01,
                "poll": 64.0,
                "precision": 1e-6,
                "version": 4
            }"#,
        )
        .unwrap();

        let ResultPayload::Ntp(ntp) = res.payload() else {
            panic!("expected ntp payload");
        };
        assert_eq!(ntp.root_delay, 0.02);
        assert_eq!(ntp.version, 4);
        assert_eq!(res.af(), 6);
    }

    #[test]
    fn rejects_unknown_type_tag() {
        let parsed: Result<MeasurementResult, _> = serde_json::from_str(
            r#"{"msm_id": 1, "prb_id": 2, "type": "wifi"}"#,
        );
        assert!(parsed.is_err());
    }
}
