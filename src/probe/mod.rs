//! Probe metadata: the agent that executed a measurement, its ASNs and
//! geo location. Resolved lazily through a TTL cache backed by the API.

pub mod cache;
pub mod resolver;
pub mod source;

pub use cache::ProbeCache;
pub use resolver::{ProbeResolver, ResolveError};
pub use source::ProbeSource;

use serde::Deserialize;

use crate::measurement::IPV6;

/// Metadata about a single probe in the mesh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Probe {
    pub id: i64,
    #[serde(default)]
    pub asn_v4: Option<i64>,
    #[serde(default)]
    pub asn_v6: Option<i64>,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub geometry: Geometry,
}

/// Geo location as reported by the API: `[longitude, latitude]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

impl Probe {
    /// Returns the ASN matching the address family of a result (0 when the
    /// probe has no connectivity for that family).
    pub fn asn_for_ip_version(&self, af: u8) -> i64 {
        if af == IPV6 {
            self.asn_v6.unwrap_or(0)
        } else {
            self.asn_v4.unwrap_or(0)
        }
    }

    pub fn longitude(&self) -> String {
        match self.geometry.coordinates.first() {
            Some(long) => format!("{long:.4}"),
            None => String::new(),
        }
    }

    pub fn latitude(&self) -> String {
        match self.geometry.coordinates.get(1) {
            Some(lat) => format!("{lat:.4}"),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asn_selection_by_ip_version() {
        let probe = Probe {
            id: 1,
            asn_v4: Some(64500),
            asn_v6: None,
            ..Default::default()
        };

        assert_eq!(probe.asn_for_ip_version(4), 64500);
        assert_eq!(probe.asn_for_ip_version(6), 0);
    }

    #[test]
    fn coordinates_format_with_four_decimals() {
        let probe = Probe {
            geometry: Geometry {
                coordinates: vec![6.9613, 50.9378],
            },
            ..Default::default()
        };

        assert_eq!(probe.longitude(), "6.9613");
        assert_eq!(probe.latitude(), "50.9378");
    }

    #[test]
    fn coordinates_empty_when_absent() {
        let probe = Probe::default();
        assert_eq!(probe.longitude(), "");
        assert_eq!(probe.latitude(), "");
    }

    #[test]
    fn parses_api_payload() {
        let probe: Probe = serde_json::from_str(
            r#"{
                "id": 42,
                "asn_v4": 64500,
                "asn_v6": null,
                "country_code": "DE",
                "geometry": {"coordinates": [6.9613, 50.9378]}
            }"#,
        )
        .unwrap();

        assert_eq!(probe.id, 42);
        assert_eq!(probe.asn_v4, Some(64500));
        assert_eq!(probe.asn_v6, None);
        assert_eq!(probe.country_code, "DE");
    }
}
