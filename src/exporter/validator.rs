use super::ResultValidator;
use crate::measurement::MeasurementResult;
use crate::probe::Probe;

/// Validator used by most measurement types: the probe must have an ASN for
/// the address family of the result (e.g. an IPv6 result from a probe
/// without an IPv6 ASN is dropped).
pub struct DefaultResultValidator;

impl ResultValidator for DefaultResultValidator {
    fn is_valid(&self, res: &MeasurementResult, probe: &Probe) -> bool {
        probe.asn_for_ip_version(res.af()) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping_result(af: u8) -> MeasurementResult {
        serde_json::from_value(serde_json::json!({
            "msm_id": 1, "prb_id": 2, "type": "ping", "af": af
        }))
        .unwrap()
    }

    #[test]
    fn requires_asn_for_result_address_family() {
        let probe = Probe {
            id: 2,
            asn_v4: Some(64500),
            asn_v6: None,
            ..Default::default()
        };

        let validator = DefaultResultValidator;
        assert!(validator.is_valid(&ping_result(4), &probe));
        assert!(!validator.is_valid(&ping_result(6), &probe));
    }
}
