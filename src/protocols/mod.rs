//! Per-protocol metric exporters.
//!
//! One module per measurement type, each contributing a factory to
//! [`default_registry`]. Adding a protocol means adding a module and a
//! `register` line here; nothing else dispatches on type tags.

pub mod dns;
pub mod http;
pub mod ntp;
pub mod ping;
pub mod sslcert;
pub mod traceroute;

use crate::exporter::ExporterRegistry;

/// Namespace of all exported metrics.
pub const NAMESPACE: &str = "probewatch";

/// Registry with every supported measurement type registered.
pub fn default_registry() -> ExporterRegistry {
    let mut registry = ExporterRegistry::new();
    registry.register("ping", Box::new(ping::measurement));
    registry.register("traceroute", Box::new(traceroute::measurement));
    registry.register("dns", Box::new(dns::measurement));
    registry.register("http", Box::new(http::measurement));
    registry.register("ntp", Box::new(ntp::measurement));
    registry.register("sslcert", Box::new(sslcert::measurement));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn registry_dispatches_on_type_tag() {
        let registry = default_registry();
        let cfg = Config::default();

        for tag in ["ping", "traceroute", "dns", "http", "ntp", "sslcert"] {
            assert!(registry.create(tag, "1001", 4, &cfg).is_ok(), "{tag}");
        }
    }

    #[test]
    fn registry_rejects_unknown_type_tag() {
        let registry = default_registry();
        let err = registry
            .create("wifi", "1001", 4, &Config::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "measurement type wifi is not supported");
    }
}
