mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{find_family, ping_result, probe, LatestScript, MockProbeSource, MockResultSource};
use probewatch::config::Config;
use probewatch::probe::{ProbeCache, ProbeResolver};
use probewatch::protocols;
use probewatch::strategy::{RequestStrategy, Strategy, StrategyError};

fn strategy(source: Arc<MockResultSource>, probes: Arc<MockProbeSource>) -> RequestStrategy {
    let cache = Arc::new(ProbeCache::new(Duration::from_secs(3600)));
    let resolver = Arc::new(ProbeResolver::new(cache, probes, 4));
    RequestStrategy::new(
        source,
        resolver,
        Arc::new(protocols::default_registry()),
        Arc::new(Config::default()),
    )
}

#[tokio::test]
async fn failed_and_empty_measurements_are_skipped() {
    let source = Arc::new(MockResultSource::default());
    source.set_latest(
        "1001",
        LatestScript::Results(vec![
            ping_result(1001, 42, 4, 20.0),
            ping_result(1001, 43, 4, 22.0),
        ]),
    );
    source.set_latest("1002", LatestScript::Fail("upstream unavailable".into()));
    source.set_latest("1003", LatestScript::Results(Vec::new()));

    let probes = Arc::new(MockProbeSource::with_probes([
        probe(42, Some(64500), None),
        probe(43, Some(64501), None),
    ]));

    let strategy = strategy(source, probes);
    let cancel = CancellationToken::new();
    let ids = ["1001", "1002", "1003"].map(String::from);

    let measurements = strategy.measurement_results(&cancel, &ids).await.unwrap();
    assert_eq!(measurements.len(), 1);

    let families = measurements[0].collect();
    let success = find_family(&families, "probewatch_ping_success");
    assert_eq!(success.get_metric().len(), 2);
}

#[tokio::test]
async fn probe_resolution_failure_drops_the_measurement() {
    let source = Arc::new(MockResultSource::default());
    source.set_latest(
        "1001",
        LatestScript::Results(vec![ping_result(1001, 42, 4, 20.0)]),
    );

    // no probe metadata available for probe 42
    let probes = Arc::new(MockProbeSource::default());

    let strategy = strategy(source, probes);
    let cancel = CancellationToken::new();
    let ids = ["1001".to_string()];

    let measurements = strategy.measurement_results(&cancel, &ids).await.unwrap();
    assert!(measurements.is_empty());
}

#[tokio::test]
async fn cancellation_fails_the_whole_batch() {
    let source = Arc::new(MockResultSource::default());
    source.set_latest("1001", LatestScript::Hang);

    let strategy = strategy(source, Arc::new(MockProbeSource::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ids = ["1001".to_string()];

    let err = strategy.measurement_results(&cancel, &ids).await.unwrap_err();
    assert!(matches!(err, StrategyError::Cancelled));
}
