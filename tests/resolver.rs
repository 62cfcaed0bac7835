mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ping_result, probe, MockProbeSource};
use probewatch::probe::{ProbeCache, ProbeResolver};

fn cache() -> Arc<ProbeCache> {
    Arc::new(ProbeCache::new(Duration::from_secs(3600)))
}

#[tokio::test]
async fn resolves_each_distinct_probe_exactly_once() {
    let source = Arc::new(MockProbeSource::with_probes([
        probe(1, Some(64500), None),
        probe(2, Some(64501), None),
        probe(3, Some(64502), None),
    ]));
    let resolver = ProbeResolver::new(cache(), source.clone(), 4);

    // 10 results spread over 3 distinct probes
    let results: Vec<_> = (0..10i64)
        .map(|i| ping_result(1001, i % 3 + 1, 4, 20.0))
        .collect();

    let probes = resolver.resolve_all(&results).await.unwrap();
    assert_eq!(probes.len(), 3);
    assert_eq!(probes[&2].asn_v4, Some(64501));
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn fails_fast_on_first_fetch_error() {
    let source = Arc::new(MockProbeSource::with_probes([
        probe(1, Some(64500), None),
        probe(2, Some(64501), None),
        probe(4, Some(64503), None),
        probe(5, Some(64504), None),
    ]));
    source.fail_for(3);
    let resolver = ProbeResolver::new(cache(), source, 2);

    let results: Vec<_> = (1..=5i64).map(|id| ping_result(1001, id, 4, 20.0)).collect();

    let err = resolver.resolve_all(&results).await.unwrap_err();
    assert_eq!(err.id, 3);
    assert!(err
        .to_string()
        .contains("could not retrieve probe information for probe 3"));
}

#[tokio::test]
async fn cached_probes_are_not_fetched_again() {
    let cache = cache();
    cache.add(1, probe(1, Some(64500), None));
    let source = Arc::new(MockProbeSource::default());
    let resolver = ProbeResolver::new(cache, source.clone(), 4);

    let results = vec![ping_result(1001, 1, 4, 20.0)];

    let probes = resolver.resolve_all(&results).await.unwrap();
    assert_eq!(probes.len(), 1);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn successful_fetches_are_written_to_the_cache() {
    let cache = cache();
    let source = Arc::new(MockProbeSource::with_probes([probe(7, Some(64500), None)]));
    let resolver = ProbeResolver::new(cache.clone(), source.clone(), 1);

    resolver.resolve(7).await.unwrap();
    assert!(cache.get(7).is_some());

    // second resolution is served from the cache
    resolver.resolve(7).await.unwrap();
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn empty_input_resolves_to_empty_map() {
    let resolver = ProbeResolver::new(cache(), Arc::new(MockProbeSource::default()), 4);
    let probes = resolver.resolve_all(&[]).await.unwrap();
    assert!(probes.is_empty());
}
