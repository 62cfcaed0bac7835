#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus::proto::{Metric, MetricFamily};
use tokio::sync::mpsc;

use probewatch::client::ResultSource;
use probewatch::measurement::{MeasurementResult, StreamItem};
use probewatch::probe::{Probe, ProbeSource};

pub fn probe(id: i64, asn_v4: Option<i64>, asn_v6: Option<i64>) -> Probe {
    Probe {
        id,
        asn_v4,
        asn_v6,
        country_code: "DE".to_string(),
        ..Default::default()
    }
}

pub fn ping_result(msm_id: i64, prb_id: i64, af: u8, avg: f64) -> MeasurementResult {
    serde_json::from_value(serde_json::json!({
        "msm_id": msm_id,
        "prb_id": prb_id,
        "type": "ping",
        "af": af,
        "timestamp": 1700000000,
        "dst_addr": "192.0.2.1",
        "dst_name": "example.net",
        "min": 10.0,
        "max": 30.0,
        "avg": avg,
        "sent": 3,
        "rcvd": 3,
        "result": [{"rtt": 10.0}, {"rtt": 30.0}]
    }))
    .unwrap()
}

/// Probe metadata source backed by a map, with scriptable failures and a
/// fetch counter.
#[derive(Default)]
pub struct MockProbeSource {
    probes: Mutex<HashMap<i64, Probe>>,
    failing: Mutex<HashSet<i64>>,
    calls: AtomicUsize,
}

impl MockProbeSource {
    pub fn with_probes(probes: impl IntoIterator<Item = Probe>) -> Self {
        let source = Self::default();
        {
            let mut map = source.probes.lock();
            for p in probes {
                map.insert(p.id, p);
            }
        }
        source
    }

    pub fn fail_for(&self, id: i64) {
        self.failing.lock().insert(id);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeSource for MockProbeSource {
    async fn probe(&self, id: i64) -> anyhow::Result<Probe> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().contains(&id) {
            anyhow::bail!("metadata lookup failed");
        }

        self.probes
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown probe {id}"))
    }
}

/// Scripted behavior of `MockResultSource::latest` for one measurement id.
pub enum LatestScript {
    Results(Vec<MeasurementResult>),
    Fail(String),
    Hang,
}

/// Result source with scripted latest-batches and pre-created subscription
/// channels, handed out in order.
#[derive(Default)]
pub struct MockResultSource {
    latest: Mutex<HashMap<String, LatestScript>>,
    subscriptions: Mutex<VecDeque<mpsc::Receiver<StreamItem>>>,
}

impl MockResultSource {
    pub fn set_latest(&self, id: &str, script: LatestScript) {
        self.latest.lock().insert(id.to_string(), script);
    }

    /// Queues one subscription and returns its sending side.
    pub fn push_subscription(&self) -> mpsc::Sender<StreamItem> {
        let (tx, rx) = mpsc::channel(16);
        self.subscriptions.lock().push_back(rx);
        tx
    }
}

#[async_trait]
impl ResultSource for MockResultSource {
    async fn latest(&self, id: &str) -> anyhow::Result<Vec<MeasurementResult>> {
        enum Action {
            Results(Vec<MeasurementResult>),
            Fail(String),
            Hang,
            Empty,
        }

        let action = {
            let latest = self.latest.lock();
            match latest.get(id) {
                Some(LatestScript::Results(results)) => Action::Results(results.clone()),
                Some(LatestScript::Fail(msg)) => Action::Fail(msg.clone()),
                Some(LatestScript::Hang) => Action::Hang,
                None => Action::Empty,
            }
        };

        match action {
            Action::Results(results) => Ok(results),
            Action::Empty => Ok(Vec::new()),
            Action::Fail(msg) => Err(anyhow::anyhow!(msg)),
            Action::Hang => std::future::pending().await,
        }
    }

    async fn subscribe(&self, _id: &str) -> anyhow::Result<mpsc::Receiver<StreamItem>> {
        self.subscriptions
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no subscription available"))
    }
}

pub fn find_family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
    families
        .iter()
        .find(|f| f.get_name() == name)
        .unwrap_or_else(|| panic!("metric family {name} not found"))
}

pub fn label_value<'a>(metric: &'a Metric, name: &str) -> &'a str {
    metric
        .get_label()
        .iter()
        .find(|l| l.get_name() == name)
        .map(|l| l.get_value())
        .unwrap_or_default()
}
