//! Gauge store — the latest value of every observed series.
//!
//! Writes are last-write-wins with no history. Entries are never removed,
//! so a bucket that disappears upstream keeps its last value until restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

use ossmon_core::{GaugeKey, MetricName, Sample};

/// Concurrency-safe label-keyed gauge values.
///
/// Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct GaugeStore {
    values: Arc<RwLock<HashMap<GaugeKey, f64>>>,
}

impl GaugeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value of one series.
    pub async fn set(
        &self,
        env: &str,
        resource: &str,
        region: &str,
        metric: MetricName,
        value: f64,
    ) {
        let key = GaugeKey::new(env, resource, region, metric);
        self.values.write().await.insert(key, value);
    }

    /// Fold one fetch result in, one `set` per sample.
    ///
    /// Each sample is written under its own lock acquisition, the same as
    /// calling `set` in a loop.
    pub async fn apply(&self, env: &str, metric: MetricName, samples: &[Sample]) {
        for sample in samples {
            self.set(env, &sample.bucket_name, sample.region_label(), metric, sample.value)
                .await;
        }
        trace!(%env, %metric, samples = samples.len(), "samples applied");
    }

    /// Current value of one series.
    pub async fn get(&self, key: &GaugeKey) -> Option<f64> {
        self.values.read().await.get(key).copied()
    }

    /// Point-in-time copy of every series, ordered by key.
    pub async fn snapshot(&self) -> BTreeMap<GaugeKey, f64> {
        let values = self.values.read().await;
        values.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}
