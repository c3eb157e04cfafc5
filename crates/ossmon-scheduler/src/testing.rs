//! Scripted metric sources for scheduler and supervisor tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use ossmon_cms::{BoxFuture, FetchError, FetchResult, MetricSource};
use ossmon_core::{MetricName, Sample};
use ossmon_metrics::GaugeStore;

/// One scripted reply.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Samples(Vec<Sample>),
    Fail,
}

pub(crate) fn ok(bucket: &str, value: f64) -> Step {
    Step::Samples(vec![sample(bucket, value)])
}

pub(crate) fn sample(bucket: &str, value: f64) -> Sample {
    Sample {
        timestamp: 1_700_000_000_000,
        user_id: "1".to_string(),
        bucket_name: bucket.to_string(),
        storage_type: None,
        region: Some("oss-cn-hangzhou".to_string()),
        value,
    }
}

/// Replies to each metric from its own script. The last step repeats once
/// the script runs out; unscripted metrics return no samples.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    scripts: Mutex<HashMap<MetricName, VecDeque<Step>>>,
    calls: Mutex<HashMap<MetricName, usize>>,
    delay: Duration,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every metric answers `value` for "bucket-1" forever.
    pub(crate) fn uniform(value: f64) -> Self {
        MetricName::ALL
            .into_iter()
            .fold(Self::new(), |s, m| s.script(m, vec![ok("bucket-1", value)]))
    }

    pub(crate) fn script(self, metric: MetricName, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().insert(metric, steps.into());
        self
    }

    /// Delay every reply, simulating a slow upstream.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self, metric: MetricName) -> usize {
        self.calls.lock().unwrap().get(&metric).copied().unwrap_or(0)
    }

    fn next_step(&self, metric: MetricName) -> Step {
        *self.calls.lock().unwrap().entry(metric).or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&metric) {
            Some(steps) if steps.len() > 1 => steps.pop_front().unwrap(),
            Some(steps) => steps.front().cloned().unwrap_or(Step::Samples(Vec::new())),
            None => Step::Samples(Vec::new()),
        }
    }
}

impl MetricSource for ScriptedSource {
    fn fetch(&self, metric: MetricName) -> BoxFuture<'_, FetchResult<Vec<Sample>>> {
        let step = self.next_step(metric);
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match step {
                Step::Samples(samples) => Ok(samples),
                Step::Fail => Err(FetchError::Status {
                    status: 503,
                    body: "scripted failure".to_string(),
                }),
            }
        })
    }
}

/// Poll the store until it holds `len` series. Panics after a bounded
/// number of polls.
pub(crate) async fn wait_for_len(store: &GaugeStore, len: usize) {
    for _ in 0..1000 {
        if store.len().await >= len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("store never reached {len} series (has {})", store.len().await);
}

/// Poll until `cond` holds. Panics after a bounded number of polls.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition never became true");
}
