//! Per-environment scheduler — polls every metric on a fixed cadence.
//!
//! The loop owns a `tokio::time::interval` whose first tick completes
//! immediately, which gives the eager first pass. Each tick spawns one
//! fetch task per metric and returns straight to waiting; it never awaits
//! the tasks it spawned.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use ossmon_cms::MetricSource;
use ossmon_core::MetricName;
use ossmon_metrics::GaugeStore;

use crate::in_flight::InFlight;

/// Lifecycle of one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Built but not yet running.
    Idle,
    /// Tick loop active.
    Running,
    /// Tick loop returned. Terminal.
    Stopped,
}

/// How many fetch tasks an environment may have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutPolicy {
    /// Every tick dispatches every metric, however many fetches are still
    /// running.
    #[default]
    Unbounded,
    /// Skip a metric's dispatch while `max_in_flight` fetches are outstanding.
    Bounded { max_in_flight: usize },
}

impl FanoutPolicy {
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(max_in_flight) if max_in_flight > 0 => FanoutPolicy::Bounded { max_in_flight },
            _ => FanoutPolicy::Unbounded,
        }
    }
}

/// Polling loop for one environment.
pub struct EnvScheduler {
    env: String,
    source: Arc<dyn MetricSource>,
    store: GaugeStore,
    interval: Duration,
    policy: FanoutPolicy,
    in_flight: InFlight,
    state: watch::Sender<SchedulerState>,
}

impl EnvScheduler {
    /// Create a scheduler. `interval` must be non-zero.
    pub fn new(
        env: impl Into<String>,
        source: Arc<dyn MetricSource>,
        store: GaugeStore,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            env: env.into(),
            source,
            store,
            interval,
            policy: FanoutPolicy::default(),
            in_flight: InFlight::new(),
            state,
        }
    }

    pub fn with_policy(mut self, policy: FanoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Outstanding fetch tasks of this environment.
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Spawn one fetch task per metric. Returns how many were spawned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self) -> usize {
        let mut dispatched = 0;

        for metric in MetricName::ALL {
            if let FanoutPolicy::Bounded { max_in_flight } = self.policy {
                let outstanding = self.in_flight.count();
                if outstanding >= max_in_flight {
                    warn!(
                        env = %self.env,
                        %metric,
                        outstanding,
                        max_in_flight,
                        "fan-out limit reached, skipping fetch"
                    );
                    continue;
                }
            }

            let guard = self.in_flight.enter();
            let env = self.env.clone();
            let source = Arc::clone(&self.source);
            let store = self.store.clone();

            tokio::spawn(async move {
                let _guard = guard;
                collect(&env, source.as_ref(), &store, metric).await;
            });
            dispatched += 1;
        }

        dispatched
    }

    /// Run the tick loop until the shutdown signal is raised or its sender
    /// is dropped. Fetch tasks already dispatched keep running.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow_and_update() {
            self.state.send_replace(SchedulerState::Stopped);
            debug!(env = %self.env, "shutdown already raised, scheduler not started");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.state.send_replace(SchedulerState::Running);
        info!(
            env = %self.env,
            interval_secs = self.interval.as_secs(),
            metrics = MetricName::ALL.len(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let dispatched = self.dispatch();
                    debug!(
                        env = %self.env,
                        dispatched,
                        in_flight = self.in_flight.count(),
                        "tick dispatched"
                    );
                }
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!(
            env = %self.env,
            in_flight = self.in_flight.count(),
            "scheduler stopped"
        );
    }
}

/// Fetch one metric and fold the samples into the store.
///
/// Failures are logged and dropped; the affected series keep their
/// previous values. Returns whether the fetch succeeded.
pub async fn collect(
    env: &str,
    source: &dyn MetricSource,
    store: &GaugeStore,
    metric: MetricName,
) -> bool {
    match source.fetch(metric).await {
        Ok(samples) => {
            store.apply(env, metric, &samples).await;
            debug!(%env, %metric, samples = samples.len(), "metric collected");
            true
        }
        Err(e) => {
            error!(%env, %metric, error = %e, "metric fetch failed");
            false
        }
    }
}
