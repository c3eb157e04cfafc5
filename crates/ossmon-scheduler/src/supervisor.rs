//! Collection supervisor — one scheduler task per environment.
//!
//! Every environment's client is built before any scheduler starts, so a
//! bad credential anywhere stops the whole exporter instead of leaving it
//! half-running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use ossmon_cms::{ClientResult, MetricSource, make_client_for};
use ossmon_core::{Environment, ExporterConfig};
use ossmon_metrics::GaugeStore;

use crate::error::{FatalError, FatalResult};
use crate::in_flight::InFlight;
use crate::scheduler::{EnvScheduler, FanoutPolicy, SchedulerState};

/// Builds the metric source for an environment.
pub type SourceFactory =
    Arc<dyn Fn(&Environment) -> ClientResult<Arc<dyn MetricSource>> + Send + Sync>;

/// Factory backed by real CloudMonitor clients.
pub fn default_factory() -> SourceFactory {
    Arc::new(|env: &Environment| -> ClientResult<Arc<dyn MetricSource>> {
        let client = make_client_for(env)?;
        Ok(Arc::new(client) as Arc<dyn MetricSource>)
    })
}

/// A started scheduler as seen from the supervisor.
struct SchedulerSlot {
    env: String,
    state: watch::Receiver<SchedulerState>,
    in_flight: InFlight,
    handle: Option<JoinHandle<()>>,
}

/// Starts and tracks the per-environment schedulers.
pub struct Supervisor {
    store: GaugeStore,
    factory: SourceFactory,
    slots: Vec<SchedulerSlot>,
}

impl Supervisor {
    /// Create a supervisor writing into `store`.
    pub fn new(store: GaugeStore) -> Self {
        Self {
            store,
            factory: default_factory(),
            slots: Vec::new(),
        }
    }

    /// Replace how metric sources are built.
    pub fn with_factory(mut self, factory: SourceFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Start one scheduler per configured environment.
    ///
    /// Returns the number of schedulers started. Must be called from within
    /// a tokio runtime.
    pub fn start(
        &mut self,
        config: &ExporterConfig,
        shutdown: watch::Receiver<bool>,
    ) -> FatalResult<usize> {
        if !self.slots.is_empty() {
            return Err(FatalError::AlreadyStarted);
        }

        let interval = config.interval();
        let policy = FanoutPolicy::from_limit(config.max_in_flight());

        let mut sources = Vec::new();
        for env in config.environments() {
            let source = (self.factory)(&env).map_err(|source| FatalError::Client {
                env: env.name.clone(),
                source,
            })?;
            sources.push((env.name, source));
        }

        for (env, source) in sources {
            let scheduler = EnvScheduler::new(env.clone(), source, self.store.clone(), interval)
                .with_policy(policy);
            let state = scheduler.subscribe();
            let in_flight = scheduler.in_flight().clone();
            let shutdown = shutdown.clone();

            let handle = tokio::spawn(async move {
                scheduler.run(shutdown).await;
            });

            self.slots.push(SchedulerSlot {
                env,
                state,
                in_flight,
                handle: Some(handle),
            });
        }

        info!(
            environments = self.slots.len(),
            interval_secs = interval.as_secs(),
            ?policy,
            "collection supervisor started"
        );
        Ok(self.slots.len())
    }

    /// Current state of every scheduler, in start order.
    pub fn states(&self) -> Vec<(String, SchedulerState)> {
        self.slots
            .iter()
            .map(|slot| (slot.env.clone(), *slot.state.borrow()))
            .collect()
    }

    /// Outstanding fetch tasks across all environments.
    pub fn in_flight(&self) -> usize {
        self.slots.iter().map(|slot| slot.in_flight.count()).sum()
    }

    /// Wait for every scheduler loop to return. Fetch tasks may still be
    /// running afterwards; see [`Supervisor::drain`].
    pub async fn join(&mut self) {
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                if let Err(e) = handle.await {
                    error!(env = %slot.env, error = %e, "scheduler task failed");
                }
            }
        }
    }

    /// Wait up to `timeout` for outstanding fetch tasks to finish.
    /// Returns whether everything drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut drained = true;
        for slot in &self.slots {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !slot.in_flight.drain(remaining).await {
                drained = false;
                break;
            }
        }
        if !drained {
            warn!(
                outstanding = self.in_flight(),
                timeout_secs = timeout.as_secs(),
                "fetch tasks still running after drain timeout"
            );
        }
        drained
    }
}
