//! ossmon-scheduler — periodic collection across environments.
//!
//! The supervisor starts one [`EnvScheduler`] per configured environment.
//! Each scheduler runs an eager first pass and then, on every tick, spawns
//! one fetch task per metric. Fetch tasks fold their samples into the
//! shared [`GaugeStore`](ossmon_metrics::GaugeStore).
//!
//! # Architecture
//!
//! ```text
//! Supervisor
//!   ├── SourceFactory (Environment → MetricSource, fatal on error)
//!   ├── watch::Receiver<bool> shutdown, shared by every loop
//!   └── Per-environment EnvScheduler task
//!       ├── interval tick → dispatch() → M fetch tasks
//!       │   └── MetricSource::fetch() → GaugeStore::apply()
//!       └── InFlight (outstanding fetch tasks, drainable)
//! ```
//!
//! # Fan-out
//!
//! Ticks never wait for earlier fetches. With the default
//! `FanoutPolicy::Unbounded`, a fetch slower than the interval makes tasks
//! pile up. `FanoutPolicy::Bounded` caps outstanding tasks per environment
//! and skips dispatches over the cap.

pub mod error;
pub mod in_flight;
pub mod scheduler;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use error::{FatalError, FatalResult};
pub use in_flight::{InFlight, InFlightGuard};
pub use scheduler::{EnvScheduler, FanoutPolicy, SchedulerState, collect};
pub use supervisor::{SourceFactory, Supervisor, default_factory};
