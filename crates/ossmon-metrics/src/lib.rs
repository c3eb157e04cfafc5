//! ossmon-metrics — the exported gauge set.
//!
//! Fetch tasks from every environment write into one shared
//! [`GaugeStore`]; the `/metrics` handler renders its snapshot in the
//! Prometheus text exposition format.
//!
//! # Architecture
//!
//! ```text
//! GaugeStore
//!   ├── set() / apply() ← called by fetch tasks
//!   └── snapshot() → BTreeMap<GaugeKey, f64>
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod gauge;
pub mod prometheus;

pub use gauge::GaugeStore;
pub use prometheus::{BUCKET_INFO_METRIC, render_prometheus};
