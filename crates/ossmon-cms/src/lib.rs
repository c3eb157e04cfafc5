//! ossmon-cms — Aliyun CloudMonitor access for the exporter.
//!
//! Builds per-environment clients, signs requests with ACS3-HMAC-SHA256,
//! and decodes `DescribeMetricLast` responses into [`Sample`]s.
//!
//! # Architecture
//!
//! ```text
//! make_client(region, key id, secret) → CmsClient
//!   └── MetricSource::fetch(metric)
//!       ├── signer::sign() → x-acs-* + Authorization headers
//!       ├── POST https://metrics.{region}.aliyuncs.com/?MetricName=..&Namespace=..
//!       └── decode_response() → Vec<Sample> | FetchError
//! ```
//!
//! [`Sample`]: ossmon_core::Sample

pub mod client;
pub mod error;
pub mod fetch;
pub mod signer;
pub mod source;

pub use client::{CmsClient, make_client, make_client_for};
pub use error::{ClientError, ClientResult, FetchError, FetchResult};
pub use fetch::{decode_datapoints, decode_response, fetch};
pub use source::{BoxFuture, MetricSource};
