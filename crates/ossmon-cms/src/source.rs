//! The seam between the scheduler and the upstream API.
//!
//! The scheduler only needs "give me the latest samples for this metric".
//! `CmsClient` answers that against CloudMonitor; tests plug in scripted
//! sources.

use ossmon_core::{MetricName, OSS_NAMESPACE, Sample};

use crate::client::CmsClient;
use crate::error::FetchResult;
use crate::fetch::fetch;

pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Something that can fetch the latest samples of a metric for one
/// environment.
pub trait MetricSource: Send + Sync {
    fn fetch(&self, metric: MetricName) -> BoxFuture<'_, FetchResult<Vec<Sample>>>;
}

impl MetricSource for CmsClient {
    fn fetch(&self, metric: MetricName) -> BoxFuture<'_, FetchResult<Vec<Sample>>> {
        Box::pin(fetch(self, OSS_NAMESPACE, metric))
    }
}
