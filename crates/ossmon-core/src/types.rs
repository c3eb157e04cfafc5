//! Domain types shared by the fetcher, the gauge store, and the scheduler.
//!
//! Environments are loaded once from config and never change. Samples are
//! decoded per fetch and dropped after being folded into the gauge store.

use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Unique name of a monitored environment (the `env` label).
pub type EnvName = String;

/// CloudMonitor namespace holding the OSS dashboard metrics.
pub const OSS_NAMESPACE: &str = "acs_oss_dashboard";

// ── Metrics ────────────────────────────────────────────────────────

/// The fixed set of OSS dashboard metrics polled for every environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricName {
    /// Billed storage size.
    MeteringStorageUtilization,
    /// Billed internet egress traffic.
    MeteringInternetTX,
    /// Billed CDN egress traffic.
    MeteringCdnTX,
    /// Billed cross-region replication egress traffic.
    MeteringSyncTX,
}

impl MetricName {
    /// Every metric, in dispatch order.
    pub const ALL: [MetricName; 4] = [
        MetricName::MeteringStorageUtilization,
        MetricName::MeteringInternetTX,
        MetricName::MeteringCdnTX,
        MetricName::MeteringSyncTX,
    ];

    /// The upstream metric identifier, also used as the `type` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::MeteringStorageUtilization => "MeteringStorageUtilization",
            MetricName::MeteringInternetTX => "MeteringInternetTX",
            MetricName::MeteringCdnTX => "MeteringCdnTX",
            MetricName::MeteringSyncTX => "MeteringSyncTX",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Samples ────────────────────────────────────────────────────────

/// One datapoint returned by `DescribeMetricLast`.
///
/// Keys are matched ignoring ASCII case, since the upstream is not
/// consistent about `value` vs `Value`. Missing or null fields keep their
/// defaults and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sample {
    /// Upstream timestamp in epoch milliseconds. Carried through, never
    /// interpreted.
    pub timestamp: i64,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "BucketName")]
    pub bucket_name: String,
    #[serde(rename = "storageType", skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub value: f64,
}

impl Sample {
    /// Region label for this sample, empty when upstream omitted it.
    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
enum SampleField {
    Timestamp,
    UserId,
    BucketName,
    StorageType,
    Region,
    Value,
}

impl SampleField {
    fn from_key(key: &str) -> Option<Self> {
        const FIELDS: [(&str, SampleField); 6] = [
            ("timestamp", SampleField::Timestamp),
            ("userId", SampleField::UserId),
            ("BucketName", SampleField::BucketName),
            ("storageType", SampleField::StorageType),
            ("region", SampleField::Region),
            ("value", SampleField::Value),
        ];
        FIELDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, field)| *field)
    }
}

impl<'de> Deserialize<'de> for Sample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SampleVisitor)
    }
}

struct SampleVisitor;

impl<'de> Visitor<'de> for SampleVisitor {
    type Value = Sample;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a datapoint object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Sample, A::Error> {
        let mut sample = Sample::default();

        while let Some(key) = map.next_key::<String>()? {
            match SampleField::from_key(&key) {
                Some(SampleField::Timestamp) => {
                    if let Some(v) = map.next_value::<Option<i64>>()? {
                        sample.timestamp = v;
                    }
                }
                Some(SampleField::UserId) => {
                    if let Some(v) = map.next_value::<Option<String>>()? {
                        sample.user_id = v;
                    }
                }
                Some(SampleField::BucketName) => {
                    if let Some(v) = map.next_value::<Option<String>>()? {
                        sample.bucket_name = v;
                    }
                }
                Some(SampleField::StorageType) => {
                    if let Some(v) = map.next_value::<Option<String>>()? {
                        sample.storage_type = Some(v);
                    }
                }
                Some(SampleField::Region) => {
                    if let Some(v) = map.next_value::<Option<String>>()? {
                        sample.region = Some(v);
                    }
                }
                Some(SampleField::Value) => {
                    if let Some(v) = map.next_value::<Option<f64>>()? {
                        sample.value = v;
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(sample)
    }
}

// ── Gauge keys ─────────────────────────────────────────────────────

/// Label set identifying one exported series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GaugeKey {
    pub env: EnvName,
    /// Owning resource (bucket name).
    pub resource: String,
    pub region: String,
    pub metric: MetricName,
}

impl GaugeKey {
    pub fn new(
        env: impl Into<String>,
        resource: impl Into<String>,
        region: impl Into<String>,
        metric: MetricName,
    ) -> Self {
        Self {
            env: env.into(),
            resource: resource.into(),
            region: region.into(),
            metric,
        }
    }
}

// ── Environments ───────────────────────────────────────────────────

/// Access key pair for one Aliyun account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

/// One monitored tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: EnvName,
    pub region: String,
    pub credentials: Credentials,
    /// Overrides the regional CloudMonitor endpoint (scheme + authority).
    pub endpoint: Option<String>,
}
