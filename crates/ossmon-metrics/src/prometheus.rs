//! Prometheus text exposition format.
//!
//! Renders a gauge snapshot as the single `aliyun_oss_bucket_info` family,
//! one series per (env, bucketName, region, type).

use std::collections::BTreeMap;

use ossmon_core::GaugeKey;

/// Metric family name of every exported series.
pub const BUCKET_INFO_METRIC: &str = "aliyun_oss_bucket_info";

const BUCKET_INFO_HELP: &str = "aliyun oss bucket info";

/// Render a gauge snapshot into Prometheus text format.
pub fn render_prometheus(snapshot: &BTreeMap<GaugeKey, f64>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# HELP {BUCKET_INFO_METRIC} {BUCKET_INFO_HELP}\n"));
    out.push_str(&format!("# TYPE {BUCKET_INFO_METRIC} gauge\n"));
    for (key, value) in snapshot {
        out.push_str(&format!(
            "{BUCKET_INFO_METRIC}{{env=\"{}\",bucketName=\"{}\",region=\"{}\",type=\"{}\"}} {}\n",
            escape_label(&key.env),
            escape_label(&key.resource),
            escape_label(&key.region),
            key.metric.as_str(),
            format_value(*value),
        ));
    }

    out
}

fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
