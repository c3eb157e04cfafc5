//! `DescribeMetricLast` fetcher.
//!
//! One call returns the latest datapoint of one metric for every bucket in
//! the account. The datapoints arrive as a JSON array encoded inside the
//! `Datapoints` string field.

use serde::Deserialize;
use tracing::debug;

use ossmon_core::{MetricName, Sample};

use crate::client::CmsClient;
use crate::error::{FetchError, FetchResult};

const ACTION: &str = "DescribeMetricLast";

/// Longest slice of an unparseable error body kept in `FetchError::Status`.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeMetricLastResponse {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    datapoints: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Fetch the latest datapoints of `metric` in `namespace`.
pub async fn fetch(
    client: &CmsClient,
    namespace: &str,
    metric: MetricName,
) -> FetchResult<Vec<Sample>> {
    let params = [("MetricName", metric.as_str()), ("Namespace", namespace)];
    let response = client.signed_request(ACTION, &params).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(status_error(status.as_u16(), &body));
    }

    decode_response(&body)
}

/// Decode a successful `DescribeMetricLast` response body.
pub fn decode_response(body: &str) -> FetchResult<Vec<Sample>> {
    let resp: DescribeMetricLastResponse = serde_json::from_str(body)?;

    if resp.success == Some(false) {
        return Err(FetchError::Api {
            code: resp.code.map(code_string).unwrap_or_default(),
            message: resp.message.unwrap_or_default(),
        });
    }

    let datapoints = resp.datapoints.ok_or(FetchError::MissingDatapoints)?;
    let samples = decode_datapoints(&datapoints)?;
    debug!(
        request_id = resp.request_id.as_deref().unwrap_or_default(),
        samples = samples.len(),
        "decoded datapoints"
    );
    Ok(samples)
}

/// Decode the JSON array carried in the `Datapoints` field.
pub fn decode_datapoints(raw: &str) -> FetchResult<Vec<Sample>> {
    Ok(serde_json::from_str(raw)?)
}

fn status_error(status: u16, body: &str) -> FetchError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => FetchError::Api {
            code: err.code,
            message: err.message,
        },
        Err(_) => FetchError::Status {
            status,
            body: truncate(body, MAX_ERROR_BODY).to_string(),
        },
    }
}

fn code_string(code: serde_json::Value) -> String {
    match code {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;

    use ossmon_core::{Credentials, Environment, OSS_NAMESPACE};

    use crate::client::make_client_for;

    const OK_BODY: &str = r#"{
        "Code": "200",
        "Success": true,
        "RequestId": "req-1",
        "Period": "60",
        "Datapoints": "[{\"timestamp\":1700000000000,\"userId\":\"1\",\"BucketName\":\"bucket-1\",\"region\":\"oss-cn-hangzhou\",\"value\":10.0},{\"timestamp\":1700000000000,\"userId\":\"1\",\"BucketName\":\"bucket-2\",\"storageType\":\"IA\",\"value\":2.5}]"
    }"#;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(endpoint: String) -> CmsClient {
        make_client_for(&Environment {
            name: "prod".to_string(),
            region: "cn-hangzhou".to_string(),
            credentials: Credentials {
                access_key_id: "LTAItest".to_string(),
                access_key_secret: "secret".to_string(),
            },
            endpoint: Some(endpoint),
        })
        .unwrap()
    }

    #[test]
    fn decode_response_extracts_samples() {
        let samples = decode_response(OK_BODY).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].bucket_name, "bucket-1");
        assert_eq!(samples[0].region_label(), "oss-cn-hangzhou");
        assert_eq!(samples[1].storage_type.as_deref(), Some("IA"));
        assert_eq!(samples[1].value, 2.5);
    }

    #[test]
    fn decode_response_capitalized_datapoint_keys() {
        let body = r#"{"Success":true,"Datapoints":"[{\"Timestamp\":1700000000000,\"bucketName\":\"logs\",\"Region\":\"oss-cn-hangzhou\",\"Value\":42.5},{\"BucketName\":\"assets\",\"Value\":7}]"}"#;
        let samples = decode_response(body).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].bucket_name, "logs");
        assert_eq!(samples[0].region_label(), "oss-cn-hangzhou");
        assert_eq!(samples[0].value, 42.5);
        assert_eq!(samples[1].bucket_name, "assets");
        assert_eq!(samples[1].value, 7.0);
    }

    #[test]
    fn decode_response_empty_array() {
        let samples = decode_response(r#"{"Success":true,"Datapoints":"[]"}"#).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn decode_response_api_failure() {
        let err = decode_response(
            r#"{"Success":false,"Code":"403","Message":"not authorized"}"#,
        )
        .unwrap_err();
        match err {
            FetchError::Api { code, message } => {
                assert_eq!(code, "403");
                assert_eq!(message, "not authorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_response_numeric_code() {
        let err = decode_response(r#"{"Success":false,"Code":500}"#).unwrap_err();
        assert!(matches!(err, FetchError::Api { ref code, .. } if code == "500"));
    }

    #[test]
    fn decode_response_missing_datapoints() {
        let err = decode_response(r#"{"Success":true}"#).unwrap_err();
        assert!(matches!(err, FetchError::MissingDatapoints));
    }

    #[test]
    fn decode_response_empty_datapoints_is_decode_error() {
        let err = decode_response(r#"{"Success":true,"Datapoints":""}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn decode_datapoints_malformed() {
        assert!(matches!(
            decode_datapoints("[{\"BucketName\":").unwrap_err(),
            FetchError::Decode(_)
        ));
        assert!(matches!(
            decode_datapoints("{\"not\":\"an array\"}").unwrap_err(),
            FetchError::Decode(_)
        ));
    }

    #[test]
    fn status_error_prefers_api_body() {
        let err = status_error(
            404,
            r#"{"Code":"InvalidAccessKeyId.NotFound","Message":"Specified access key is not found."}"#,
        );
        assert!(matches!(err, FetchError::Api { ref code, .. } if code == "InvalidAccessKeyId.NotFound"));

        let err = status_error(502, "<html>bad gateway</html>");
        assert!(matches!(err, FetchError::Status { status: 502, .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("ééé", 3), "é");
    }

    #[tokio::test]
    async fn fetch_sends_signed_query() {
        async fn handler(
            Query(params): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> impl IntoResponse {
            let signed = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("ACS3-HMAC-SHA256 Credential=LTAItest,"));
            let action = headers.get("x-acs-action").and_then(|v| v.to_str().ok());
            if !signed
                || action != Some("DescribeMetricLast")
                || params.get("MetricName").map(String::as_str) != Some("MeteringStorageUtilization")
                || params.get("Namespace").map(String::as_str) != Some("acs_oss_dashboard")
            {
                return (StatusCode::BAD_REQUEST, "unsigned".to_string());
            }
            (StatusCode::OK, OK_BODY.to_string())
        }

        let endpoint = serve(Router::new().route("/", post(handler))).await;
        let client = client_for(endpoint);

        let samples = fetch(&client, OSS_NAMESPACE, MetricName::MeteringStorageUtilization)
            .await
            .unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[tokio::test]
    async fn fetch_maps_error_status() {
        async fn handler() -> impl IntoResponse {
            (
                StatusCode::FORBIDDEN,
                r#"{"Code":"SignatureDoesNotMatch","Message":"bad signature"}"#,
            )
        }

        let endpoint = serve(Router::new().route("/", post(handler))).await;
        let client = client_for(endpoint);

        let err = fetch(&client, OSS_NAMESPACE, MetricName::MeteringCdnTX)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Api { ref code, .. } if code == "SignatureDoesNotMatch"));
    }

    #[tokio::test]
    async fn fetch_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{addr}"));
        let err = fetch(&client, OSS_NAMESPACE, MetricName::MeteringSyncTX)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
