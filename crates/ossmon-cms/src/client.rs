//! CloudMonitor client factory.
//!
//! A `CmsClient` is bound to one region and one credential pair. It holds
//! its own connection pool and is never shared across environments.

use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use tracing::debug;

use ossmon_core::{Credentials, Environment};

use crate::error::{ClientError, ClientResult};
use crate::signer::{self, RequestToSign};

/// Connect timeout for every CloudMonitor request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a whole CloudMonitor request, response body included.
pub const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// CloudMonitor OpenAPI version.
pub const API_VERSION: &str = "2019-01-01";

/// Authenticated handle to the CloudMonitor API for one environment.
#[derive(Debug, Clone)]
pub struct CmsClient {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
}

/// Build a client for the regional CloudMonitor endpoint.
pub fn make_client(
    region: &str,
    access_key_id: &str,
    access_key_secret: &str,
) -> ClientResult<CmsClient> {
    build(region, access_key_id, access_key_secret, None)
}

/// Build a client for an environment, honouring its endpoint override.
pub fn make_client_for(env: &Environment) -> ClientResult<CmsClient> {
    build(
        &env.region,
        &env.credentials.access_key_id,
        &env.credentials.access_key_secret,
        env.endpoint.as_deref(),
    )
}

fn build(
    region: &str,
    access_key_id: &str,
    access_key_secret: &str,
    endpoint: Option<&str>,
) -> ClientResult<CmsClient> {
    validate_region(region)?;
    validate_key("access key id", access_key_id)?;
    validate_key("access key secret", access_key_secret)?;

    let endpoint = match endpoint {
        Some(e) => parse_endpoint(e)?,
        None => parse_endpoint(&format!("https://metrics.{region}.aliyuncs.com"))?,
    };

    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(READ_TIMEOUT)
        .build()?;

    debug!(%region, endpoint = %endpoint, "cms client created");

    Ok(CmsClient {
        http,
        endpoint,
        credentials: Credentials {
            access_key_id: access_key_id.to_string(),
            access_key_secret: access_key_secret.to_string(),
        },
    })
}

impl CmsClient {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build a signed POST for an RPC-style action. Parameters travel in the
    /// query string; the body is empty.
    pub(crate) fn signed_request(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        let host = host_header(&self.endpoint);
        let nonce = uuid::Uuid::new_v4().to_string();
        let signed = signer::sign(
            &RequestToSign {
                method: "POST",
                host: &host,
                action,
                version: API_VERSION,
                query: params,
                body: b"",
            },
            &self.credentials,
            Utc::now(),
            &nonce,
        );

        let mut url = self.endpoint.clone();
        url.set_path("/");
        url.set_query(Some(&signed.canonical_query));

        let mut request = self.http.post(url);
        for (name, value) in signed.headers {
            request = request.header(name, value);
        }
        request
    }
}

/// `host[:port]` as reqwest will send it; default ports are omitted.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn validate_region(region: &str) -> ClientResult<()> {
    let valid = !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ClientError::InvalidRegion(region.to_string()))
    }
}

fn validate_key(what: &str, value: &str) -> ClientResult<()> {
    if value.is_empty() {
        return Err(ClientError::InvalidCredential(format!("{what} is empty")));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ClientError::InvalidCredential(format!(
            "{what} contains whitespace or control characters"
        )));
    }
    Ok(())
}

fn parse_endpoint(endpoint: &str) -> ClientResult<Url> {
    let invalid = |reason: String| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}
