//! ACS3-HMAC-SHA256 request signing.
//!
//! Signing is a pure function of the request parts, the credentials, the
//! timestamp, and the nonce. Callers supply the clock and nonce so the
//! output is reproducible.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use ossmon_core::Credentials;

pub const ALGORITHM: &str = "ACS3-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// The parts of a request that go into the signature.
#[derive(Debug, Clone)]
pub struct RequestToSign<'a> {
    pub method: &'a str,
    /// `host[:port]` exactly as sent in the Host header.
    pub host: &'a str,
    pub action: &'a str,
    pub version: &'a str,
    pub query: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

/// Headers to attach to a signed request, Host excluded (the HTTP client
/// sets it from the URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub headers: Vec<(&'static str, String)>,
    pub canonical_query: String,
}

/// Sign a request.
pub fn sign(
    req: &RequestToSign<'_>,
    credentials: &Credentials,
    now: DateTime<Utc>,
    nonce: &str,
) -> SignedHeaders {
    let content_sha256 = sha256_hex(req.body);
    let date = format_date(now);
    let canonical_query = canonical_query(req.query);

    // Already sorted by name.
    let signed: [(&'static str, &str); 6] = [
        ("host", req.host),
        ("x-acs-action", req.action),
        ("x-acs-content-sha256", &content_sha256),
        ("x-acs-date", &date),
        ("x-acs-signature-nonce", nonce),
        ("x-acs-version", req.version),
    ];

    let mut canonical_headers = String::new();
    for (name, value) in &signed {
        canonical_headers.push_str(name);
        canonical_headers.push(':');
        canonical_headers.push_str(value.trim());
        canonical_headers.push('\n');
    }
    let signed_names = signed.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        req.method, canonical_query, canonical_headers, signed_names, content_sha256
    );
    let string_to_sign = format!("{ALGORITHM}\n{}", sha256_hex(canonical_request.as_bytes()));
    let signature = hmac_sha256_hex(credentials.access_key_secret.as_bytes(), string_to_sign.as_bytes());

    let authorization = format!(
        "{ALGORITHM} Credential={},SignedHeaders={},Signature={}",
        credentials.access_key_id, signed_names, signature
    );

    let headers = signed
        .iter()
        .filter(|(name, _)| *name != "host")
        .map(|(name, value)| (*name, value.to_string()))
        .chain(std::iter::once(("authorization", authorization)))
        .collect();

    SignedHeaders {
        headers,
        canonical_query,
    }
}

/// Sorted, RFC 3986 encoded query string.
pub fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// `x-acs-date` format: UTC, second precision.
pub fn format_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}
