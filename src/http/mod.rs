//! Shared HTTP client and wire-level helpers.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ClientError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No request timeout is set here: chat streams are long-lived and apply
/// their own deadline in `ChatSession`. Plain REST calls go through
/// `util::with_timeout` / the retry policy instead.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for the bearer-token backend API.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Parse a stream frame's `data:` line, returning the JSON payload.
///
/// The backend emits `data: <json>`; some proxies drop the space after the
/// colon, so both forms are accepted. Non-data lines return `None`.
pub fn parse_sse_data(frame: &str) -> Option<&str> {
    let data = frame.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

/// Map a non-2xx HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> ClientError {
    match status {
        401 | 403 => ClientError::Authentication(body.to_string()),
        429 => ClientError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ClientError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    // Backend reports retry_after in seconds inside the JSON error body.
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
