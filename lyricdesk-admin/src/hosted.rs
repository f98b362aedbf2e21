//! HTTP client for the hosted database service
//!
//! Shared by [`crate::catalog::RestCatalog`] and
//! [`crate::identity::RestIdentityAdmin`]. Every request carries the service
//! key both as `apikey` and as a bearer token.

use lyricdesk_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("lyricdesk-admin/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Authenticated client for one hosted project
#[derive(Clone)]
pub struct HostedClient {
    http: reqwest::Client,
    base_url: String,
}

impl HostedClient {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key)
            .map_err(|_| Error::Config("service key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_key))
            .map_err(|_| Error::Config("service key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Request against a table of the REST interface
    pub fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
    }

    /// Request against the identity service
    pub fn auth(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
    }

    /// Send and turn non-success statuses into [`Error::Backend`]
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Hosted service request failed: {}", e)))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url().path(), "Hosted service response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Backend(error_message(status.as_u16(), &body)))
    }

    /// Send and decode a JSON body
    pub async fn send_json<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Unexpected hosted service response: {}", e)))
    }
}

/// Best human-readable message from an error body
fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(Value::String(msg)) = map.get(key) {
                if !msg.is_empty() {
                    return msg.clone();
                }
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("Hosted service returned HTTP {}", status)
    } else {
        body.to_string()
    }
}

/// `eq.<value>` filter
pub fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// `in.("a","b")` filter with every value quoted
pub fn in_list<S: AsRef<str>>(values: &[S]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v.as_ref())).collect();
    format!("in.({})", quoted.join(","))
}

/// Double-quote a filter value, escaping `"` and `\`
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Total row count from a `Content-Range: 0-19/57` header
pub fn content_range_total(header: Option<&str>) -> Option<i64> {
    header?.rsplit('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_fields() {
        assert_eq!(
            error_message(409, r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            error_message(422, r#"{"code":422,"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(error_message(502, "Bad gateway"), "Bad gateway");
        assert_eq!(error_message(500, ""), "Hosted service returned HTTP 500");
    }

    #[test]
    fn test_filters() {
        assert_eq!(eq("abc"), "eq.abc");
        assert_eq!(in_list(&["a", "b,c"]), r#"in.("a","b,c")"#);
        assert_eq!(quote(r#"say "hi"\"#), r#""say \"hi\"\\""#);
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total(Some("0-19/57")), Some(57));
        assert_eq!(content_range_total(Some("*/0")), Some(0));
        assert_eq!(content_range_total(Some("0-19/*")), None);
        assert_eq!(content_range_total(None), None);
    }
}
