//! Billing backend API client.
//!
//! Provides authenticated JSON-over-HTTP communication with the remote
//! billing/inventory backend. Every endpoint answers with the same envelope,
//! `{status, data | error_message | message}`; logical failures
//! (`status=false`) are surfaced verbatim and never retried. A 401 triggers
//! a single token refresh followed by one retry of the original request.

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::session::SharedSession;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach the billing backend at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid billing backend URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Session token is invalid or expired".to_string(),
        403 => "Cashier is not authorized for this operation".to_string(),
        404 => "Billing backend endpoint not found".to_string(),
        s if s >= 500 => format!("Billing backend server error (HTTP {s})"),
        s => format!("Unexpected response from billing backend (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The `{status, data | error_message | message}` envelope every billing
/// backend endpoint answers with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiResponse {
    fn ok_empty() -> Self {
        Self {
            status: true,
            ..Self::default()
        }
    }

    /// The backend's own wording of a logical failure.
    pub fn error_text(&self) -> String {
        self.error_message
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "The billing backend reported a failure".to_string())
    }

    /// Fail with the backend's verbatim message when `status=false`.
    pub fn require_status(self) -> Result<Self, String> {
        if self.status {
            Ok(self)
        } else {
            Err(self.error_text())
        }
    }

    /// `data` as an integer id, accepting both number and numeric-string
    /// encodings (the backend is inconsistent across endpoints).
    pub fn data_i64(&self) -> Option<i64> {
        match self.data.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `data` as a monetary amount.
    pub fn data_f64(&self) -> Option<f64> {
        match self.data.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `data` as a flag, either a bare boolean or an object carrying the
    /// given key (`isOpen` / `isClosed` style).
    pub fn data_flag(&self, key: &str) -> Option<bool> {
        match self.data.as_ref()? {
            Value::Bool(b) => Some(*b),
            Value::Object(map) => map.get(key).and_then(Value::as_bool),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client bound to one backend endpoint and one session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    session: SharedSession,
}

impl ApiClient {
    pub fn new(config: ApiConfig, session: SharedSession) -> Result<Self, String> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub async fn get(&self, path: &str, auth: bool) -> Result<ApiResponse, String> {
        self.request(Method::GET, path, None, auth).await
    }

    pub async fn post(&self, path: &str, body: &Value, auth: bool) -> Result<ApiResponse, String> {
        self.request(Method::POST, path, Some(body), auth).await
    }

    pub async fn delete(&self, path: &str, auth: bool) -> Result<ApiResponse, String> {
        self.request(Method::DELETE, path, None, auth).await
    }

    /// Perform one request against the backend, refreshing the access token
    /// and retrying once on 401.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: bool,
    ) -> Result<ApiResponse, String> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut refreshed = false;

        loop {
            let mut req = self
                .http
                .request(method.clone(), &url)
                .header("Content-Type", "application/json");

            if auth {
                let token = {
                    let session = self.session.lock().map_err(|e| e.to_string())?;
                    if !session.is_authenticated() {
                        return Err("Authentication required".to_string());
                    }
                    session.access_token().unwrap_or_default()
                };
                req = req.bearer_auth(token);
            }

            if let Some(b) = body {
                req = req.json(b);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| friendly_error(&self.config.base_url, &e))?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED && auth && !refreshed {
                warn!(path = %path, "Request rejected with 401, attempting token refresh");
                self.refresh_access_token().await.map_err(|e| {
                    if let Ok(mut session) = self.session.lock() {
                        session.clear();
                    }
                    format!("Session expired: {e}")
                })?;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                let body_text = resp.text().await.unwrap_or_default();
                return Err(http_failure_detail(status, &body_text));
            }

            let body_text = resp.text().await.unwrap_or_default();
            return parse_envelope(&body_text);
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The backend expects the token as a query parameter; some deployments
    /// only accept the JSON-body form and answer 422 to the former, so that
    /// shape is tried second.
    async fn refresh_access_token(&self) -> Result<String, String> {
        let refresh_token = {
            let session = self.session.lock().map_err(|e| e.to_string())?;
            session
                .refresh_token()
                .ok_or_else(|| "No refresh token available".to_string())?
        };

        let url = format!("{}/auth/refresh-token", self.config.base_url);
        let mut resp = self
            .http
            .post(&url)
            .query(&[("refresh_token", refresh_token.as_str())])
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| friendly_error(&self.config.base_url, &e))?;

        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY {
            warn!("Refresh with query parameter returned 422, retrying with JSON body");
            resp = self
                .http
                .post(&url)
                .json(&serde_json::json!({ "refresh_token": refresh_token }))
                .send()
                .await
                .map_err(|e| friendly_error(&self.config.base_url, &e))?;
        }

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(http_failure_detail(status, &body_text));
        }

        #[derive(Deserialize)]
        struct RefreshResponse {
            access_token: String,
        }

        let parsed: RefreshResponse = resp
            .json()
            .await
            .map_err(|_| "Invalid response from refresh token endpoint".to_string())?;

        {
            let mut session = self.session.lock().map_err(|e| e.to_string())?;
            session.update_access_token(&parsed.access_token);
        }
        info!("Access token refreshed");
        Ok(parsed.access_token)
    }
}

/// Decode a successful response body into the standard envelope.
///
/// A few inventory endpoints answer with a bare JSON array instead of the
/// `{status, data}` envelope; those are normalised into a successful
/// envelope here so callers see one shape.
fn parse_envelope(body_text: &str) -> Result<ApiResponse, String> {
    if body_text.trim().is_empty() {
        return Ok(ApiResponse::ok_empty());
    }
    let value: Value = serde_json::from_str(body_text)
        .map_err(|e| format!("Invalid JSON from billing backend: {e}"))?;
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| format!("Invalid JSON from billing backend: {e}")),
        other => Ok(ApiResponse {
            status: true,
            data: Some(other),
            ..ApiResponse::default()
        }),
    }
}

/// Build an error message for a non-2xx response, preserving any detail the
/// backend included in the body.
fn http_failure_detail(status: StatusCode, body_text: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body_text) {
        let message = json
            .get("error_message")
            .or_else(|| json.get("error"))
            .or_else(|| json.get("message"))
            .or_else(|| json.get("detail"))
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .unwrap_or_else(|| status_error(status));
        format!("{message} (HTTP {})", status.as_u16())
    } else if !body_text.trim().is_empty() {
        format!(
            "{} (HTTP {}): {}",
            status_error(status),
            status.as_u16(),
            body_text.trim()
        )
    } else {
        format!("{} (HTTP {})", status_error(status), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_failure_message_is_surfaced_verbatim() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{"status": false, "error_message": "Bill 42 is already completed"}"#,
        )
        .expect("parse envelope");
        let err = resp.require_status().expect_err("status=false must fail");
        assert_eq!(err, "Bill 42 is already completed");
    }

    #[test]
    fn envelope_failure_falls_back_to_message_field() {
        let resp: ApiResponse =
            serde_json::from_str(r#"{"status": false, "message": "Register is closed"}"#)
                .expect("parse envelope");
        assert_eq!(
            resp.require_status().expect_err("must fail"),
            "Register is closed"
        );
    }

    #[test]
    fn data_id_accepts_number_and_string_encodings() {
        let as_number: ApiResponse =
            serde_json::from_str(r#"{"status": true, "data": 91}"#).expect("parse");
        let as_string: ApiResponse =
            serde_json::from_str(r#"{"status": true, "data": "91"}"#).expect("parse");
        assert_eq!(as_number.data_i64(), Some(91));
        assert_eq!(as_string.data_i64(), Some(91));
    }

    #[test]
    fn data_flag_reads_bare_bool_and_keyed_object() {
        let bare: ApiResponse =
            serde_json::from_str(r#"{"status": true, "data": true}"#).expect("parse");
        let keyed: ApiResponse =
            serde_json::from_str(r#"{"status": true, "data": {"isOpen": false}}"#).expect("parse");
        assert_eq!(bare.data_flag("isOpen"), Some(true));
        assert_eq!(keyed.data_flag("isOpen"), Some(false));
    }

    #[test]
    fn bare_array_body_is_normalised_into_the_envelope() {
        let resp = parse_envelope(r#"[{"id": 1}, {"id": 2}]"#).expect("parse");
        assert!(resp.status);
        assert_eq!(resp.data.as_ref().and_then(|d| d.as_array()).map(Vec::len), Some(2));

        let empty = parse_envelope("  ").expect("parse empty");
        assert!(empty.status);
        assert!(empty.data.is_none());
    }

    #[test]
    fn http_failure_detail_prefers_backend_wording() {
        let detail = http_failure_detail(
            StatusCode::BAD_REQUEST,
            r#"{"error_message": "LocationID is required"}"#,
        );
        assert_eq!(detail, "LocationID is required (HTTP 400)");

        let plain = http_failure_detail(StatusCode::NOT_FOUND, "");
        assert_eq!(plain, "Billing backend endpoint not found (HTTP 404)");
    }
}
