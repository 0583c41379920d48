//! Session state shared across the billing controllers.
//!
//! Holds the bearer tokens, the signed-in cashier, the active location, and
//! the open register session. The Electron frontend kept all of this in a
//! global auth store; here it is an explicit context object handed to the
//! `ApiClient` and controllers at construction time.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Minimum plausible length of a bearer token.
const MIN_TOKEN_LEN: usize = 10;

/// Access/refresh token pair issued by the backend at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// The signed-in cashier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cashier {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// The location this till sells from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Mutable per-session state. Wrap in [`SharedSession`] to share between the
/// API client (token refresh) and the controllers.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub tokens: Option<AuthTokens>,
    pub cashier: Option<Cashier>,
    pub location: Option<LocationRef>,
    /// Register session id returned by the opening-amount call.
    pub register_session_id: Option<i64>,
}

pub type SharedSession = Arc<Mutex<SessionContext>>;

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Whether a plausible access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.tokens
            .as_ref()
            .map(|t| t.access_token.len() > MIN_TOKEN_LEN)
            .unwrap_or(false)
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.as_ref().map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.as_ref().map(|t| t.refresh_token.clone())
    }

    /// Replace the access token after a successful refresh, keeping the
    /// refresh token.
    pub fn update_access_token(&mut self, access_token: &str) {
        if let Some(tokens) = self.tokens.as_mut() {
            tokens.access_token = access_token.to_string();
        }
    }

    /// Drop everything tied to the signed-in cashier. Called when a token
    /// refresh fails and the operator must log in again.
    pub fn clear(&mut self) {
        self.tokens = None;
        self.cashier = None;
        self.register_session_id = None;
    }

    pub fn cashier_id(&self) -> Option<i64> {
        self.cashier.as_ref().map(|c| c.id)
    }

    pub fn location_id(&self) -> Option<i64> {
        self.location.as_ref().map(|l| l.id)
    }
}
