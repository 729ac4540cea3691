//! Provider Authentication and Token Caching
//!
//! This module owns the bearer credential used on every provider call. Tokens
//! are obtained from the provider's OAuth-style token endpoint and cached with
//! their expiry; callers never see the refresh machinery, they just ask the
//! store for a bearer token before each request.
//!
//! # Token Lifecycle
//!
//! - A cached access token is served as long as it expires more than 5 minutes
//!   from now.
//! - A stale token is renewed with the refresh-token grant when a refresh
//!   token is on hand; a rejected refresh token is discarded and the store
//!   falls back to a full password grant.
//! - The password grant reads `ALAI_EMAIL`, `ALAI_PASSWORD` and `ALAI_API_KEY`
//!   from the environment (via [`Credentials::from_env`]).
//!
//! The cache lives behind an async mutex, so a single store can be shared
//! (via `Arc`) across every collaborator that talks to the provider.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use deckhand_core::auth::{CredentialStore, Credentials};
//!
//! let credentials = Credentials::from_env()?;
//! let store = Arc::new(CredentialStore::new("https://api.getalai.com", credentials));
//!
//! // First call authenticates, later calls hit the cache until expiry.
//! let token = store.bearer().await?;
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

/// Seconds before expiry at which a token is considered stale
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 300;

/// Token lifetime assumed when the grant response omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Environment variable holding the provider account email
pub const EMAIL_VAR: &str = "ALAI_EMAIL";

/// Environment variable holding the provider account password
pub const PASSWORD_VAR: &str = "ALAI_PASSWORD";

/// Environment variable holding the provider API key
pub const API_KEY_VAR: &str = "ALAI_API_KEY";

const SUPABASE_CLIENT_INFO: &str = "supabase-js-web/2.45.4";
const SUPABASE_API_VERSION: &str = "2024-01-01";

/// Errors raised by credential acquisition
///
/// Every variant is fatal for the run: without a bearer token no provider
/// call can succeed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential is not present in the environment
    #[error("missing credential in environment: {0}")]
    MissingCredential(&'static str),

    /// The token endpoint rejected a grant
    #[error("{grant} grant rejected with status {status}: {body}")]
    GrantRejected {
        /// Which grant was attempted
        grant: &'static str,
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Response body returned by the token endpoint
        body: String,
    },

    /// The token endpoint could not be reached or returned garbage
    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Provider account credentials read from the environment
#[derive(Clone)]
pub struct Credentials {
    /// Account email for the password grant
    pub email: String,
    /// Account password for the password grant
    pub password: String,
    /// Provider API key sent with every token request
    pub api_key: String,
}

impl Credentials {
    /// Read credentials from `ALAI_EMAIL`, `ALAI_PASSWORD` and `ALAI_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] naming the first variable that
    /// is unset.
    pub fn from_env() -> Result<Self, AuthError> {
        let email =
            std::env::var(EMAIL_VAR).map_err(|_| AuthError::MissingCredential(EMAIL_VAR))?;
        let password =
            std::env::var(PASSWORD_VAR).map_err(|_| AuthError::MissingCredential(PASSWORD_VAR))?;
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| AuthError::MissingCredential(API_KEY_VAR))?;
        Ok(Self {
            email,
            password,
            api_key,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose secrets in debug output
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Cached token material with its expiry instant
#[derive(Clone, Debug)]
struct TokenState {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    fn from_grant(response: GrantResponse, now: DateTime<Utc>) -> Self {
        let lifetime = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now + chrono::Duration::seconds(lifetime),
        }
    }

    /// A token is fresh while its expiry is more than the buffer away
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + chrono::Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS)
    }
}

/// Body of a successful token grant
#[derive(Debug, Deserialize)]
struct GrantResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Thread-safe bearer token cache for the presentation provider
///
/// One store is created per run and shared across all collaborators. The
/// mutex is held across the token request itself, so concurrent callers never
/// trigger duplicate grants.
pub struct CredentialStore {
    auth_base: String,
    credentials: Credentials,
    http: reqwest::Client,
    state: Mutex<Option<TokenState>>,
}

impl CredentialStore {
    /// Create a new store for the given token endpoint base URL
    pub fn new(auth_base: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            auth_base: auth_base.into(),
            credentials,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            state: Mutex::new(None),
        }
    }

    /// Get a bearer token, authenticating or refreshing as needed
    ///
    /// Serves the cached token while it is fresh; otherwise renews it via the
    /// refresh-token grant (falling back to the password grant when the
    /// refresh token is absent or rejected).
    ///
    /// # Errors
    ///
    /// Returns an error when no grant succeeds; see [`AuthError`].
    pub async fn bearer(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(current) = state.as_ref() {
            if current.is_fresh(now) {
                return Ok(current.access_token.clone());
            }
        }

        // Prefer the refresh grant when a refresh token is on hand.
        let refresh_token = state.as_ref().and_then(|s| s.refresh_token.clone());
        if let Some(token) = refresh_token {
            match self.refresh_grant(&token).await {
                Ok(fresh) => {
                    tracing::debug!("access token renewed via refresh grant");
                    let access = fresh.access_token.clone();
                    *state = Some(fresh);
                    return Ok(access);
                }
                Err(error) => {
                    // A rejected refresh token is dead; forget it so we never
                    // retry it. Transport errors keep it for next time.
                    if matches!(error, AuthError::GrantRejected { .. }) {
                        if let Some(s) = state.as_mut() {
                            s.refresh_token = None;
                        }
                    }
                    tracing::warn!(
                        error = %error,
                        "token refresh failed, falling back to password grant"
                    );
                }
            }
        }

        let fresh = self.password_grant().await?;
        tracing::debug!("authenticated via password grant");
        let access = fresh.access_token.clone();
        *state = Some(fresh);
        Ok(access)
    }

    async fn password_grant(&self) -> Result<TokenState, AuthError> {
        let payload = serde_json::json!({
            "email": self.credentials.email,
            "password": self.credentials.password,
        });
        self.grant("password", &payload).await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenState, AuthError> {
        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        self.grant("refresh_token", &payload).await
    }

    async fn grant(
        &self,
        grant_type: &'static str,
        payload: &serde_json::Value,
    ) -> Result<TokenState, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type={grant_type}", self.auth_base);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en")
            .header("apikey", &self.credentials.api_key)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.credentials.api_key),
            )
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json;charset=UTF-8",
            )
            .header("x-client-info", SUPABASE_CLIENT_INFO)
            .header("x-supabase-api-version", SUPABASE_API_VERSION)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::GrantRejected {
                grant: grant_type,
                status,
                body,
            });
        }

        let data: GrantResponse = response.json().await?;
        Ok(TokenState::from_grant(data, Utc::now()))
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("auth_base", &self.auth_base)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
