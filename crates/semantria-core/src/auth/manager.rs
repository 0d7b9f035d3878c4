//! Session creation and reuse against the Semantria auth server.

use thiserror::Error;
use tracing::{debug, info};

use super::session::SessionResponse;
use super::{Credentials, Session};
use crate::api::{HttpExecutor, RequestOutcome, SignedRequest};
use crate::cache::SessionCache;
use crate::config::Config;

/// Application key identifying SDK clients to the auth server
pub const APP_KEY: &str = "cd954253-acaf-4dfa-a417-0a8cfb701f12";

/// Field of the auth server's error body carrying the message
const ERROR_MESSAGE_FIELD: &str = "error_message";

#[derive(Error, Debug)]
pub enum AuthError {
    /// The auth server rejected the request. `status` is 0 when the server
    /// could not be reached at all.
    #[error("Authentication error ({status}): {message}")]
    Credential { status: u16, message: String },

    #[error("Invalid session response: {0}")]
    InvalidSession(String),
}

impl AuthError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Credential { status, .. } => Some(*status),
            AuthError::InvalidSession(_) => None,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status() == Some(0)
    }

    fn from_outcome(outcome: &RequestOutcome) -> Self {
        let message = if outcome.is_transport_failure() {
            "no response from auth server".to_string()
        } else {
            outcome.error_field(ERROR_MESSAGE_FIELD).unwrap_or_default()
        };
        AuthError::Credential {
            status: outcome.status,
            message,
        }
    }
}

/// One request to the session endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAttempt {
    /// Validate a cached session id without sending the password.
    Cached(String),
    /// Log in with the credentials.
    Fresh,
}

impl SessionAttempt {
    /// Attempt to make when this one finds its session expired (404).
    /// Only a cached attempt has one, which bounds the retry to a single
    /// fresh login.
    pub fn fallback(&self) -> Option<SessionAttempt> {
        match self {
            SessionAttempt::Cached(_) => Some(SessionAttempt::Fresh),
            SessionAttempt::Fresh => None,
        }
    }
}

pub struct AuthService {
    executor: HttpExecutor,
    auth_url: String,
    cache: SessionCache,
}

impl AuthService {
    pub fn new(executor: HttpExecutor, config: &Config) -> Self {
        Self {
            executor,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            cache: SessionCache::new(config.session_dir.clone()),
        }
    }

    pub fn with_auth_url(mut self, auth_url: &str) -> Self {
        self.auth_url = auth_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Check a username/password pair. Does not keep or cache the session.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let credentials = Credentials::new(username, password);
        let outcome = self.send(&SessionAttempt::Fresh, &credentials).await;

        if outcome.status == 200 {
            Ok(())
        } else {
            Err(AuthError::from_outcome(&outcome))
        }
    }

    /// Get a session for `username`.
    ///
    /// With `reuse_existing`, a cached session id is validated first. If the
    /// server no longer knows it, one fresh login follows. Any failure clears
    /// the cached record.
    pub async fn get_session(
        &self,
        username: &str,
        password: &str,
        reuse_existing: bool,
    ) -> Result<Session, AuthError> {
        let credentials = Credentials::new(username, password);
        let cached = if reuse_existing { self.cache.load(username) } else { None };
        let attempt = match cached {
            Some(id) => SessionAttempt::Cached(id),
            None => SessionAttempt::Fresh,
        };

        let mut outcome = self.send(&attempt, &credentials).await;
        if outcome.status == 404 {
            if let Some(next) = attempt.fallback() {
                info!(username, "Cached session expired, logging in again");
                outcome = self.send(&next, &credentials).await;
            }
        }

        self.accept(&outcome, username)
    }

    /// Forget the cached session record.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    async fn send(&self, attempt: &SessionAttempt, credentials: &Credentials) -> RequestOutcome {
        let request = match attempt {
            SessionAttempt::Cached(id) => {
                SignedRequest::get(format!("{}/session/{}.json", self.auth_url, id))
            }
            SessionAttempt::Fresh => SignedRequest::post(format!("{}/session.json", self.auth_url))
                .with_header("Content-Type", "application/json")
                .with_body(credentials.payload().to_string()),
        };
        let kind = match attempt {
            SessionAttempt::Cached(_) => "cached",
            SessionAttempt::Fresh => "fresh",
        };
        debug!(attempt = kind, username = %credentials.username, "Requesting session");

        self.executor.execute(&request.with_param("appkey", APP_KEY)).await
    }

    fn accept(&self, outcome: &RequestOutcome, username: &str) -> Result<Session, AuthError> {
        if outcome.status != 200 {
            self.cache.clear();
            return Err(AuthError::from_outcome(outcome));
        }

        let body = outcome.body_text.as_deref().unwrap_or_default();
        let response: SessionResponse =
            serde_json::from_str(body).map_err(|e| AuthError::InvalidSession(e.to_string()))?;
        let session = response
            .into_session()
            .map_err(|field| AuthError::InvalidSession(format!("missing {}", field)))?;

        self.cache.save(&session.id, username);
        debug!(username, "Session established");
        Ok(session)
    }
}
