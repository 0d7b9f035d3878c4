//! API client for making signed calls against the Semantria API host.
//!
//! This is the generic mechanism the document, collection and configuration
//! calls are built on: it fills in the host, the session's signing key and
//! compression, and turns a [`RequestOutcome`] into a `Result`.

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use tracing::warn;

use super::{ApiError, HttpExecutor, RequestOutcome, SignedRequest};
use crate::auth::Session;
use crate::config::Config;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for Semantria.
/// Clone is cheap - the executor shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    executor: HttpExecutor,
    host: String,
    use_compression: bool,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(executor: HttpExecutor, config: &Config) -> Self {
        Self {
            executor,
            host: config.api_host.trim_end_matches('/').to_string(),
            use_compression: config.use_compression,
            session: None,
        }
    }

    /// Create a new ApiClient signing with the given session, sharing the
    /// connection pool.
    pub fn with_session(&self, session: Session) -> Self {
        Self {
            executor: self.executor.clone(),
            host: self.host.clone(),
            use_compression: self.use_compression,
            session: Some(session),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Build a request for `path` relative to the API host, signed with the
    /// current session if there is one.
    pub fn request(&self, method: Method, path: &str) -> SignedRequest {
        let url = format!("{}/{}", self.host, path.trim_start_matches('/'));
        let request = SignedRequest::new(method, url).with_compression(self.use_compression);
        match self.session {
            Some(ref session) => request.with_signing(&session.api_key, &session.api_secret_hash),
            None => request,
        }
    }

    pub async fn get_text(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
        let request = self.request(Method::GET, path).with_params(params.iter().copied());
        let outcome = self.send(&request).await?;
        Ok(outcome.body_text.unwrap_or_default())
    }

    pub async fn get_bytes(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<u8>, ApiError> {
        let request = self
            .request(Method::GET, path)
            .with_params(params.iter().copied())
            .binary();
        let outcome = self.send(&request).await?;
        Ok(outcome.body_bytes.unwrap_or_default())
    }

    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let request = self
            .request(Method::POST, path)
            .with_header("Content-Type", "application/json")
            .with_body(body);
        let outcome = self.send(&request).await?;
        Ok(outcome.body_text.unwrap_or_default())
    }

    /// Execute a request, retrying on rate limiting. Every attempt is signed
    /// afresh, so nonce and timestamp differ between attempts.
    pub async fn send(&self, request: &SignedRequest) -> Result<RequestOutcome, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let outcome = self.executor.execute(request).await;
            if outcome.status != 429 {
                return Self::check_outcome(request, outcome);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(url = request.url(), retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }

    fn check_outcome(request: &SignedRequest, outcome: RequestOutcome) -> Result<RequestOutcome, ApiError> {
        if outcome.is_success() {
            Ok(outcome)
        } else if outcome.is_transport_failure() {
            Err(ApiError::Transport(request.url().to_string()))
        } else {
            let body = outcome.error_body.as_deref().unwrap_or_default();
            Err(ApiError::from_status(outcome.status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TlsPolicy;
    use crate::auth::signature::hash_secret;

    fn client() -> ApiClient {
        let config = Config {
            api_host: "https://api.test/".to_string(),
            use_compression: true,
            ..Config::default()
        };
        ApiClient::new(HttpExecutor::new(TlsPolicy::Strict).unwrap(), &config)
    }

    #[test]
    fn test_request_without_session_is_unsigned() {
        let request = client().request(Method::GET, "/status.json");
        assert_eq!(request.url(), "https://api.test/status.json");
        assert!(request.key().is_none());
        assert!(request.wants_compression());
    }

    #[test]
    fn test_request_with_session_is_signed() {
        let session = Session {
            id: "s1".to_string(),
            api_key: "k".to_string(),
            api_secret_hash: hash_secret("s"),
        };
        let client = client().with_session(session);
        let request = client.request(Method::GET, "status.json");
        assert_eq!(request.key(), Some("k"));
        assert_eq!(request.secret_hash(), Some(hash_secret("s").as_str()));
    }

    #[test]
    fn test_check_outcome() {
        let request = SignedRequest::get("https://api.test/status.json");

        let transport = ApiClient::check_outcome(&request, RequestOutcome::default());
        assert!(matches!(transport, Err(ApiError::Transport(_))));

        let denied = RequestOutcome {
            status: 403,
            error_body: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ApiClient::check_outcome(&request, denied),
            Err(ApiError::AccessDenied(body)) if body == "nope"
        ));

        let ok = RequestOutcome {
            status: 200,
            body_text: Some("{}".to_string()),
            ..Default::default()
        };
        assert!(ApiClient::check_outcome(&request, ok).is_ok());
    }
}
