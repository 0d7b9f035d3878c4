//! Executes a single [`SignedRequest`] and normalizes the response.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use chrono::Utc;
use flate2::read::{GzDecoder, ZlibDecoder};
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use super::{ApiError, RequestOutcome, SignedRequest};
use crate::auth::signature::{authorization_header, oauth_params};
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

/// Connect and overall request timeout in seconds.
/// Document batches can take a while to be accepted, so this is generous.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// SDK identifier reported in `x-app-name`
const SDK_IDENTIFIER: &str = concat!("Rust/", env!("CARGO_PKG_VERSION"));

const ACCEPT_ENCODING_VALUE: &str = "gzip,deflate";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How server certificates are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Regular certificate and host name validation.
    #[default]
    Strict,
    /// Accept every certificate and host name. Only for legacy deployments
    /// that terminate TLS with self-signed certificates.
    AcceptInvalidCerts,
}

/// Performs signed requests.
///
/// The trust policy is fixed when the underlying client is built, so
/// constructing the executor is the one setup step; reuse it (or clones of
/// it, which share the connection pool) for every call.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    app_name: Option<String>,
    api_version: Option<String>,
}

impl HttpExecutor {
    pub fn new(tls: TlsPolicy) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS));

        if tls == TlsPolicy::AcceptInvalidCerts {
            warn!("TLS certificate validation is disabled for this client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            app_name: None,
            api_version: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Ok(Self::new(config.tls)?
            .with_app_name(config.app_name.clone())
            .with_api_version(config.api_version.clone()))
    }

    pub fn with_app_name(mut self, app_name: Option<String>) -> Self {
        self.app_name = app_name.filter(|s| !s.is_empty());
        self
    }

    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version.filter(|s| !s.is_empty());
        self
    }

    /// Value of the `x-app-name` header.
    ///
    /// The payload type is guessed from whether the URL mentions `json`.
    /// The server only uses it for reporting; do not build on it.
    pub fn app_name_header(&self, request: &SignedRequest) -> String {
        let format = if request.url().contains("json") { "JSON" } else { "XML" };
        match self.app_name.as_deref() {
            Some(app) => format!("{}/{}/{}", app, SDK_IDENTIFIER, format),
            None => format!("{}/{}", SDK_IDENTIFIER, format),
        }
    }

    /// Execute the request. Never fails: a problem before any status was
    /// read leaves `status` at 0 with empty bodies.
    pub async fn execute(&self, request: &SignedRequest) -> RequestOutcome {
        let mut outcome = RequestOutcome::default();

        if let Err(e) = self.perform(request, &mut outcome).await {
            error!(
                method = %request.method(),
                url = request.url(),
                params = ?request.params(),
                status = outcome.status,
                error = %e,
                "Error performing request"
            );
        }

        outcome
    }

    async fn perform(&self, request: &SignedRequest, outcome: &mut RequestOutcome) -> Result<(), ApiError> {
        let params = signed_params(request);
        let full_url = request.full_url_with(&params);

        let mut builder = self.client.request(request.method().clone(), &full_url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = builder
            .header(header::CONNECTION, "close")
            .header("x-app-name", self.app_name_header(request));

        if let Some(ref version) = self.api_version {
            builder = builder.header("x-api-version", version.as_str());
        }
        if request.accepts_compressed() {
            builder = builder.header(header::ACCEPT_ENCODING, ACCEPT_ENCODING_VALUE);
        }
        if let (Some(key), Some(secret_hash)) = (request.key(), request.secret_hash()) {
            builder = builder.header(
                header::AUTHORIZATION,
                authorization_header(&full_url, key, secret_hash)?,
            );
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_owned());
        }

        debug!(method = %request.method(), url = %full_url, "Sending request");
        let response = builder.send().await?;
        outcome.status = response.status().as_u16();
        trace!(status = outcome.status, "Received status");

        if response.status().is_success() {
            receive_success(request, response, outcome).await
        } else {
            receive_error(response, outcome).await
        }
    }
}

/// Caller parameters plus the OAuth parameters when a signing key is set.
fn signed_params(request: &SignedRequest) -> BTreeMap<String, String> {
    let mut params = request.params().clone();
    if let Some(key) = request.key() {
        let nonce: u32 = rand::random();
        params.extend(
            oauth_params(key, nonce, Utc::now().timestamp())
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );
    }
    params
}

async fn receive_success(
    request: &SignedRequest,
    response: Response,
    outcome: &mut RequestOutcome,
) -> Result<(), ApiError> {
    let encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase);

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            outcome.error_body = Some(format!("Error reading success response from server: {}", e));
            return Err(e.into());
        }
    };
    trace!(len = bytes.len(), "Read success response");

    let data = if request.accepts_compressed() {
        match decompress(&bytes, encoding.as_deref()) {
            Ok(data) => data,
            Err(e) => {
                outcome.error_body = Some(format!("Error reading success response from server: {}", e));
                return Err(ApiError::InvalidResponse(e.to_string()));
            }
        }
    } else {
        bytes.to_vec()
    };

    if request.is_binary() {
        outcome.body_bytes = Some(data);
    } else {
        outcome.body_text = Some(String::from_utf8_lossy(&data).into_owned());
    }
    Ok(())
}

async fn receive_error(response: Response, outcome: &mut RequestOutcome) -> Result<(), ApiError> {
    match response.bytes().await {
        Ok(bytes) => {
            outcome.error_body = Some(String::from_utf8_lossy(&bytes).into_owned());
            Ok(())
        }
        Err(e) => {
            outcome.error_body = Some(format!("Error reading error response from server: {}", e));
            Err(e.into())
        }
    }
}

/// Undo gzip or deflate content encoding. Bodies the server sent without an
/// encoding header are still checked for the gzip magic number.
fn decompress(data: &[u8], encoding: Option<&str>) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match encoding {
        _ if data.is_empty() => return Ok(out),
        Some(e) if e.contains("gzip") => GzDecoder::new(data).read_to_end(&mut out)?,
        Some(e) if e.contains("deflate") => ZlibDecoder::new(data).read_to_end(&mut out)?,
        None if data.starts_with(&GZIP_MAGIC) => GzDecoder::new(data).read_to_end(&mut out)?,
        _ => return Ok(data.to_vec()),
    };
    Ok(out)
}
