use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value;

/// Everything needed to perform one API call.
///
/// Built once with the `with_*` methods and then handed to
/// [`HttpExecutor::execute`](super::HttpExecutor::execute) by reference, so
/// nothing from one call can leak into the next.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    method: Method,
    url: String,
    params: BTreeMap<String, String>,
    body: Option<String>,
    headers: BTreeMap<String, String>,
    key: Option<String>,
    secret_hash: Option<String>,
    binary: bool,
    compression: bool,
}

impl SignedRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: BTreeMap::new(),
            body: None,
            headers: BTreeMap::new(),
            key: None,
            secret_hash: None,
            binary: false,
            compression: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sign the request with a session key and the hashed session secret.
    pub fn with_signing(mut self, key: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        let key = key.into();
        let secret_hash = secret_hash.into();
        self.key = (!key.is_empty()).then_some(key);
        self.secret_hash = (!secret_hash.is_empty()).then_some(secret_hash);
        self
    }

    /// Keep the response as raw bytes instead of decoding it as text.
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn secret_hash(&self) -> Option<&str> {
        self.secret_hash.as_deref()
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn wants_compression(&self) -> bool {
        self.compression
    }

    /// Whether the request asks the server for a compressed response.
    /// Only GET requests negotiate compression.
    pub fn accepts_compressed(&self) -> bool {
        self.compression && self.method == Method::GET
    }

    /// Base URL plus `params` appended with raw, unencoded values.
    pub fn full_url_with(&self, params: &BTreeMap<String, String>) -> String {
        if params.is_empty() {
            return self.url.clone();
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query)
    }

    /// Base URL plus the caller's own query parameters.
    pub fn full_url(&self) -> String {
        self.full_url_with(&self.params)
    }
}

/// Normalized result of one executed request.
///
/// For a 2xx response exactly one of `body_text`/`body_bytes` is set,
/// depending on whether binary mode was requested. For any other status only
/// `error_body` is set. A `status` of `0` means no status was ever read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: u16,
    pub body_text: Option<String>,
    pub body_bytes: Option<Vec<u8>>,
    pub error_body: Option<String>,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }

    /// Named field of a flat JSON error body, or the raw error body when it
    /// is not JSON or lacks the field.
    pub fn error_field(&self, name: &str) -> Option<String> {
        let body = self.error_body.as_deref()?;
        let field = serde_json::from_str::<serde_json::Map<String, Value>>(body)
            .ok()
            .and_then(|map| map.get(name).cloned());

        match field {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => Some(body.to_string()),
            Some(other) => Some(other.to_string()),
        }
    }
}
