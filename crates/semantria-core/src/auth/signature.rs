//! OAuth-style request signing.
//!
//! The server verifies a request by recomputing an HMAC-SHA1 over the
//! form-urlencoded full request URL, keyed by the MD5 hex digest of the
//! session secret. The raw secret never leaves the client.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::api::ApiError;

pub const OAUTH_NONCE: &str = "oauth_nonce";
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
pub const OAUTH_VERSION: &str = "oauth_version";

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const VERSION: &str = "1.0";

/// Hex encoded MD5 digest of a session secret.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Md5::digest(secret.as_bytes()))
}

/// Form-urlencode a string the way `application/x-www-form-urlencoded` does.
fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Base64 encoded HMAC-SHA1 of the encoded `full_url`, keyed by `secret_hash`.
pub fn sign(full_url: &str, secret_hash: &str) -> Result<String, ApiError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret_hash.as_bytes())
        .map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(form_encode(full_url).as_bytes());

    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Value of the `Authorization` header for a signed request.
pub fn authorization_header(full_url: &str, key: &str, secret_hash: &str) -> Result<String, ApiError> {
    let signature = sign(full_url, secret_hash)?;
    Ok(format!(
        "OAuth,{}=\"{}\",oauth_signature=\"{}\"",
        OAUTH_CONSUMER_KEY,
        key,
        form_encode(&signature)
    ))
}

/// The five OAuth query parameters injected into every signed request.
pub fn oauth_params(key: &str, nonce: u32, timestamp: i64) -> [(&'static str, String); 5] {
    [
        (OAUTH_NONCE, nonce.to_string()),
        (OAUTH_CONSUMER_KEY, key.to_string()),
        (OAUTH_SIGNATURE_METHOD, SIGNATURE_METHOD.to_string()),
        (OAUTH_TIMESTAMP, timestamp.to_string()),
        (OAUTH_VERSION, VERSION.to_string()),
    ]
}
