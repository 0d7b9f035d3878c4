use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::signature::hash_secret;

/// Session issued by the auth server.
///
/// `api_key` and `api_secret_hash` sign every later API call; the raw
/// secret is hashed as soon as it arrives and not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub api_key: String,
    pub api_secret_hash: String,
}

/// Body of a successful session create/validate response.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    id: String,
    #[serde(default)]
    custom_params: HashMap<String, Value>,
}

impl SessionResponse {
    fn custom_param(&self, name: &str) -> Option<&str> {
        self.custom_params.get(name).and_then(Value::as_str)
    }

    /// Convert to a `Session`, or name the first missing field.
    pub(crate) fn into_session(self) -> Result<Session, &'static str> {
        let api_key = self.custom_param("key").ok_or("custom_params.key")?.to_string();
        let secret = self.custom_param("secret").ok_or("custom_params.secret")?;
        let api_secret_hash = hash_secret(secret);

        Ok(Session {
            id: self.id,
            api_key,
            api_secret_hash,
        })
    }
}
