use serde_json::{json, Value};

use crate::utils::is_email;

/// Username and password for one login. Never written to disk.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Login body for the session endpoint. The auth server looks users up
    /// by `email` or by `username` depending on what they typed.
    pub fn payload(&self) -> Value {
        let field = if is_email(&self.username) { "email" } else { "username" };
        json!({
            "password": self.password,
            field: self.username,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_email_field() {
        let payload = Credentials::new("bob@x.com", "pw").payload();
        assert_eq!(payload["email"], "bob@x.com");
        assert_eq!(payload["password"], "pw");
        assert!(payload.get("username").is_none());
    }

    #[test]
    fn test_payload_uses_username_field() {
        let payload = Credentials::new("bob", "pw").payload();
        assert_eq!(payload["username"], "bob");
        assert!(payload.get("email").is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("bob", "hunter2"));
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
    }
}
