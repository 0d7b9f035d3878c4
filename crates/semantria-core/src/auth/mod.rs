//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `signature`: OAuth-style HMAC-SHA1 request signing
//! - `Credentials`: username/password pair and its login payload
//! - `Session`: the id and signing key/secret issued by the auth server
//! - `AuthService`: session creation and reuse through the session cache
//!
//! A cached session id is validated with a GET before falling back to a
//! fresh login, so the password is only sent when it has to be.

pub mod credentials;
pub mod manager;
pub mod session;
pub mod signature;

pub use credentials::Credentials;
pub use manager::{AuthError, AuthService, SessionAttempt};
pub use session::Session;
