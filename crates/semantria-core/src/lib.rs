//! Semantria client core.
//!
//! This crate provides the pieces every Semantria API call is built on:
//! - `auth`: request signing, credentials and the session manager
//! - `api`: the signed request executor and a thin API client over it
//! - `cache`: best-effort local persistence of the last session id
//! - `config`: endpoints, application identity and TLS policy

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod utils;

pub use api::{ApiClient, ApiError, HttpExecutor, RequestOutcome, SignedRequest, TlsPolicy};
pub use auth::{AuthError, AuthService, Credentials, Session};
pub use cache::SessionCache;
pub use config::Config;
