//! Signed HTTP calls against the Semantria API.
//!
//! A call is described once by an immutable [`SignedRequest`], executed by
//! the [`HttpExecutor`], and comes back as a [`RequestOutcome`]. The
//! executor never fails: transport problems surface as status `0`.
//!
//! [`ApiClient`] layers a session's signing key, the API host and
//! status-to-error mapping on top of that.

pub mod client;
pub mod error;
pub mod executor;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use executor::{HttpExecutor, TlsPolicy};
pub use request::{RequestOutcome, SignedRequest};
