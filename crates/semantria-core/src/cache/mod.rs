//! Local caching of the session id.
//!
//! This module provides the `SessionCache`, which remembers the last session
//! id issued for a username so the next run can validate it instead of
//! sending the password again. The cache is an optimization only; losing
//! it costs one extra round trip.

pub mod manager;

pub use manager::SessionCache;
