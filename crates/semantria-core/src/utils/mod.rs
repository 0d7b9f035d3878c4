//! Utility functions for string formatting and validation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{is_email, truncate_string};
