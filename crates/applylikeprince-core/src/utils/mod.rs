//! Utility functions for string formatting.

pub mod format;

pub use format::{format_bytes, mask_token, truncate};
