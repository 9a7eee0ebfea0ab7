//! Shared error helpers, failure classes, credential patterns, and small
//! utilities used across all aios crates.

pub mod cancel;
pub mod error;
pub mod path;
pub mod secrets;
pub mod time;

pub use {
    cancel::{Cancelled, ensure_active},
    error::{FailureClass, FromMessage},
};
