//! Reliability helpers for collaborator calls.

pub mod retry;

pub use retry::{RetryConfig, retry_anyhow};
