//! CLI command implementations for plaza.
//!
//! - [`sweep`] - Run one expiry sweep and print the report
//! - [`scheduler`] - Run the sweeper on its cron schedule until interrupted
//! - [`reconcile`] - Recompute counters from ledger records and follow edges
//! - [`check_config`] - Validate configuration and print warnings

pub mod check_config;
pub mod reconcile;
pub mod scheduler;
pub mod sweep;
