//! plaza: engagement core for a social backend.
//!
//! Three components sit on top of a document store and a blob store:
//!
//! - [`ledger::CounterLedger`] - idempotent likes and `likes_count` across
//!   posts, videos, reels, stories and user assets
//! - [`follow::FollowGraph`] - the follow-request state machine and the
//!   follower/following counters it owns
//! - [`stories::StoryManager`] - 24-hour stories, reclaimed on read, by a
//!   periodic sweep, or by their owner through one idempotent primitive
//!
//! Authentication and routing live outside this crate; every operation takes
//! the already-authenticated actor id.

pub mod blob;
pub mod clock;
pub mod commands;
pub mod config;
pub mod constants;
pub mod counters;
pub mod error;
pub mod follow;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod paths;
pub mod reliability;
pub mod services;
pub mod stories;
pub mod store;
pub mod sweeper;

pub use error::{Error, Result};
