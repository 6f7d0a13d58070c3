//! Shared constants and defaults.

/// Stories expire this many hours after publication. Not configurable.
pub const STORY_TTL_HOURS: i64 = 24;

/// Hard cap on ids accepted by one bulk-like call.
pub const MAX_BULK_LIKE: usize = 50;

/// Default page size for listing operations.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page a listing operation will return.
pub const MAX_PAGE_SIZE: usize = 100;

/// Stories reclaimed per sweep batch.
pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 100;

/// How long reclamation tombstones keep answering `Gone` (7 days).
pub const DEFAULT_TOMBSTONE_RETENTION_HOURS: u64 = 168;

/// Sweep every five minutes (6-field cron, seconds first).
pub const DEFAULT_SWEEP_SCHEDULE: &str = "0 */5 * * * *";

/// Blob namespace for story media.
pub const STORY_BLOB_NAMESPACE: &str = "stories";

/// Config file name inside the plaza home directory.
pub const CONFIG_FILE_NAME: &str = "plaza.toml";
