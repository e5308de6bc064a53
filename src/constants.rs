// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Serde default functions in `config` and the constructors of the individual
// components read from here so there is one place to tune them.

// =============================================================================
// Cache defaults
// =============================================================================

/// Default storage key prefix
pub const DEFAULT_CACHE_PREFIX: &str = "streaming";

/// Default cache schema version token (bump to invalidate old entries)
pub const DEFAULT_CACHE_VERSION: &str = "v3";

/// Default TTL for non-empty lookup results (24 hours)
pub const DEFAULT_TTL_WITH_DATA_SECS: u64 = 24 * 60 * 60;

/// Default TTL for empty lookup results (1 hour)
pub const DEFAULT_TTL_EMPTY_SECS: u64 = 60 * 60;

/// How long an expired entry is kept around for stale fallback (7 days)
pub const DEFAULT_STALE_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default maximum number of entries held by the in-memory store
pub const DEFAULT_MAX_MEMORY_ENTRIES: usize = 10_000;

/// Default directory for the disk store
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/streamscout";

// =============================================================================
// Coalescing defaults
// =============================================================================

/// Default batch window in milliseconds
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 50;

/// Queue length that dispatches a window before its timer elapses
pub const DEFAULT_MAX_QUEUE: usize = 200;

// =============================================================================
// Batch fetcher defaults
// =============================================================================

/// Default maximum number of subject ids per upstream call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;

/// Default number of chunks fetched in parallel
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Default per-chunk upstream timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// Retry defaults
// =============================================================================

/// Default maximum attempts (including the initial attempt)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial backoff in milliseconds
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// Default maximum backoff in milliseconds
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 4_000;

// =============================================================================
// Circuit breaker defaults
// =============================================================================

/// Default number of failures before circuit opens
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default number of successes to close circuit
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;

/// Default circuit breaker timeout in seconds
pub const DEFAULT_CB_TIMEOUT_SECS: u64 = 30;

/// Default maximum requests allowed in half-open state
pub const DEFAULT_HALF_OPEN_MAX_REQUESTS: u32 = 1;

// =============================================================================
// Provider defaults
// =============================================================================

/// Default availability proxy endpoint
pub const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:54321/functions/v1/streaming-availability";
