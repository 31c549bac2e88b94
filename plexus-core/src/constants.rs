/// Plexus system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum length of a node or relationship type tag.
pub const MAX_TYPE_TAG_LEN: usize = 100;

/// Maximum number of top-level keys in a property map.
pub const MAX_PROPERTY_KEYS: usize = 1000;

/// Maximum length of a single property key.
pub const MAX_PROPERTY_KEY_LEN: usize = 100;

/// Maximum serialized size of a single property value (1 MiB).
pub const MAX_PROPERTY_VALUE_BYTES: usize = 1 << 20;

/// Maximum nesting depth of property maps and lists.
pub const MAX_PROPERTY_DEPTH: usize = 32;

/// Property keys that are forbidden at any nesting depth.
pub const RESERVED_PROPERTY_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Permission token length bounds.
pub const MIN_PERMISSION_TOKEN_LEN: usize = 1;
pub const MAX_PERMISSION_TOKEN_LEN: usize = 50;

/// Query limit defaults and ceiling.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;
pub const MAX_QUERY_LIMIT: usize = 10_000;

/// Shard placement defaults. Must match across instances sharing a store.
pub const DEFAULT_NUM_SHARDS: u32 = 256;
pub const DEFAULT_SHARD_LEVELS: usize = 2;

/// Cache defaults.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_SIZE: usize = 10_000;

/// Starting bucket width for the numeric range index when no buckets exist.
pub const DEFAULT_RANGE_BUCKET_WIDTH: f64 = 100.0;

/// Warm-cache defaults.
pub const DEFAULT_PERSISTENCE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_CACHE_AGE_SECS: u64 = 86_400;
pub const DEFAULT_POPULARITY_THRESHOLD: u64 = 5;
