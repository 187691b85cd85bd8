/// Fjall-backed shared response cache for upstream HTTP calls
///
/// The cache is separate from the JSON mock store: it sits inside the upstream
/// client and lets the bridge serve stale responses instead of re-fetching.
/// Entries are keyed by method and full outbound URL and never refresh on
/// their own; `FjallCache::prune` drops entries older than a given age.
///
/// ## Usage
///
/// ```rust,ignore
/// use stockbridge::cache::{FjallCache, ResponseCache};
///
/// let cache = FjallCache::open("cache/responses")?;
/// cache.set("GET", url, &response)?;
/// let hit = cache.get("GET", url)?;
/// ```
pub mod error;
pub mod keys;
pub mod pruning;
pub mod store;

pub use error::{CacheError, Result};
pub use pruning::PruneStats;
pub use store::{CacheStats, CachedResponse, FjallCache, ResponseCache};
