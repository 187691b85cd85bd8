use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::Result;
use super::keys::encode_response_key;
use super::pruning::{PruneStats, prune_older_than};

/// Upstream response as kept by the shared cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    /// Header pairs in upstream order, cache-invalidating headers already removed
    pub headers: Vec<(String, String)>,
    pub body: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Stored responses carry no freshness lifetime, so they are usable only
    /// within the `max-stale` allowance of the request
    pub fn is_usable(&self, max_stale: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) <= max_stale
    }
}

/// Key/value cache injected into the upstream client
pub trait ResponseCache: Send + Sync {
    fn get(&self, method: &str, url: &str) -> Result<Option<CachedResponse>>;

    fn set(&self, method: &str, url: &str, response: &CachedResponse) -> Result<()>;

    /// Cheap liveness probe for the health endpoint
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Make pending writes durable; called on shutdown
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Fjall-backed persistent response cache
#[derive(Clone)]
pub struct FjallCache {
    keyspace: Keyspace,
    responses: PartitionHandle,
    metadata: PartitionHandle,
}

impl FjallCache {
    /// Open or create a cache keyspace at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening response cache at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let responses = keyspace.open_partition("responses", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            responses,
            metadata,
        })
    }

    /// Remove entries stored more than `max_age` ago
    pub fn prune(&self, max_age: Duration) -> Result<PruneStats> {
        let stats = prune_older_than(&self.responses, &self.metadata, max_age, Utc::now())?;
        self.persist()?;
        info!(?stats, "Response cache pruned");
        Ok(stats)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut entries = 0;
        let mut body_bytes = 0;

        for item in self.responses.iter() {
            let (_, value) = item?;
            entries += 1;
            body_bytes += value.len();
        }

        let last_prune = super::pruning::last_prune(&self.metadata)?;

        Ok(CacheStats {
            entries,
            stored_bytes: body_bytes,
            last_prune,
        })
    }
}

impl ResponseCache for FjallCache {
    fn get(&self, method: &str, url: &str) -> Result<Option<CachedResponse>> {
        match self.responses.get(encode_response_key(method, url))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn set(&self, method: &str, url: &str, response: &CachedResponse) -> Result<()> {
        let value = serde_json::to_vec(response)?;
        self.responses.insert(encode_response_key(method, url), value)?;
        debug!(url, status = response.status, "Cached upstream response");
        Ok(())
    }

    fn check(&self) -> Result<()> {
        self.metadata.get(b"meta:health")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.persist()
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub stored_bytes: usize,
    pub last_prune: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_cache() -> (FjallCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = FjallCache::open(temp_dir.path().join("responses")).unwrap();
        (cache, temp_dir)
    }

    fn sample_response(stored_at: DateTime<Utc>) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("x-ratelimit-remaining".to_string(), "42".to_string()),
            ],
            body: r#"{"total":1}"#.to_string(),
            stored_at,
        }
    }

    #[test]
    fn test_set_and_get() {
        let (cache, _temp) = create_test_cache();
        let url = "https://pixabay.com/api/?q=cats&key=k";
        let response = sample_response(Utc::now());

        cache.set("GET", url, &response).unwrap();

        let fetched = cache.get("GET", url).unwrap().unwrap();
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.headers, response.headers);
        assert_eq!(fetched.body, response.body);
    }

    #[test]
    fn test_get_missing() {
        let (cache, _temp) = create_test_cache();
        assert!(cache.get("GET", "https://example.com/").unwrap().is_none());
    }

    #[test]
    fn test_usable_within_max_stale() {
        let now = Utc::now();
        let max_stale = Duration::from_secs(3600);

        assert!(sample_response(now - chrono::Duration::seconds(10)).is_usable(max_stale, now));
        assert!(!sample_response(now - chrono::Duration::hours(2)).is_usable(max_stale, now));
        // Clock skew into the future counts as age zero
        assert!(sample_response(now + chrono::Duration::seconds(30)).is_usable(max_stale, now));
    }

    #[test]
    fn test_stats_and_prune() {
        let (cache, _temp) = create_test_cache();
        let now = Utc::now();

        cache
            .set("GET", "https://a.example/", &sample_response(now))
            .unwrap();
        cache
            .set(
                "GET",
                "https://b.example/",
                &sample_response(now - chrono::Duration::days(3)),
            )
            .unwrap();

        assert_eq!(cache.stats().unwrap().entries, 2);

        let pruned = cache.prune(Duration::from_secs(86400)).unwrap();
        assert_eq!(pruned.expired, 1);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert!(stats.last_prune.is_some());
        assert!(cache.get("GET", "https://a.example/").unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("responses");

        {
            let cache = FjallCache::open(&path).unwrap();
            cache
                .set("GET", "https://a.example/", &sample_response(Utc::now()))
                .unwrap();
            cache.persist().unwrap();
        }

        let cache = FjallCache::open(&path).unwrap();
        assert!(cache.get("GET", "https://a.example/").unwrap().is_some());
    }
}
