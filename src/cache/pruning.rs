//! Age-based pruning for the response cache
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fjall::PartitionHandle;
use tracing::{debug, warn};

use super::error::Result;
use super::keys::{decode_response_key, encode_meta_key};
use super::store::CachedResponse;

const META_LAST_PRUNE: &str = "last_prune";

/// Pruning statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub scanned: usize,
    pub expired: usize,
    /// Entries whose value no longer decodes (older format, partial write)
    pub corrupt: usize,
}

/// Remove every response stored before `now - max_age`
pub fn prune_older_than(
    responses: &PartitionHandle,
    metadata: &PartitionHandle,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<PruneStats> {
    let mut stats = PruneStats::default();
    let mut doomed = Vec::new();

    for item in responses.iter() {
        let (key, value) = item?;
        stats.scanned += 1;

        match serde_json::from_slice::<CachedResponse>(&value) {
            Ok(response) if response.age(now) > max_age => {
                if let Some((_, url)) = decode_response_key(&key) {
                    debug!(url, "Pruning expired response");
                }
                stats.expired += 1;
                doomed.push(key);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "Pruning undecodable cache entry");
                stats.corrupt += 1;
                doomed.push(key);
            }
        }
    }

    for key in doomed {
        responses.remove(key)?;
    }

    metadata.insert(
        encode_meta_key(META_LAST_PRUNE),
        now.timestamp().to_string().as_bytes(),
    )?;

    Ok(stats)
}

/// Timestamp of the last completed prune, if any
pub fn last_prune(metadata: &PartitionHandle) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = metadata.get(encode_meta_key(META_LAST_PRUNE))? else {
        return Ok(None);
    };

    Ok(std::str::from_utf8(&value)
        .ok()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single()))
}
