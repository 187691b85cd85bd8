use std::collections::BTreeMap;

use axum::http::{HeaderMap, header};
use tracing::warn;

/// Response headers that would make the shared cache treat an entry as stale
/// or skip storing it
pub const CACHE_INVALIDATING: [&str; 5] = ["cache-control", "pragma", "set-cookie", "vary", "etag"];

pub const X_MOCKED: &str = "x-mocked";
pub const X_CACHED: &str = "x-cached";

pub fn scrub_cache_headers(headers: &mut HeaderMap) {
    for name in CACHE_INVALIDATING {
        headers.remove(name);
    }
}

/// ASCII case-insensitive `x-` prefix test
pub fn is_propagated(name: &str) -> bool {
    name.len() > 2 && name.as_bytes()[..2].eq_ignore_ascii_case(b"x-")
}

/// Copy the `x-*` headers into a fresh map; repeated values are joined with ", "
pub fn propagated_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        if !is_propagated(name.as_str()) {
            continue;
        }

        let Ok(value) = value.to_str() else {
            warn!(header = %name, "Dropping non-ASCII upstream header");
            continue;
        };

        out.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    out
}

/// Same filter for header maps read back from mock records
pub fn retain_propagated(headers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .filter(|(name, _)| is_propagated(name))
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect()
}

/// Header pairs as stored in the response cache
pub fn to_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Inverse of [`to_pairs`]; invalid names or values are skipped
pub fn from_pairs(pairs: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        match (
            header::HeaderName::try_from(name.as_str()),
            header::HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid cached header"),
        }
    }
    headers
}
