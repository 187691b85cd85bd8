//! Deterministic keys for mock records
//!
//! A fingerprint is the hex MD5 of `path + "?" + canonical_query`. MD5 keeps
//! the mock directory interchangeable with records produced by earlier
//! tooling; uniqueness is all that is needed here, not collision resistance.

use std::fmt;

use md5::{Digest, Md5};

/// Serialize query pairs with keys sorted, values of a repeated key kept in order
pub fn canonical_query(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    // Stable sort: repeated keys keep their relative order
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    sorted
        .into_iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(path: &str, query: &[(String, String)]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(path.as_bytes());
        hasher.update(b"?");
        hasher.update(canonical_query(query).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_query_sorts_keys_and_encodes() {
        let query = pairs(&[("q", "red cats"), ("page", "2"), ("a", "x&y")]);
        assert_eq!(canonical_query(&query), "a=x%26y&page=2&q=red%20cats");
        assert_eq!(canonical_query(&[]), "");
    }

    #[test]
    fn test_repeated_keys_keep_value_order() {
        let query = pairs(&[("tag", "b"), ("id", "1"), ("tag", "a")]);
        assert_eq!(canonical_query(&query), "id=1&tag=b&tag=a");
    }

    #[test]
    fn test_known_digest() {
        // md5("search/photos?query=cats")
        let fp = Fingerprint::of("search/photos", &pairs(&[("query", "cats")]));
        assert_eq!(fp.as_str().len(), 32);
        assert_eq!(fp.as_str(), format!("{:x}", Md5::digest(b"search/photos?query=cats")));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = Fingerprint::of("", &pairs(&[("q", "cats"), ("per_page", "20")]));
        let b = Fingerprint::of("", &pairs(&[("per_page", "20"), ("q", "cats")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_any_change_changes_fingerprint() {
        let base = Fingerprint::of("photos", &pairs(&[("q", "cats")]));

        assert_ne!(base, Fingerprint::of("photos", &pairs(&[("q", "dogs")])));
        assert_ne!(base, Fingerprint::of("photos", &pairs(&[("query", "cats")])));
        assert_ne!(base, Fingerprint::of("videos", &pairs(&[("q", "cats")])));
        assert_ne!(
            base,
            Fingerprint::of("photos", &pairs(&[("q", "cats"), ("page", "1")]))
        );
    }
}
