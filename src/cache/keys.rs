/// Key layout for the `responses` partition
///
/// - `resp:{METHOD} {url}` -> CachedResponse (JSON)
/// - `meta:{key}` -> value (string), in the `metadata` partition

const RESPONSE_PREFIX: &str = "resp:";

/// Encode a response key: resp:{METHOD} {url}
pub fn encode_response_key(method: &str, url: &str) -> Vec<u8> {
    format!("{}{} {}", RESPONSE_PREFIX, method.to_ascii_uppercase(), url).into_bytes()
}

/// Decode a response key back into (method, url)
pub fn decode_response_key(key: &[u8]) -> Option<(String, String)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (method, url) = key_str.strip_prefix(RESPONSE_PREFIX)?.split_once(' ')?;
    Some((method.to_string(), url.to_string()))
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}
