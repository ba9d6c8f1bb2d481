// Deterministic cache-key derivation per upstream domain
// Author: kelexine (https://github.com/kelexine)

use sha2::{Digest, Sha256};

/// Key prefix for cached completion responses.
pub const COMPLETION_PREFIX: &str = "llm:response:";
/// Key prefix for cached place-search results.
pub const PLACE_PREFIX: &str = "poi:search:";
/// Key prefix for cached weather lookups.
pub const WEATHER_PREFIX: &str = "weather:";

/// Derive the cache key for a completion request.
///
/// The four logical inputs are hashed, so the key stays short no matter how
/// large the prompt is, and identical requests map to identical keys across
/// process restarts.
pub fn completion_key(
    prompt: &str,
    model: &str,
    temperature: f64,
    max_tokens: Option<u32>,
) -> String {
    let bound = match max_tokens {
        Some(n) => n.to_string(),
        None => "none".to_string(),
    };
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(b":");
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(format!("{temperature}").as_bytes());
    hasher.update(b":");
    hasher.update(bound.as_bytes());
    format!("{COMPLETION_PREFIX}{:x}", hasher.finalize())
}

/// Derive the cache key for a place (POI) search.
pub fn place_key(city: &str, keywords: &str, citylimit: bool) -> String {
    format!("{PLACE_PREFIX}{city}:{keywords}:{citylimit}")
}

/// Derive the cache key for a weather lookup. `kind` distinguishes current
/// conditions from forecasts.
pub fn weather_key(city: &str, kind: &str) -> String {
    format!("{WEATHER_PREFIX}{kind}:{city}")
}
