//! Core types for the response cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Identity of a cached request, derived from its full URL.
///
/// The query string is part of the key, so the same passage requested under
/// two translations never collides.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestKey(String);

impl RequestKey {
  /// Build a key from a request URL. The fragment never reaches the server and is dropped.
  pub fn from_url(url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    Self(url.into())
  }

  /// Rebuild a key from its stored string form.
  pub fn from_stored(raw: impl Into<String>) -> Self {
    Self(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn url(&self) -> Option<Url> {
    Url::parse(&self.0).ok()
  }

  /// Value of a query parameter, if present.
  pub fn query_param(&self, name: &str) -> Option<String> {
    self
      .url()?
      .query_pairs()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.into_owned())
  }

  /// SHA256 hash for stable, fixed-length storage keys
  pub fn hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for RequestKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A raw HTTP response as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl StoredResponse {
  pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers,
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// A single stored request/response pair.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key: RequestKey,
  pub response: StoredResponse,
  pub stored_at: DateTime<Utc>,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Create a result synthesized because the network was unavailable.
  pub fn offline(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: None,
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from the store without a network round trip
  Cache,
  /// Network unavailable and nothing cached
  Offline,
}

impl CacheSource {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Network => "network",
      Self::Cache => "cache",
      Self::Offline => "offline",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_includes_translation() {
    let kjv = RequestKey::from_url(&Url::parse("https://bible-api.com/John%203:16?translation=kjv").unwrap());
    let web = RequestKey::from_url(&Url::parse("https://bible-api.com/John%203:16?translation=web").unwrap());
    assert_ne!(kjv, web);
    assert_ne!(kjv.hash(), web.hash());
    assert_eq!(kjv.query_param("translation").as_deref(), Some("kjv"));
  }

  #[test]
  fn test_key_drops_fragment() {
    let key = RequestKey::from_url(&Url::parse("http://localhost/app.js#top").unwrap());
    assert_eq!(key.as_str(), "http://localhost/app.js");
  }

  #[test]
  fn test_success_range() {
    assert!(StoredResponse::new(204, Vec::new(), Vec::new()).is_success());
    assert!(!StoredResponse::new(304, Vec::new(), Vec::new()).is_success());
    assert!(!StoredResponse::new(408, Vec::new(), Vec::new()).is_success());
  }

  #[test]
  fn test_only_cached_results_carry_a_timestamp() {
    let now = Utc::now();
    assert_eq!(CacheResult::from_cache((), now).cached_at, Some(now));
    assert_eq!(CacheResult::from_network(()).cached_at, None);
    assert_eq!(CacheResult::offline(()).source, CacheSource::Offline);
  }
}
