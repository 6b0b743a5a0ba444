//! Selective deletion of one translation's cached scripture.

use tracing::info;
use url::Url;

use crate::cache::{CacheLayer, CacheStorage, Partition};
use crate::error::Result;
use crate::scripture::selects_translation;

/// Delete every scripture response stored for `translation`.
///
/// Only the API partition is searched, so static assets are never touched, and
/// the predicate requires both the scripture origin and an exact
/// `translation` parameter match.
pub async fn evict_translation<S: CacheStorage>(
  layer: &CacheLayer<S>,
  scripture_base: &Url,
  translation: &str,
) -> Result<usize> {
  let base = scripture_base.clone();
  let id = translation.to_string();
  let removed = layer
    .delete_matching(Partition::Api, move |key| selects_translation(&base, key, &id))
    .await?;
  info!(translation, removed, "evicted offline translation");
  Ok(removed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheGeneration, RequestKey, SqliteStorage, StoredResponse};

  fn key(url: &str) -> RequestKey {
    RequestKey::from_url(&Url::parse(url).unwrap())
  }

  #[tokio::test]
  async fn test_eviction_leaves_other_translations_and_assets() {
    let layer = CacheLayer::new(
      SqliteStorage::in_memory().unwrap(),
      CacheGeneration::new("lumina", 3),
    );
    let ok = || StoredResponse::new(200, Vec::new(), b"{}".to_vec());

    for url in [
      "https://bible-api.com/Mark%201?translation=kjv",
      "https://bible-api.com/Mark%202?translation=kjv",
      "https://bible-api.com/Mark%201?translation=web",
    ] {
      layer.store_all(Partition::Api, vec![(key(url), ok())]).await.unwrap();
    }
    let asset = key("http://localhost:5173/icon.svg?translation=kjv");
    layer.store_all(Partition::Static, vec![(asset.clone(), ok())]).await.unwrap();

    let base = Url::parse("https://bible-api.com/").unwrap();
    assert_eq!(evict_translation(&layer, &base, "kjv").await.unwrap(), 2);

    let remaining = layer.list_keys(Partition::Api).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.contains(&key("https://bible-api.com/Mark%201?translation=web")));
    assert!(layer.lookup(Partition::Static, &asset).await.unwrap().is_some());
  }
}
