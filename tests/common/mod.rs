#![allow(dead_code)]

use lumina::cache::SqliteStorage;
use lumina::config::Config;
use lumina::context::AppContext;
use lumina::db::Database;

/// Scripture API address nothing listens on, so requests fail fast
pub const UNREACHABLE: &str = "http://127.0.0.1:1/";

/// App origin used by every test context; also unreachable
pub const APP_ORIGIN: &str = "http://127.0.0.1:9/";

pub fn passage_body(translation: &str) -> String {
  serde_json::json!({
    "reference": "John 3:16",
    "verses": [{
      "book_name": "John",
      "chapter": 3,
      "verse": 16,
      "text": "For God so loved the world..."
    }],
    "text": "For God so loved the world...",
    "translation_id": translation,
    "translation_name": translation.to_uppercase(),
    "translation_note": "Public Domain"
  })
  .to_string()
}

/// Config pointing the scripture API at `scripture_base`, without retries
pub fn config(scripture_base: &str) -> Config {
  let mut config = Config::default();
  config.scripture.base_url = format!("{}/", scripture_base.trim_end_matches('/'));
  config.cache.app_origin = APP_ORIGIN.to_string();
  config.network.max_retries = 0;
  config.network.connect_timeout_secs = 2;
  config.network.request_timeout_secs = 5;
  config
}

pub async fn context(config: Config) -> AppContext {
  AppContext::with_stores(
    config,
    SqliteStorage::in_memory().unwrap(),
    Database::in_memory().unwrap(),
  )
  .await
  .unwrap()
}
