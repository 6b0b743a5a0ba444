mod common;

use common::{config, context, passage_body, APP_ORIGIN, UNREACHABLE};
use lumina::cache::{
  CacheGeneration, CacheLayer, CacheStorage, Partition, RequestKey, SqliteStorage, StoredResponse,
};
use lumina::config::NetworkConfig;
use lumina::context::AppContext;
use lumina::intercept::{self, Classifier, OfflineCache, CACHE_HEADER, OFFLINE_MESSAGE};
use lumina::Error;
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn source(response: &reqwest::Response) -> Option<String> {
  response
    .headers()
    .get(CACHE_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(String::from)
}

fn key(url: &str) -> RequestKey {
  RequestKey::from_url(&Url::parse(url).unwrap())
}

#[tokio::test]
async fn test_repeated_lookup_hits_network_once() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", Matcher::Regex("^/John%203:16".to_string()))
    .match_query(Matcher::UrlEncoded("translation".into(), "kjv".into()))
    .with_header("content-type", "application/json")
    .with_body(passage_body("kjv"))
    .expect(1)
    .create_async()
    .await;

  let ctx = context(config(&server.url())).await;

  let first = ctx.scripture.fetch_passage("John 3:16", "kjv").await.unwrap();
  let second = ctx.scripture.fetch_passage("John 3:16", "kjv").await.unwrap();

  assert_eq!(first, second);
  assert_eq!(second.translation_id, "kjv");
  mock.assert_async().await;
}

#[tokio::test]
async fn test_second_response_is_marked_as_cached() {
  let mut server = mockito::Server::new_async().await;
  server
    .mock("GET", Matcher::Regex("^/Mark%201".to_string()))
    .with_body(passage_body("web"))
    .create_async()
    .await;

  let config = config(&server.url());
  let ctx = context(config.clone()).await;
  let http = intercept::intercepted_client(ctx.cache.clone(), &config.network).unwrap();
  let url = format!("{}/Mark%201?translation=web", server.url());

  let first = http.get(&url).send().await.unwrap();
  assert_eq!(source(&first).as_deref(), Some("network"));
  let second = http.get(&url).send().await.unwrap();
  assert_eq!(source(&second).as_deref(), Some("cache"));
  assert_eq!(second.text().await.unwrap(), passage_body("web"));
}

#[tokio::test]
async fn test_translations_are_cached_separately() {
  let mut server = mockito::Server::new_async().await;
  let kjv = server
    .mock("GET", Matcher::Regex("^/Jude%201".to_string()))
    .match_query(Matcher::UrlEncoded("translation".into(), "kjv".into()))
    .with_body(passage_body("kjv"))
    .expect(1)
    .create_async()
    .await;
  let bbe = server
    .mock("GET", Matcher::Regex("^/Jude%201".to_string()))
    .match_query(Matcher::UrlEncoded("translation".into(), "bbe".into()))
    .with_body(passage_body("bbe"))
    .expect(1)
    .create_async()
    .await;

  let ctx = context(config(&server.url())).await;
  let a = ctx.scripture.fetch_passage("Jude 1", "kjv").await.unwrap();
  let b = ctx.scripture.fetch_passage("Jude 1", "bbe").await.unwrap();

  assert_eq!(a.translation_id, "kjv");
  assert_eq!(b.translation_id, "bbe");
  kjv.assert_async().await;
  bbe.assert_async().await;
}

#[tokio::test]
async fn test_bad_reference_message_is_verbatim_and_not_cached() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", Matcher::Regex("^/Jhn%203".to_string()))
    .with_status(404)
    .with_header("content-type", "application/json")
    .with_body(r#"{"error":"not found"}"#)
    .expect(2)
    .create_async()
    .await;

  let ctx = context(config(&server.url())).await;

  for _ in 0..2 {
    let err = ctx.scripture.fetch_passage("Jhn 3", "kjv").await.unwrap_err();
    assert_eq!(err, Error::NotFound("not found".to_string()));
    assert_eq!(err.to_string(), "not found");
  }
  assert!(ctx.cache.layer().list_keys(Partition::Api).await.unwrap().is_empty());
  mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_api_yields_offline_response() {
  let config = config(UNREACHABLE);
  let ctx = context(config.clone()).await;

  let err = ctx.scripture.fetch_passage("John 3:16", "kjv").await.unwrap_err();
  assert_eq!(err, Error::Network(OFFLINE_MESSAGE.to_string()));

  let http = intercept::intercepted_client(ctx.cache.clone(), &config.network).unwrap();
  let response = http
    .get(format!("{}John%203:16?translation=kjv", UNREACHABLE))
    .send()
    .await
    .unwrap();
  assert_eq!(response.status().as_u16(), 408);
  assert_eq!(source(&response).as_deref(), Some("offline"));
  let body: serde_json::Value = response.json().await.unwrap();
  assert_eq!(body["error"], OFFLINE_MESSAGE);
}

#[tokio::test]
async fn test_cached_passage_is_served_offline() {
  let config = config(UNREACHABLE);
  let ctx = context(config).await;
  let url = ctx.scripture.passage_url("Romans 8:28", "web").unwrap();
  ctx
    .cache
    .layer()
    .store(
      Partition::Api,
      &RequestKey::from_url(&url),
      StoredResponse::new(200, Vec::new(), passage_body("web")),
    )
    .await
    .unwrap();

  let passage = ctx.scripture.fetch_passage("Romans 8:28", "web").await.unwrap();
  assert_eq!(passage.translation_id, "web");
}

#[tokio::test]
async fn test_non_get_requests_are_never_cached() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
    .with_body("{}")
    .expect(2)
    .create_async()
    .await;

  let config = config(&server.url());
  let ctx = context(config.clone()).await;
  let http = intercept::intercepted_client(ctx.cache.clone(), &config.network).unwrap();
  let url = format!("{}/v1beta/models/gemini-2.5-flash:generateContent", server.url());

  for _ in 0..2 {
    let response = http.post(&url).body("{}").send().await.unwrap();
    assert_eq!(source(&response), None);
  }
  mock.assert_async().await;
}

#[tokio::test]
async fn test_cached_asset_is_served_when_network_is_down() {
  let ctx = context(config(UNREACHABLE)).await;
  let asset = format!("{}assets/app.css", APP_ORIGIN);
  ctx
    .cache
    .layer()
    .store(
      Partition::Static,
      &key(&asset),
      StoredResponse::new(200, Vec::new(), b"body{}".to_vec()),
    )
    .await
    .unwrap();

  let http = intercept::intercepted_client(ctx.cache.clone(), &ctx.config.network).unwrap();
  let response = http.get(&asset).send().await.unwrap();

  assert_eq!(response.status().as_u16(), 200);
  assert_eq!(source(&response).as_deref(), Some("cache"));
  assert_eq!(response.text().await.unwrap(), "body{}");
}

#[tokio::test]
async fn test_cached_asset_is_refreshed_in_background() {
  let mut assets = mockito::Server::new_async().await;
  assets
    .mock("GET", "/app.js")
    .with_body("v2")
    .create_async()
    .await;

  let ctx = context(config(UNREACHABLE)).await;
  let asset = format!("{}/app.js", assets.url());
  let layer = ctx.cache.layer().clone();
  layer
    .store(
      Partition::Static,
      &key(&asset),
      StoredResponse::new(200, Vec::new(), b"v1".to_vec()),
    )
    .await
    .unwrap();

  let http = intercept::intercepted_client(ctx.cache.clone(), &ctx.config.network).unwrap();
  let response = http.get(&asset).send().await.unwrap();
  assert_eq!(response.text().await.unwrap(), "v1");

  let mut refreshed = false;
  for _ in 0..100 {
    let entry = layer.lookup(Partition::Static, &key(&asset)).await.unwrap();
    if entry.is_some_and(|e| e.response.body == b"v2") {
      refreshed = true;
      break;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  assert!(refreshed);
}

#[tokio::test]
async fn test_navigation_serves_stored_shell() {
  let ctx = context(config(UNREACHABLE)).await;
  ctx
    .cache
    .layer()
    .store(
      Partition::Static,
      &key(&format!("{}index.html", APP_ORIGIN)),
      StoredResponse::new(
        200,
        vec![("content-type".to_string(), "text/html".to_string())],
        b"<html>lumina</html>".to_vec(),
      ),
    )
    .await
    .unwrap();

  let http = intercept::intercepted_client(ctx.cache.clone(), &ctx.config.network).unwrap();
  let response = http
    .get(format!("{}journal", APP_ORIGIN))
    .header("accept", "text/html,application/xhtml+xml")
    .send()
    .await
    .unwrap();

  assert_eq!(source(&response).as_deref(), Some("cache"));
  assert_eq!(response.text().await.unwrap(), "<html>lumina</html>");
}

fn shell_cache(app: &Url) -> OfflineCache<SqliteStorage> {
  let network = NetworkConfig {
    max_retries: 0,
    ..NetworkConfig::default()
  };
  OfflineCache::new(
    CacheLayer::new(SqliteStorage::in_memory().unwrap(), CacheGeneration::new("lumina", 3)),
    Classifier::new(&Url::parse(UNREACHABLE).unwrap(), app),
    &app.join("index.html").unwrap(),
    intercept::upstream_client(&network).unwrap(),
  )
}

#[tokio::test]
async fn test_install_stores_the_whole_shell() {
  let mut app = mockito::Server::new_async().await;
  for path in ["/", "/index.html", "/manifest.json", "/icon.svg"] {
    app.mock("GET", path).with_body(path).create_async().await;
  }
  let origin = Url::parse(&app.url()).unwrap();
  let cache = shell_cache(&origin);
  let shell: Vec<Url> = ["/", "/index.html", "/manifest.json", "/icon.svg"]
    .iter()
    .map(|p| origin.join(p).unwrap())
    .collect();

  assert_eq!(cache.install(&shell).await.unwrap(), 4);

  let keys = cache.layer().list_keys(Partition::Static).await.unwrap();
  assert_eq!(keys.len(), 4);
  assert!(keys.contains(&key(&format!("{}/manifest.json", app.url()))));
}

#[tokio::test]
async fn test_install_skips_a_shell_already_cached() {
  let mut app = mockito::Server::new_async().await;
  let mut mocks = Vec::new();
  for path in ["/", "/index.html"] {
    mocks.push(app.mock("GET", path).with_body(path).expect(1).create_async().await);
  }
  let origin = Url::parse(&app.url()).unwrap();
  let cache = shell_cache(&origin);
  let shell: Vec<Url> = ["/", "/index.html"]
    .iter()
    .map(|p| origin.join(p).unwrap())
    .collect();

  assert_eq!(cache.install(&shell).await.unwrap(), 2);
  assert_eq!(cache.install(&shell).await.unwrap(), 0);
  for mock in mocks {
    mock.assert_async().await;
  }
}

#[tokio::test]
async fn test_install_is_all_or_nothing() {
  let mut app = mockito::Server::new_async().await;
  app.mock("GET", "/").with_body("/").create_async().await;
  app.mock("GET", "/index.html").with_body("<html/>").create_async().await;
  app
    .mock("GET", "/icon.svg")
    .with_status(404)
    .create_async()
    .await;
  let origin = Url::parse(&app.url()).unwrap();
  let cache = shell_cache(&origin);
  let shell: Vec<Url> = ["/", "/index.html", "/icon.svg"]
    .iter()
    .map(|p| origin.join(p).unwrap())
    .collect();

  assert!(cache.install(&shell).await.is_err());
  assert!(cache.layer().list_keys(Partition::Static).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generation_bump_collects_old_entries_on_open() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", Matcher::Regex("^/Titus%202".to_string()))
    .with_body(passage_body("ylt"))
    .expect(2)
    .create_async()
    .await;
  let dir = tempfile::tempdir().unwrap();

  let v3 = config(&server.url());
  {
    let ctx = AppContext::open_in(v3.clone(), dir.path()).await.unwrap();
    ctx.scripture.fetch_passage("Titus 2", "ylt").await.unwrap();
  }
  let storage = SqliteStorage::open_at(&dir.path().join("cache.db")).unwrap();
  assert_eq!(storage.partitions().unwrap(), vec!["lumina-api-v3".to_string()]);

  let mut v4 = v3;
  v4.cache.generation = 4;
  let ctx = AppContext::open_in(v4, dir.path()).await.unwrap();
  assert!(!storage
    .partitions()
    .unwrap()
    .contains(&"lumina-api-v3".to_string()));

  // Old entry is gone, so this goes to the network again
  ctx.scripture.fetch_passage("Titus 2", "ylt").await.unwrap();
  mock.assert_async().await;
}

#[tokio::test]
async fn test_shared_cache_serves_both_clients() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", Matcher::Regex("^/Philemon%201".to_string()))
    .with_body(passage_body("webbe"))
    .expect(1)
    .create_async()
    .await;

  let config = config(&server.url());
  let ctx = context(config.clone()).await;
  let other = intercept::intercepted_client(Arc::clone(&ctx.cache), &config.network).unwrap();

  ctx.scripture.fetch_passage("Philemon 1", "webbe").await.unwrap();
  let response = other
    .get(format!("{}/Philemon%201?translation=webbe", server.url()))
    .send()
    .await
    .unwrap();

  assert_eq!(source(&response).as_deref(), Some("cache"));
  mock.assert_async().await;
}
