//! The offline cache interceptor, registered on the application's HTTP client.

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientWithMiddleware, Middleware, Next};
use tracing::{debug, error, info, warn};
use url::Url;

use super::classify::{Classifier, Policy};
use crate::cache::{CacheLayer, CacheResult, CacheStorage, Partition, RequestKey, StoredResponse};
use crate::error::{Error, Result};

/// Header marking where a response came from: `network`, `cache` or `offline`
pub const CACHE_HEADER: &str = "x-lumina-cache";

/// Header carrying the RFC 3339 time a cached response was stored
pub const CACHED_AT_HEADER: &str = "x-lumina-cached-at";

/// Message in the body of the synthesized offline response
pub const OFFLINE_MESSAGE: &str = "This content is not available offline.";

/// Headers that describe the original transfer rather than the content
const SKIPPED_HEADERS: &[&str] = &[
  "connection",
  "transfer-encoding",
  "content-length",
  "content-encoding",
  CACHE_HEADER,
  CACHED_AT_HEADER,
];

/// Intercepts every request made through the application client and applies the
/// policy its class calls for.
pub struct OfflineCache<S: CacheStorage> {
  layer: CacheLayer<S>,
  classifier: Classifier,
  /// Stored document served for every navigation
  shell_document: RequestKey,
  /// Non-intercepted client for background revalidation and install
  upstream: ClientWithMiddleware,
}

impl<S: CacheStorage> OfflineCache<S> {
  pub fn new(
    layer: CacheLayer<S>,
    classifier: Classifier,
    shell_document: &Url,
    upstream: ClientWithMiddleware,
  ) -> Self {
    Self {
      layer,
      classifier,
      shell_document: RequestKey::from_url(shell_document),
      upstream,
    }
  }

  pub fn layer(&self) -> &CacheLayer<S> {
    &self.layer
  }

  /// Fetch and store the app shell.
  ///
  /// All-or-nothing: if any file fails, nothing is stored and the error is returned.
  /// Returns 0 without fetching when the current generation already holds the shell.
  pub async fn install(&self, shell: &[Url]) -> Result<usize> {
    let stored = self.layer.list_keys(Partition::Static).await?;
    if shell
      .iter()
      .all(|url| stored.contains(&RequestKey::from_url(url)))
    {
      debug!(generation = %self.layer.generation(), "app shell already cached");
      return Ok(0);
    }

    let fetches = shell.iter().map(|url| {
      let upstream = self.upstream.clone();
      let url = url.clone();
      async move {
        let response = upstream.get(url.clone()).send().await?;
        if !response.status().is_success() {
          return Err(Error::Network(format!(
            "{} returned {}",
            url,
            response.status()
          )));
        }
        Ok((RequestKey::from_url(&url), read_response(response).await?))
      }
    });

    let fetched = futures::future::try_join_all(fetches).await.map_err(|e| {
      error!(error = %e, "failed to cache app shell");
      e
    })?;

    let count = fetched.len();
    self.layer.store_all(Partition::Static, fetched).await?;
    info!(count, "cached app shell");
    Ok(count)
  }

  /// Delete partitions left over from older generations.
  pub async fn activate(&self) -> Result<usize> {
    let removed = self.layer.collect_stale_generations().await?;
    if removed > 0 {
      info!(removed, generation = %self.layer.generation(), "activated cache generation");
    }
    Ok(removed)
  }

  async fn scripture(
    &self,
    req: Request,
    extensions: &mut Extensions,
    next: Next<'_>,
  ) -> reqwest_middleware::Result<Response> {
    let key = RequestKey::from_url(req.url());
    let result = self
      .layer
      .cache_first(Partition::Api, &key, || async move {
        let response = next.run(req, extensions).await?;
        read_response(response).await
      })
      .await;

    match result {
      Ok(result) => into_response(result),
      Err(e) => {
        warn!(%key, error = %e, "scripture fetch failed, answering offline");
        into_response(CacheResult::offline(offline_response()))
      }
    }
  }

  async fn navigation(
    &self,
    req: Request,
    extensions: &mut Extensions,
    next: Next<'_>,
  ) -> reqwest_middleware::Result<Response> {
    self
      .layer
      .document_or_fetch(Partition::Static, &self.shell_document, || async move {
        let response = next.run(req, extensions).await?;
        read_response(response).await
      })
      .await
      .map_err(reqwest_middleware::Error::middleware)
      .and_then(into_response)
  }

  async fn asset(&self, req: Request) -> reqwest_middleware::Result<Response> {
    let key = RequestKey::from_url(req.url());
    let upstream = self.upstream.clone();
    self
      .layer
      .stale_while_revalidate(Partition::Static, &key, move || async move {
        let response = upstream.execute(req).await?;
        read_response(response).await
      })
      .await
      .map_err(reqwest_middleware::Error::middleware)
      .and_then(into_response)
  }
}

#[async_trait]
impl<S: CacheStorage> Middleware for OfflineCache<S> {
  async fn handle(
    &self,
    req: Request,
    extensions: &mut Extensions,
    next: Next<'_>,
  ) -> reqwest_middleware::Result<Response> {
    let policy = self.classifier.classify(&req);
    debug!(url = %req.url(), ?policy, "intercepted request");

    match policy {
      Policy::CacheFirst => self.scripture(req, extensions, next).await,
      Policy::Shell => self.navigation(req, extensions, next).await,
      Policy::StaleWhileRevalidate => self.asset(req).await,
      Policy::NetworkOnly => next.run(req, extensions).await,
    }
  }
}

/// Body of the response returned when a scripture request cannot be served
pub fn offline_response() -> StoredResponse {
  StoredResponse::new(
    408,
    vec![("content-type".to_string(), "application/json".to_string())],
    serde_json::json!({ "error": OFFLINE_MESSAGE }).to_string(),
  )
}

async fn read_response(response: Response) -> Result<StoredResponse> {
  let status = response.status().as_u16();
  let headers = response
    .headers()
    .iter()
    .filter(|(name, _)| !SKIPPED_HEADERS.contains(&name.as_str()))
    .filter_map(|(name, value)| {
      value
        .to_str()
        .ok()
        .map(|v| (name.as_str().to_string(), v.to_string()))
    })
    .collect();
  let body = response.bytes().await?.to_vec();

  Ok(StoredResponse {
    status,
    headers,
    body,
  })
}

fn into_response(result: CacheResult<StoredResponse>) -> reqwest_middleware::Result<Response> {
  let stored = result.data;
  let mut builder = http::Response::builder()
    .status(stored.status)
    .header(CACHE_HEADER, result.source.as_str());
  if let Some(cached_at) = result.cached_at {
    builder = builder.header(CACHED_AT_HEADER, cached_at.to_rfc3339());
  }
  for (name, value) in &stored.headers {
    builder = builder.header(name.as_str(), value.as_str());
  }

  let response = builder
    .body(stored.body)
    .map_err(reqwest_middleware::Error::middleware)?;
  Ok(Response::from(response))
}
