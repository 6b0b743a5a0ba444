use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;
use url::Url;

use super::canon::DownloadUnit;
use super::types::{ApiError, Passage};
use crate::cache::RequestKey;
use crate::error::{Error, Result};

/// Characters `encodeURI` leaves alone. The API rejects `%3A`, so `John 3:16`
/// must travel with a literal colon.
const REFERENCE: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b';')
  .remove(b',')
  .remove(b'/')
  .remove(b'?')
  .remove(b':')
  .remove(b'@')
  .remove(b'&')
  .remove(b'=')
  .remove(b'+')
  .remove(b'$')
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')')
  .remove(b'#');

/// Encode a reference for use as a URL path segment
pub fn encode_reference(reference: &str) -> String {
  utf8_percent_encode(reference, REFERENCE).to_string()
}

/// Scripture API client.
///
/// Requests go through the application's intercepted client, so every successful
/// lookup also warms the offline cache.
#[derive(Clone)]
pub struct ScriptureClient {
  http: ClientWithMiddleware,
  base_url: Url,
}

impl ScriptureClient {
  pub fn new(http: ClientWithMiddleware, base_url: &str) -> Result<Self> {
    let base_url = Url::parse(base_url)
      .map_err(|e| Error::Config(format!("Invalid scripture base_url '{}': {}", base_url, e)))?;
    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// URL for a reference under a translation
  pub fn passage_url(&self, reference: &str, translation: &str) -> Result<Url> {
    let raw = format!(
      "{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      encode_reference(reference.trim())
    );
    let mut url = Url::parse(&raw)
      .map_err(|e| Error::NotFound(format!("Invalid reference '{}': {}", reference, e)))?;
    url.query_pairs_mut().append_pair("translation", translation);
    Ok(url)
  }

  pub fn chapter_url(&self, unit: &DownloadUnit, translation: &str) -> Result<Url> {
    self.passage_url(&unit.reference(), translation)
  }

  /// Look up a passage
  pub async fn fetch_passage(&self, reference: &str, translation: &str) -> Result<Passage> {
    if reference.trim().is_empty() {
      return Err(Error::NotFound("Please enter a verse reference.".to_string()));
    }

    let url = self.passage_url(reference, translation)?;
    let body = self.get(url).await?;
    serde_json::from_slice(&body)
      .map_err(|e| Error::Network(format!("Unexpected response for '{}': {}", reference, e)))
  }

  /// Fetch one chapter, discarding the body. Caching happens in the interceptor.
  pub async fn fetch_chapter(&self, unit: &DownloadUnit, translation: &str) -> Result<()> {
    let url = self.chapter_url(unit, translation)?;
    self.get(url).await.map(drop).map_err(|e| match e {
      Error::NotFound(msg) => Error::NotFound(format!("Failed to fetch {}: {}", unit.reference(), msg)),
      other => other,
    })
  }

  async fn get(&self, url: Url) -> Result<Vec<u8>> {
    debug!(%url, "scripture request");
    let response = self.http.get(url).send().await?;
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    if status.is_success() {
      return Ok(body);
    }

    let message = serde_json::from_slice::<ApiError>(&body)
      .map(|e| e.error)
      .unwrap_or_else(|_| format!("Request failed with status: {}", status.as_u16()));

    Err(error_for_status(status, message))
  }
}

fn error_for_status(status: StatusCode, message: String) -> Error {
  if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
    Error::Network(message)
  } else {
    Error::NotFound(message)
  }
}

/// Eviction predicate: same origin as the scripture API and a matching
/// `translation` parameter.
pub fn selects_translation(base_url: &Url, key: &RequestKey, translation: &str) -> bool {
  key.url().is_some_and(|url| {
    url.origin() == base_url.origin()
      && url
        .query_pairs()
        .any(|(k, v)| k == "translation" && v == translation)
  })
}
