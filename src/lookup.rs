//! Passage lookups the terminal UI waits on.
//!
//! A `PassageLookup` runs one `fetch_passage` call on the runtime and is polled
//! from the event loop on every tick:
//!
//! ```ignore
//! let mut lookup = PassageLookup::start(ctx.scripture.clone(), "John 3:16", "kjv");
//!
//! // In event loop tick
//! if lookup.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::scripture::{Passage, ScriptureClient};

#[derive(Debug, Clone)]
pub enum LookupState {
  Loading,
  Loaded(Passage),
  /// Kept as the typed error so the pane can tell offline from not found
  Failed(Error),
}

pub struct PassageLookup {
  scripture: ScriptureClient,
  reference: String,
  translation: &'static str,
  state: LookupState,
  pending: Option<oneshot::Receiver<Result<Passage>>>,
}

impl PassageLookup {
  /// Begin looking up `reference` in `translation`
  pub fn start(scripture: ScriptureClient, reference: &str, translation: &'static str) -> Self {
    let mut lookup = Self {
      scripture,
      reference: reference.trim().to_string(),
      translation,
      state: LookupState::Loading,
      pending: None,
    };
    lookup.spawn();
    lookup
  }

  pub fn reference(&self) -> &str {
    &self.reference
  }

  pub fn translation(&self) -> &'static str {
    self.translation
  }

  pub fn state(&self) -> &LookupState {
    &self.state
  }

  pub fn passage(&self) -> Option<&Passage> {
    match &self.state {
      LookupState::Loaded(passage) => Some(passage),
      _ => None,
    }
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, LookupState::Loading)
  }

  /// Ask again, dropping any answer still in flight.
  pub fn retry(&mut self) {
    self.spawn();
  }

  /// Pick up a finished lookup. Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let Some(pending) = self.pending.as_mut() else {
      return false;
    };

    let result = match pending.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return false,
      Err(oneshot::error::TryRecvError::Closed) => Err(Error::Cancelled),
    };
    self.pending = None;
    self.state = match result {
      Ok(passage) => LookupState::Loaded(passage),
      Err(e) => LookupState::Failed(e),
    };
    true
  }

  fn spawn(&mut self) {
    let (tx, rx) = oneshot::channel();
    self.pending = Some(rx);
    self.state = LookupState::Loading;

    let scripture = self.scripture.clone();
    let reference = self.reference.clone();
    let translation = self.translation;
    tokio::spawn(async move {
      let result = scripture.fetch_passage(&reference, translation).await;
      // Dropped receiver means a retry replaced this lookup
      let _ = tx.send(result);
    });
  }
}

impl std::fmt::Debug for PassageLookup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PassageLookup")
      .field("reference", &self.reference)
      .field("translation", &self.translation)
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  fn scripture(base: &str) -> ScriptureClient {
    let http = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
    ScriptureClient::new(http, base).unwrap()
  }

  async fn settle(lookup: &mut PassageLookup) {
    for _ in 0..200 {
      if lookup.poll() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("lookup never finished");
  }

  #[tokio::test]
  async fn test_lookup_loads_passage() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/John%203:16")
      .match_query(mockito::Matcher::UrlEncoded("translation".into(), "kjv".into()))
      .with_header("content-type", "application/json")
      .with_body(
        r#"{"reference":"John 3:16","verses":[],"text":"For God so loved the world",
            "translation_id":"kjv","translation_name":"King James Version","translation_note":""}"#,
      )
      .create_async()
      .await;

    let mut lookup = PassageLookup::start(scripture(&server.url()), " John 3:16 ", "kjv");
    assert!(lookup.is_loading());
    assert_eq!(lookup.reference(), "John 3:16");

    settle(&mut lookup).await;
    assert_eq!(
      lookup.passage().map(|p| p.text.as_str()),
      Some("For God so loved the world")
    );
  }

  #[tokio::test]
  async fn test_not_found_keeps_server_message() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/Hezekiah%201")
      .match_query(mockito::Matcher::Any)
      .with_status(404)
      .with_body(r#"{"error":"not found"}"#)
      .create_async()
      .await;

    let mut lookup = PassageLookup::start(scripture(&server.url()), "Hezekiah 1", "web");
    settle(&mut lookup).await;

    match lookup.state() {
      LookupState::Failed(Error::NotFound(msg)) => assert_eq!(msg, "not found"),
      other => panic!("unexpected state {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_retry_replaces_failed_lookup() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
      .mock("GET", "/Mark%201")
      .match_query(mockito::Matcher::Any)
      .with_status(503)
      .expect(1)
      .create_async()
      .await;

    let mut lookup = PassageLookup::start(scripture(&server.url()), "Mark 1", "web");
    settle(&mut lookup).await;
    assert!(matches!(lookup.state(), LookupState::Failed(Error::Network(_))));
    failing.remove_async().await;

    server
      .mock("GET", "/Mark%201")
      .match_query(mockito::Matcher::Any)
      .with_body(
        r#"{"reference":"Mark 1","verses":[],"text":"The beginning of the gospel",
            "translation_id":"web","translation_name":"World English Bible","translation_note":""}"#,
      )
      .create_async()
      .await;

    lookup.retry();
    assert!(lookup.is_loading());
    settle(&mut lookup).await;
    assert_eq!(lookup.passage().map(|p| p.reference.as_str()), Some("Mark 1"));
  }
}
