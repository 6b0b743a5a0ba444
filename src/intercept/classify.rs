//! Request classification: one caching policy per request class.

use reqwest::{Method, Request};
use url::{Origin, Url};

/// How the interceptor treats a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
  /// Scripture API: store first, network on miss, offline response on failure
  CacheFirst,
  /// Full-page load: serve the stored shell document, network on miss
  Shell,
  /// Static assets: serve cached copy now, refresh in the background
  StaleWhileRevalidate,
  /// Never cached (non-GET, e.g. generative-text calls)
  NetworkOnly,
}

#[derive(Debug, Clone)]
pub struct Classifier {
  scripture: Origin,
  app: Origin,
}

impl Classifier {
  pub fn new(scripture_base: &Url, app_origin: &Url) -> Self {
    Self {
      scripture: scripture_base.origin(),
      app: app_origin.origin(),
    }
  }

  pub fn classify(&self, request: &Request) -> Policy {
    if request.method() != Method::GET {
      return Policy::NetworkOnly;
    }

    let origin = request.url().origin();
    if origin == self.scripture {
      Policy::CacheFirst
    } else if is_navigation(request, origin == self.app) {
      Policy::Shell
    } else {
      Policy::StaleWhileRevalidate
    }
  }
}

fn is_navigation(request: &Request, same_origin: bool) -> bool {
  let headers = request.headers();
  let header_str = |name: &'static str| headers.get(name).and_then(|v| v.to_str().ok());

  if header_str("sec-fetch-mode") == Some("navigate") {
    return true;
  }
  same_origin && header_str("accept").is_some_and(|accept| accept.contains("text/html"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::header::{self, HeaderValue};

  fn classifier() -> Classifier {
    Classifier::new(
      &Url::parse("https://bible-api.com/").unwrap(),
      &Url::parse("http://localhost:5173/").unwrap(),
    )
  }

  fn get(url: &str) -> Request {
    Request::new(Method::GET, Url::parse(url).unwrap())
  }

  #[test]
  fn test_scripture_requests_are_cache_first() {
    let request = get("https://bible-api.com/John%203:16?translation=kjv");
    assert_eq!(classifier().classify(&request), Policy::CacheFirst);
  }

  #[test]
  fn test_same_host_other_port_is_not_scripture() {
    let request = get("https://bible-api.com:8443/John%203:16");
    assert_eq!(classifier().classify(&request), Policy::StaleWhileRevalidate);
  }

  #[test]
  fn test_html_on_app_origin_is_navigation() {
    let mut request = get("http://localhost:5173/read");
    request
      .headers_mut()
      .insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
    assert_eq!(classifier().classify(&request), Policy::Shell);
  }

  #[test]
  fn test_sec_fetch_mode_navigate_is_navigation() {
    let mut request = get("http://localhost:5173/journal");
    request
      .headers_mut()
      .insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    assert_eq!(classifier().classify(&request), Policy::Shell);
  }

  #[test]
  fn test_assets_are_stale_while_revalidate() {
    assert_eq!(
      classifier().classify(&get("http://localhost:5173/icon.svg")),
      Policy::StaleWhileRevalidate
    );
    assert_eq!(
      classifier().classify(&get("https://cdn.tailwindcss.com/")),
      Policy::StaleWhileRevalidate
    );
  }

  #[test]
  fn test_non_get_is_network_only() {
    let request = Request::new(
      Method::POST,
      Url::parse("https://generativelanguage.googleapis.com/v1beta/models/m:generateContent").unwrap(),
    );
    assert_eq!(classifier().classify(&request), Policy::NetworkOnly);
  }
}
