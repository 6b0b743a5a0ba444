//! Request interception and the HTTP clients built around it.
//!
//! Two clients exist side by side. The *upstream* client talks to the network with
//! retries and nothing else. The *intercepted* client routes every request through
//! [`OfflineCache`] first, which answers from the store where its policy allows
//! and otherwise forwards to the network.

mod classify;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

pub use classify::{Classifier, Policy};
pub use middleware::{offline_response, OfflineCache, CACHED_AT_HEADER, CACHE_HEADER, OFFLINE_MESSAGE};

use crate::cache::CacheStorage;
use crate::config::NetworkConfig;
use crate::error::{Error, Result};

fn base_client(config: &NetworkConfig) -> Result<reqwest::Client> {
  reqwest::Client::builder()
    .user_agent(concat!("lumina/", env!("CARGO_PKG_VERSION")))
    .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
    .timeout(Duration::from_secs(config.request_timeout_secs))
    .build()
    .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}

fn retry(config: &NetworkConfig) -> RetryTransientMiddleware<ExponentialBackoff> {
  let policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
  RetryTransientMiddleware::new_with_policy(policy)
}

/// Network client without interception
pub fn upstream_client(config: &NetworkConfig) -> Result<ClientWithMiddleware> {
  Ok(
    ClientBuilder::new(base_client(config)?)
      .with(retry(config))
      .build(),
  )
}

/// Client whose requests pass through the offline cache before reaching the network
pub fn intercepted_client<S: CacheStorage>(
  cache: Arc<OfflineCache<S>>,
  config: &NetworkConfig,
) -> Result<ClientWithMiddleware> {
  Ok(
    ClientBuilder::new(base_client(config)?)
      .with_arc(cache)
      .with(retry(config))
      .build(),
  )
}
