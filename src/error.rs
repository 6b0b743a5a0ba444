//! Error taxonomy shared by every component.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// Connectivity, DNS or timeout failure
  #[error("Network error: {0}")]
  Network(String),
  /// Bad scripture reference or 4xx from the scripture API.
  /// The message is shown to the user as-is.
  #[error("{0}")]
  NotFound(String),
  /// Generative-text backend failure or missing credential
  #[error("{0}")]
  Provider(String),
  /// User-initiated abort, not a failure
  #[error("Download cancelled")]
  Cancelled,
  /// Cache or ledger read/write/delete failure
  #[error("Storage error: {0}")]
  Storage(String),
  #[error("Configuration error: {0}")]
  Config(String),
  /// Rejected user input, such as an empty prayer or an unknown plan day
  #[error("{0}")]
  Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Self::Storage(e.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Storage(e.to_string())
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Self::Network(e.to_string())
  }
}

impl From<reqwest_middleware::Error> for Error {
  fn from(e: reqwest_middleware::Error) -> Self {
    Self::Network(e.to_string())
  }
}

impl From<tokio::task::JoinError> for Error {
  fn from(e: tokio::task::JoinError) -> Self {
    Self::Storage(format!("Storage task failed: {}", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_found_message_is_verbatim() {
    let err = Error::NotFound("not found".to_string());
    assert_eq!(err.to_string(), "not found");
  }

  #[test]
  fn test_storage_errors_from_sqlite() {
    let err: Error = rusqlite::Error::InvalidQuery.into();
    assert!(matches!(err, Error::Storage(_)));
  }
}
