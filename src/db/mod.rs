pub mod schema;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

/// Local key/value store for application state that must survive restarts.
///
/// Shared between the offline ledger and the journal, bookmark and plan stores.
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at an explicit path
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!(
        "Failed to open database at {}: {}",
        path.display(),
        e
      ))
    })?;

    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;

    Ok(db)
  }

  pub fn in_memory() -> Result<Self> {
    let db = Self {
      conn: Mutex::new(Connection::open_in_memory()?),
    };
    db.run_migrations()?;
    Ok(db)
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("Database lock poisoned: {}", e)))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| Error::Storage(format!("Failed to run migrations: {}", e)))
  }

  /// Read a JSON value stored under `key`
  pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    read_json(&*self.conn()?, key)
  }

  /// Write a JSON value under `key`, replacing any previous value
  pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    write_json(&*self.conn()?, key, value)
  }

  /// Read-modify-write of the value under `key`, holding the connection for the
  /// whole update. A missing value starts from `T::default()`. Nothing is written
  /// when `f` fails.
  pub fn update_json<T, R, F>(&self, key: &str, f: F) -> Result<R>
  where
    T: DeserializeOwned + Serialize + Default,
    F: FnOnce(&mut T) -> Result<R>,
  {
    let conn = self.conn()?;
    let mut value: T = read_json(&conn, key)?.unwrap_or_default();
    let out = f(&mut value)?;
    write_json(&conn, key, &value)?;
    Ok(out)
  }
}

fn read_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT value FROM app_state WHERE key = ?",
      params![key],
      |row| row.get(0),
    )
    .optional()?;

  match raw {
    Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
    None => Ok(None),
  }
}

fn write_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
  let raw = serde_json::to_string(value)?;
  conn
    .execute(
      "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?, ?, datetime('now'))",
      params![key, raw],
    )
    .map_err(|e| Error::Storage(format!("Failed to write '{}': {}", key, e)))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  #[test]
  fn test_json_round_trip_and_replace() {
    let db = Database::in_memory().unwrap();
    assert!(db.get_json::<BTreeMap<String, String>>("offlineStatuses").unwrap().is_none());

    let mut map = BTreeMap::new();
    map.insert("kjv".to_string(), "downloaded".to_string());
    db.put_json("offlineStatuses", &map).unwrap();

    map.insert("web".to_string(), "error".to_string());
    db.put_json("offlineStatuses", &map).unwrap();

    let loaded: BTreeMap<String, String> = db.get_json("offlineStatuses").unwrap().unwrap();
    assert_eq!(loaded, map);
  }

  #[test]
  fn test_failed_update_writes_nothing() {
    let db = Database::in_memory().unwrap();
    db.put_json("count", &1u32).unwrap();

    let result: Result<()> = db.update_json("count", |n: &mut u32| {
      *n += 1;
      Err(Error::Invalid("no".to_string()))
    });
    assert!(result.is_err());
    assert_eq!(db.get_json::<u32>("count").unwrap(), Some(1));

    let next = db
      .update_json("count", |n: &mut u32| {
        *n += 1;
        Ok(*n)
      })
      .unwrap();
    assert_eq!(next, 2);
    assert_eq!(db.get_json::<u32>("count").unwrap(), Some(2));
  }

  #[test]
  fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    Database::open_at(&path).unwrap().put_json("k", &42u32).unwrap();

    let reopened = Database::open_at(&path).unwrap();
    assert_eq!(reopened.get_json::<u32>("k").unwrap(), Some(42));
  }
}
