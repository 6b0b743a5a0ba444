//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::traits::{CacheEntry, RequestKey, StoredResponse};
use crate::error::{Error, Result};

/// Trait for cache storage backends.
///
/// Entries live in named partitions. Implementations must tolerate concurrent
/// writers; a race on the same key resolves as last write wins.
pub trait CacheStorage: Send + Sync + 'static {
  /// Get a stored entry by key.
  fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CacheEntry>>;

  /// Store (or replace) the response for a key.
  fn store(&self, partition: &str, key: &RequestKey, response: &StoredResponse) -> Result<()>;

  /// Store a set of responses atomically: either every entry is written or none is.
  fn store_all(&self, partition: &str, entries: &[(RequestKey, StoredResponse)]) -> Result<()>;

  /// Delete every entry whose key matches, returning how many were removed.
  fn delete_matching(
    &self,
    partition: &str,
    predicate: &(dyn Fn(&RequestKey) -> bool + Send + Sync),
  ) -> Result<usize>;

  /// All keys stored in a partition.
  fn list_keys(&self, partition: &str) -> Result<BTreeSet<RequestKey>>;

  /// Names of every partition holding at least one entry.
  fn partitions(&self) -> Result<Vec<String>>;

  /// Delete a whole partition, returning how many entries were removed.
  fn drop_partition(&self, partition: &str) -> Result<usize>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) a storage file at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("Failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!(
        "Failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::with_connection(conn)
  }

  /// Non-durable storage, used by tests.
  pub fn in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn.busy_timeout(Duration::from_secs(5))?;
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| Error::Storage(format!("Failed to run cache migrations: {}", e)))
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS responses (
    partition TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    request_url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition, key_hash)
);

CREATE INDEX IF NOT EXISTS idx_responses_partition ON responses(partition);
"#;

impl CacheStorage for SqliteStorage {
  fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CacheEntry>> {
    let conn = self.conn()?;

    let row: Option<(u16, String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, headers, body, stored_at FROM responses
         WHERE partition = ? AND key_hash = ?",
        params![partition, key.hash()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()?;

    match row {
      Some((status, headers, body, stored_at)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)?;
        Ok(Some(CacheEntry {
          key: key.clone(),
          response: StoredResponse {
            status,
            headers,
            body,
          },
          stored_at: parse_datetime(&stored_at)?,
        }))
      }
      None => Ok(None),
    }
  }

  fn store(&self, partition: &str, key: &RequestKey, response: &StoredResponse) -> Result<()> {
    insert(&*self.conn()?, partition, key, response)
  }

  fn store_all(&self, partition: &str, entries: &[(RequestKey, StoredResponse)]) -> Result<()> {
    let conn = self.conn()?;
    let tx = conn.unchecked_transaction()?;
    for (key, response) in entries {
      insert(&tx, partition, key, response)?;
    }
    tx.commit()
      .map_err(|e| Error::Storage(format!("Failed to commit {} responses: {}", entries.len(), e)))
  }

  fn delete_matching(
    &self,
    partition: &str,
    predicate: &(dyn Fn(&RequestKey) -> bool + Send + Sync),
  ) -> Result<usize> {
    let conn = self.conn()?;

    let doomed: Vec<String> = {
      let mut stmt = conn.prepare("SELECT key_hash, request_url FROM responses WHERE partition = ?")?;
      let rows = stmt.query_map(params![partition], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
      })?;

      let mut doomed = Vec::new();
      for row in rows {
        let (hash, url) = row?;
        if predicate(&RequestKey::from_stored(url)) {
          doomed.push(hash);
        }
      }
      doomed
    };

    let tx = conn.unchecked_transaction()?;
    for hash in &doomed {
      tx.execute(
        "DELETE FROM responses WHERE partition = ? AND key_hash = ?",
        params![partition, hash],
      )?;
    }
    tx.commit()
      .map_err(|e| Error::Storage(format!("Failed to commit deletion: {}", e)))?;

    Ok(doomed.len())
  }

  fn list_keys(&self, partition: &str) -> Result<BTreeSet<RequestKey>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare("SELECT request_url FROM responses WHERE partition = ?")?;
    let keys = stmt
      .query_map(params![partition], |row| row.get::<_, String>(0))?
      .map(|r| r.map(RequestKey::from_stored))
      .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    Ok(keys)
  }

  fn partitions(&self) -> Result<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare("SELECT DISTINCT partition FROM responses ORDER BY partition")?;
    let names = stmt
      .query_map([], |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
  }

  fn drop_partition(&self, partition: &str) -> Result<usize> {
    let conn = self.conn()?;
    let removed = conn.execute("DELETE FROM responses WHERE partition = ?", params![partition])?;
    Ok(removed)
  }
}

fn insert(
  conn: &Connection,
  partition: &str,
  key: &RequestKey,
  response: &StoredResponse,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)?;
  conn
    .execute(
      "INSERT OR REPLACE INTO responses (partition, key_hash, request_url, status, headers, body, stored_at)
       VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        partition,
        key.hash(),
        key.as_str(),
        response.status,
        headers,
        response.body
      ],
    )
    .map_err(|e| Error::Storage(format!("Failed to store response for {}: {}", key, e)))?;
  Ok(())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| Error::Storage(format!("Failed to parse datetime '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  fn key(url: &str) -> RequestKey {
    RequestKey::from_url(&Url::parse(url).unwrap())
  }

  fn ok(body: &str) -> StoredResponse {
    StoredResponse::new(
      200,
      vec![("content-type".to_string(), "application/json".to_string())],
      body.as_bytes().to_vec(),
    )
  }

  #[test]
  fn test_store_and_lookup() {
    let storage = SqliteStorage::in_memory().unwrap();
    let k = key("https://bible-api.com/John%203:16?translation=kjv");

    assert!(storage.lookup("lumina-api-v3", &k).unwrap().is_none());
    storage.store("lumina-api-v3", &k, &ok("{\"text\":\"For God\"}")).unwrap();

    let entry = storage.lookup("lumina-api-v3", &k).unwrap().unwrap();
    assert_eq!(entry.key, k);
    assert_eq!(entry.response.body, b"{\"text\":\"For God\"}");
    assert_eq!(
      entry.response.headers,
      vec![("content-type".to_string(), "application/json".to_string())]
    );
  }

  #[test]
  fn test_store_all_writes_every_entry() {
    let storage = SqliteStorage::in_memory().unwrap();
    let entries = vec![
      (key("http://localhost/"), ok("<html>")),
      (key("http://localhost/index.css"), ok("body{}")),
    ];
    storage.store_all("lumina-static-v3", &entries).unwrap();

    assert_eq!(storage.list_keys("lumina-static-v3").unwrap().len(), 2);
    let entry = storage
      .lookup("lumina-static-v3", &key("http://localhost/index.css"))
      .unwrap()
      .unwrap();
    assert_eq!(entry.response.body, b"body{}");
  }

  #[test]
  fn test_partitions_are_isolated() {
    let storage = SqliteStorage::in_memory().unwrap();
    let k = key("https://bible-api.com/Mark%201?translation=web");
    storage.store("lumina-api-v3", &k, &ok("{}")).unwrap();

    assert!(storage.lookup("lumina-api-v4", &k).unwrap().is_none());
    assert_eq!(storage.partitions().unwrap(), vec!["lumina-api-v3".to_string()]);
  }

  #[test]
  fn test_store_replaces_existing_entry() {
    let storage = SqliteStorage::in_memory().unwrap();
    let k = key("http://localhost/app.css");
    storage.store("lumina-static-v3", &k, &ok("old")).unwrap();
    storage.store("lumina-static-v3", &k, &ok("new")).unwrap();

    let entry = storage.lookup("lumina-static-v3", &k).unwrap().unwrap();
    assert_eq!(entry.response.body, b"new");
    assert_eq!(storage.list_keys("lumina-static-v3").unwrap().len(), 1);
  }

  #[test]
  fn test_delete_matching_counts_removed() {
    let storage = SqliteStorage::in_memory().unwrap();
    for url in [
      "https://bible-api.com/Mark%201?translation=kjv",
      "https://bible-api.com/Mark%202?translation=kjv",
      "https://bible-api.com/Mark%201?translation=web",
    ] {
      storage.store("lumina-api-v3", &key(url), &ok("{}")).unwrap();
    }

    let removed = storage
      .delete_matching("lumina-api-v3", &|k: &RequestKey| {
        k.query_param("translation").as_deref() == Some("kjv")
      })
      .unwrap();

    assert_eq!(removed, 2);
    let left = storage.list_keys("lumina-api-v3").unwrap();
    assert_eq!(left.len(), 1);
    assert!(left.contains(&key("https://bible-api.com/Mark%201?translation=web")));
  }

  #[test]
  fn test_drop_partition() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.store("lumina-api-v2", &key("http://a/1"), &ok("{}")).unwrap();
    storage.store("lumina-api-v2", &key("http://a/2"), &ok("{}")).unwrap();
    storage.store("lumina-api-v3", &key("http://a/1"), &ok("{}")).unwrap();

    assert_eq!(storage.drop_partition("lumina-api-v2").unwrap(), 2);
    assert_eq!(storage.partitions().unwrap(), vec!["lumina-api-v3".to_string()]);
  }

  #[test]
  fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let k = key("https://bible-api.com/Jude%201?translation=kjv");

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage.store("lumina-api-v3", &k, &ok("{}")).unwrap();
    }

    let reopened = SqliteStorage::open_at(&path).unwrap();
    assert!(reopened.lookup("lumina-api-v3", &k).unwrap().is_some());
  }
}
