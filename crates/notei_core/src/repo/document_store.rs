//! Key-value document storage for versioned JSON payloads.
//!
//! # Responsibility
//! - Persist whole JSON payloads under stable keys.
//! - Provide a SQLite backend and an in-memory backend behind one trait.
//!
//! # Invariants
//! - `save` replaces the whole document atomically.
//! - A stored body that is not valid JSON is reported, never silently reset.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::{RepoError, RepoResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub const REMINDERS_KEY: &str = "reminders";
pub const REMINDER_LISTS_KEY: &str = "reminder_lists";
pub const CALENDAR_EVENTS_KEY: &str = "calendar_events";
pub const CALENDAR_SETTINGS_KEY: &str = "calendar_settings";

/// Whole-document load/save contract.
pub trait DocumentStore {
    fn load(&self, key: &str) -> RepoResult<Option<Value>>;
    fn save(&self, key: &str, value: &Value) -> RepoResult<()>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn load(&self, key: &str) -> RepoResult<Option<Value>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &Value) -> RepoResult<()> {
        (**self).save(key, value)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn load(&self, key: &str) -> RepoResult<Option<Value>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &Value) -> RepoResult<()> {
        (**self).save(key, value)
    }
}

/// SQLite-backed document store. Owns its migrated connection.
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// Wraps a connection that already went through `open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of saves applied to `key`; `None` when never written.
    pub fn revision(&self, key: &str) -> RepoResult<Option<i64>> {
        let revision = self
            .conn
            .query_row(
                "SELECT revision FROM documents WHERE key = ?1;",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(revision)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn load(&self, key: &str) -> RepoResult<Option<Value>> {
        let body = self
            .conn
            .query_row("SELECT body FROM documents WHERE key = ?1;", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;

        match body {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|err| {
                RepoError::InvalidData(format!("document `{key}` is not valid JSON: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: &Value) -> RepoResult<()> {
        let body = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO documents (key, body, updated_at, revision)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000), 1)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at,
                revision = documents.revision + 1;",
            params![key, body],
        )?;
        Ok(())
    }
}

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw payload, e.g. a legacy document shape.
    pub fn with_document(self, key: &str, value: Value) -> Self {
        self.documents.lock().insert(key.to_string(), value);
        self
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self, key: &str) -> RepoResult<Option<Value>> {
        Ok(self.documents.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> RepoResult<()> {
        self.documents.lock().insert(key.to_string(), value.clone());
        Ok(())
    }
}
