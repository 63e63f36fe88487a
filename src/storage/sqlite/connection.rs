use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{ImportError, ImportResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS importers (
    id TEXT PRIMARY KEY,
    config TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS feeds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL UNIQUE,
    importer TEXT NOT NULL,
    stage_states TEXT NOT NULL DEFAULT '{}',
    fetch_result TEXT,
    started INTEGER,
    imported INTEGER,
    locked INTEGER NOT NULL DEFAULT 0,
    lock_token INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_feeds_source ON feeds(source);

CREATE TABLE IF NOT EXISTS item_info (
    entity_type TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    feed_id INTEGER NOT NULL,
    hash TEXT NOT NULL,
    url TEXT,
    guid TEXT,
    imported_at INTEGER NOT NULL,
    PRIMARY KEY (entity_type, entity_id),
    FOREIGN KEY (feed_id) REFERENCES feeds(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_item_info_feed ON item_info(feed_id, entity_type);
CREATE INDEX IF NOT EXISTS idx_item_info_guid ON item_info(feed_id, guid);
CREATE INDEX IF NOT EXISTS idx_item_info_url ON item_info(feed_id, url);

CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    fields TEXT NOT NULL DEFAULT '{}',
    url TEXT,
    guid TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS entity_values (
    entity_id INTEGER NOT NULL,
    target TEXT NOT NULL,
    column_name TEXT NOT NULL,
    delta INTEGER NOT NULL,
    value TEXT NOT NULL,
    FOREIGN KEY (entity_id) REFERENCES entities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entity_values_lookup ON entity_values(target, column_name, value);
"#;

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> ImportResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> ImportResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ImportError> {
        self.conn
            .lock()
            .map_err(|_| ImportError::Database(rusqlite::Error::InvalidQuery))
    }
}
