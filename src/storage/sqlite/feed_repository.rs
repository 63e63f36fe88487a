use rusqlite::types::Type;
use rusqlite::Row;

use crate::domain::Feed;
use crate::errors::{ImportError, ImportResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::FeedRepository;

const FEED_COLUMNS: &str =
    "id, source, importer, stage_states, fetch_result, started, imported, locked, created_at";

pub struct SqliteFeedRepository {
    storage: SqliteStorage,
}

impl SqliteFeedRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
    let locked_until: i64 = row.get(7)?;

    Ok(Feed {
        id: Some(row.get(0)?),
        source: row.get(1)?,
        importer: row.get(2)?,
        stage_states: json_column(row, 3)?.unwrap_or_default(),
        fetch_result: json_column(row, 4)?,
        started: row.get(5)?,
        imported: row.get(6)?,
        locked: locked_until > chrono::Utc::now().timestamp(),
        created_at: row.get(8)?,
    })
}

impl FeedRepository for SqliteFeedRepository {
    fn add(&self, feed: &Feed) -> ImportResult<i64> {
        let conn = self.storage.connection()?;

        // Check if already exists (within the same connection to avoid deadlock)
        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM feeds WHERE source = ?1)")?;
        let exists: bool = stmt.query_row([&feed.source], |row| row.get(0))?;
        drop(stmt);

        if exists {
            return Err(ImportError::FeedAlreadyExists(feed.source.clone()));
        }

        conn.execute(
            "INSERT INTO feeds (source, importer, stage_states) VALUES (?1, ?2, ?3)",
            (
                &feed.source,
                &feed.importer,
                serde_json::to_string(&feed.stage_states)?,
            ),
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn remove(&self, id: i64) -> ImportResult<()> {
        let conn = self.storage.connection()?;
        conn.execute("DELETE FROM feeds WHERE id = ?1", [id])?;
        Ok(())
    }

    fn get_all(&self) -> ImportResult<Vec<Feed>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeds ORDER BY id",
            FEED_COLUMNS
        ))?;

        let feeds = stmt.query_map([], feed_from_row)?;
        feeds.collect::<Result<Vec<_>, _>>().map_err(ImportError::from)
    }

    fn get_by_id(&self, id: i64) -> ImportResult<Option<Feed>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM feeds WHERE id = ?1", FEED_COLUMNS))?;

        match stmt.query_row([id], feed_from_row) {
            Ok(f) => Ok(Some(f)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ImportError::from(e)),
        }
    }

    fn get_by_source(&self, source: &str) -> ImportResult<Option<Feed>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeds WHERE source = ?1",
            FEED_COLUMNS
        ))?;

        match stmt.query_row([source], feed_from_row) {
            Ok(f) => Ok(Some(f)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ImportError::from(e)),
        }
    }

    fn exists(&self, source: &str) -> ImportResult<bool> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM feeds WHERE source = ?1)")?;
        let exists: bool = stmt.query_row([source], |row| row.get(0))?;
        Ok(exists)
    }

    fn save_state(&self, feed: &Feed) -> ImportResult<()> {
        let id = feed
            .id
            .ok_or_else(|| ImportError::FeedNotFound("Feed has no ID".to_string()))?;

        let stage_states = serde_json::to_string(&feed.stage_states)?;
        let fetch_result = feed
            .fetch_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.storage.connection()?;
        let changed = conn.execute(
            "UPDATE feeds SET stage_states = ?1, fetch_result = ?2, started = ?3, imported = ?4 WHERE id = ?5",
            (stage_states, fetch_result, feed.started, feed.imported, id),
        )?;

        if changed == 0 {
            return Err(ImportError::FeedNotFound(id.to_string()));
        }
        Ok(())
    }
}
