use rusqlite::OptionalExtension;

use crate::domain::ItemInfo;
use crate::errors::{ImportError, ImportResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::ItemInfoRepository;

pub struct SqliteItemInfoRepository {
    storage: SqliteStorage,
}

impl SqliteItemInfoRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    fn find_by(
        &self,
        column: &str,
        feed_id: i64,
        entity_type: &str,
        value: &str,
    ) -> ImportResult<Option<i64>> {
        let conn = self.storage.connection()?;
        let query = format!(
            "SELECT entity_id FROM item_info WHERE feed_id = ?1 AND entity_type = ?2 AND {} = ?3 ORDER BY entity_id LIMIT 1",
            column
        );
        let id = conn
            .query_row(&query, (feed_id, entity_type, value), |row| row.get(0))
            .optional()?;
        Ok(id)
    }
}

impl ItemInfoRepository for SqliteItemInfoRepository {
    fn get(&self, entity_type: &str, entity_id: i64) -> ImportResult<Option<ItemInfo>> {
        let conn = self.storage.connection()?;
        let info = conn
            .query_row(
                "SELECT feed_id, entity_id, entity_type, hash, url, guid, imported_at FROM item_info WHERE entity_type = ?1 AND entity_id = ?2",
                (entity_type, entity_id),
                |row| {
                    Ok(ItemInfo {
                        feed_id: row.get(0)?,
                        entity_id: row.get(1)?,
                        entity_type: row.get(2)?,
                        hash: row.get(3)?,
                        url: row.get(4)?,
                        guid: row.get(5)?,
                        imported_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    fn find_by_guid(
        &self,
        feed_id: i64,
        entity_type: &str,
        guid: &str,
    ) -> ImportResult<Option<i64>> {
        self.find_by("guid", feed_id, entity_type, guid)
    }

    fn find_by_url(&self, feed_id: i64, entity_type: &str, url: &str) -> ImportResult<Option<i64>> {
        self.find_by("url", feed_id, entity_type, url)
    }

    fn upsert(&self, info: &ItemInfo) -> ImportResult<()> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO item_info (entity_type, entity_id, feed_id, hash, url, guid, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (entity_type, entity_id) DO UPDATE SET
                feed_id = excluded.feed_id,
                hash = excluded.hash,
                url = excluded.url,
                guid = excluded.guid,
                imported_at = excluded.imported_at",
            (
                &info.entity_type,
                info.entity_id,
                info.feed_id,
                &info.hash,
                &info.url,
                &info.guid,
                info.imported_at,
            ),
        )?;
        Ok(())
    }

    fn count(&self, feed_id: i64, entity_type: &str) -> ImportResult<u64> {
        let conn = self.storage.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM item_info WHERE feed_id = ?1 AND entity_type = ?2",
            (feed_id, entity_type),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn entity_ids(&self, feed_id: i64, entity_type: &str, limit: usize) -> ImportResult<Vec<i64>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT entity_id FROM item_info WHERE feed_id = ?1 AND entity_type = ?2 ORDER BY entity_id LIMIT ?3",
        )?;
        let ids = stmt.query_map((feed_id, entity_type, limit as i64), |row| row.get(0))?;
        ids.collect::<Result<Vec<_>, _>>().map_err(ImportError::from)
    }

    fn count_expired(&self, feed_id: i64, entity_type: &str, before: i64) -> ImportResult<u64> {
        let conn = self.storage.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM item_info WHERE feed_id = ?1 AND entity_type = ?2 AND imported_at < ?3",
            (feed_id, entity_type, before),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn expired_ids(
        &self,
        feed_id: i64,
        entity_type: &str,
        before: i64,
        limit: usize,
    ) -> ImportResult<Vec<i64>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT entity_id FROM item_info WHERE feed_id = ?1 AND entity_type = ?2 AND imported_at < ?3 ORDER BY imported_at, entity_id LIMIT ?4",
        )?;
        let ids = stmt.query_map((feed_id, entity_type, before, limit as i64), |row| row.get(0))?;
        ids.collect::<Result<Vec<_>, _>>().map_err(ImportError::from)
    }

    fn delete(&self, entity_type: &str, entity_ids: &[i64]) -> ImportResult<()> {
        if entity_ids.is_empty() {
            return Ok(());
        }

        let conn = self.storage.connection()?;
        let mut stmt =
            conn.prepare("DELETE FROM item_info WHERE entity_type = ?1 AND entity_id = ?2")?;
        for id in entity_ids {
            stmt.execute((entity_type, id))?;
        }
        Ok(())
    }
}
