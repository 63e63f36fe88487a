use rusqlite::types::Type;
use rusqlite::OptionalExtension;

use crate::domain::TargetEntity;
use crate::errors::ImportResult;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::EntityRepository;

/// Generic record storage. Field values are kept as JSON on the row and
/// flattened into `entity_values` for unique-value lookups.
pub struct SqliteEntityRepository {
    storage: SqliteStorage,
}

impl SqliteEntityRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl EntityRepository for SqliteEntityRepository {
    fn get(&self, id: i64) -> ImportResult<Option<TargetEntity>> {
        let conn = self.storage.connection()?;
        let entity = conn
            .query_row(
                "SELECT id, entity_type, fields, url, guid FROM entities WHERE id = ?1",
                [id],
                |row| {
                    let fields: String = row.get(2)?;
                    Ok(TargetEntity {
                        id: Some(row.get(0)?),
                        entity_type: row.get(1)?,
                        fields: serde_json::from_str(&fields).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                        })?,
                        url: row.get(3)?,
                        guid: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(entity)
    }

    fn save(&self, entity: &TargetEntity) -> ImportResult<i64> {
        let fields = serde_json::to_string(&entity.fields)?;
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;

        let id = match entity.id {
            Some(id) => {
                tx.execute(
                    "UPDATE entities SET entity_type = ?1, fields = ?2, url = ?3, guid = ?4, updated_at = datetime('now') WHERE id = ?5",
                    (&entity.entity_type, &fields, &entity.url, &entity.guid, id),
                )?;
                tx.execute("DELETE FROM entity_values WHERE entity_id = ?1", [id])?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO entities (entity_type, fields, url, guid) VALUES (?1, ?2, ?3, ?4)",
                    (&entity.entity_type, &fields, &entity.url, &entity.guid),
                )?;
                tx.last_insert_rowid()
            }
        };

        {
            let mut stmt = tx.prepare(
                "INSERT INTO entity_values (entity_id, target, column_name, delta, value) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (target, deltas) in &entity.fields {
                for (delta, columns) in deltas.iter().enumerate() {
                    for (column, value) in columns {
                        stmt.execute((id, target, column, delta as i64, value))?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(id)
    }

    fn delete(&self, ids: &[i64]) -> ImportResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("DELETE FROM entities WHERE id = ?1")?;
        for id in ids {
            stmt.execute([id])?;
        }
        Ok(())
    }

    fn find_by_value(
        &self,
        feed_id: i64,
        entity_type: &str,
        target: &str,
        column: &str,
        value: &str,
    ) -> ImportResult<Option<i64>> {
        let conn = self.storage.connection()?;
        let id = conn
            .query_row(
                "SELECT v.entity_id FROM entity_values v
                 JOIN item_info i ON i.entity_id = v.entity_id AND i.entity_type = ?2
                 WHERE i.feed_id = ?1 AND v.target = ?3 AND v.column_name = ?4 AND v.value = ?5
                 ORDER BY v.entity_id LIMIT 1",
                (feed_id, entity_type, target, column, value),
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Feed, FieldDelta, ItemInfo};
    use crate::storage::sqlite::{SqliteFeedRepository, SqliteItemInfoRepository};
    use crate::storage::traits::{FeedRepository, ItemInfoRepository};

    fn delta(value: &str) -> Vec<FieldDelta> {
        let mut d = FieldDelta::new();
        d.insert("value".to_string(), value.to_string());
        vec![d]
    }

    #[test]
    fn test_save_load_update() {
        let repo = SqliteEntityRepository::new(SqliteStorage::in_memory().unwrap());

        let mut entity = TargetEntity::new("product");
        entity.set_target("title", delta("Widget"));
        let id = repo.save(&entity).unwrap();

        let mut loaded = repo.get(id).unwrap().unwrap();
        assert_eq!(loaded.value("title"), Some("Widget"));

        loaded.set_target("title", delta("Gadget"));
        assert_eq!(repo.save(&loaded).unwrap(), id);
        assert_eq!(repo.get(id).unwrap().unwrap().value("title"), Some("Gadget"));

        repo.delete(&[id]).unwrap();
        assert!(repo.get(id).unwrap().is_none());
    }

    #[test]
    fn test_find_by_value_is_scoped_to_feed() {
        let storage = SqliteStorage::in_memory().unwrap();
        let feeds = SqliteFeedRepository::new(storage.clone());
        let infos = SqliteItemInfoRepository::new(storage.clone());
        let repo = SqliteEntityRepository::new(storage);

        let feed_a = feeds.add(&Feed::new("a.csv".to_string(), "p".to_string())).unwrap();
        let feed_b = feeds.add(&Feed::new("b.csv".to_string(), "p".to_string())).unwrap();

        let mut entity = TargetEntity::new("product");
        entity.set_target("sku", delta("SKU-1"));
        let id = repo.save(&entity).unwrap();
        infos
            .upsert(&ItemInfo {
                feed_id: feed_a,
                entity_id: id,
                entity_type: "product".to_string(),
                hash: "h".to_string(),
                url: None,
                guid: None,
                imported_at: 0,
            })
            .unwrap();

        assert_eq!(
            repo.find_by_value(feed_a, "product", "sku", "value", "SKU-1").unwrap(),
            Some(id)
        );
        assert_eq!(
            repo.find_by_value(feed_b, "product", "sku", "value", "SKU-1").unwrap(),
            None
        );
        assert_eq!(
            repo.find_by_value(feed_a, "product", "sku", "value", "SKU-2").unwrap(),
            None
        );
    }
}
