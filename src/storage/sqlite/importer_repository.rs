use rusqlite::OptionalExtension;

use crate::domain::ImporterConfig;
use crate::errors::ImportResult;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::ImporterRepository;

pub struct SqliteImporterRepository {
    storage: SqliteStorage,
}

impl SqliteImporterRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl ImporterRepository for SqliteImporterRepository {
    fn save(&self, config: &ImporterConfig) -> ImportResult<()> {
        let json = serde_json::to_string(config)?;
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO importers (id, config) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET config = excluded.config, updated_at = datetime('now')",
            (&config.id, json),
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> ImportResult<Option<ImporterConfig>> {
        let conn = self.storage.connection()?;
        let json: Option<String> = conn
            .query_row("SELECT config FROM importers WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    fn get_all(&self) -> ImportResult<Vec<ImporterConfig>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT config FROM importers ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut configs = Vec::new();
        for json in rows {
            configs.push(serde_json::from_str(&json?)?);
        }
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FetcherKind, MappingRule, ParserConfig, ParserKind, ProcessorConfig};

    fn config(id: &str) -> ImporterConfig {
        let mut processor = ProcessorConfig::new("product");
        processor.mappings.push(MappingRule::unique("sku", "sku"));

        ImporterConfig {
            id: id.to_string(),
            name: "Products".to_string(),
            fetcher: FetcherKind::File,
            parser: ParserConfig::new(ParserKind::Csv),
            processor,
        }
    }

    #[test]
    fn test_save_and_get() {
        let repo = SqliteImporterRepository::new(SqliteStorage::in_memory().unwrap());
        repo.save(&config("products")).unwrap();

        assert_eq!(repo.get("products").unwrap(), Some(config("products")));
        assert_eq!(repo.get("missing").unwrap(), None);
    }

    #[test]
    fn test_save_replaces() {
        let repo = SqliteImporterRepository::new(SqliteStorage::in_memory().unwrap());
        repo.save(&config("products")).unwrap();

        let mut updated = config("products");
        updated.processor.force_update = true;
        repo.save(&updated).unwrap();

        let all = repo.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].processor.force_update);
    }
}
