use crate::domain::{Feed, ImporterConfig};
use crate::errors::{ImportError, ImportResult};
use crate::sources::SourceRegistry;
use crate::storage::traits::{FeedRepository, ImporterRepository};

/// Feed and importer bookkeeping around the pipeline.
pub struct FeedService<R: FeedRepository, C: ImporterRepository> {
    repository: R,
    importers: C,
    source_registry: SourceRegistry,
}

impl<R: FeedRepository, C: ImporterRepository> FeedService<R, C> {
    pub fn new(repository: R, importers: C, source_registry: SourceRegistry) -> Self {
        Self {
            repository,
            importers,
            source_registry,
        }
    }

    /// Subscribe `source` to an importer.
    /// Checks the importer exists and that its fetcher can read the source.
    pub fn add(&self, source: &str, importer_id: &str) -> ImportResult<Feed> {
        // Check if already exists
        if self.repository.exists(source)? {
            return Err(ImportError::FeedAlreadyExists(source.to_string()));
        }

        let importer = self
            .importers
            .get(importer_id)?
            .ok_or_else(|| ImportError::ImporterNotFound(importer_id.to_string()))?;

        let fetcher = self.source_registry.fetcher(importer.fetcher)?;
        if !fetcher.can_handle(source) {
            return Err(ImportError::InvalidInput(format!(
                "{} cannot be read by the {} fetcher",
                source, importer.fetcher
            )));
        }

        let feed = Feed::new(source.to_string(), importer_id.to_string());
        let id = self.repository.add(&feed)?;

        Ok(Feed {
            id: Some(id),
            ..feed
        })
    }

    /// Remove a feed by ID
    pub fn remove(&self, id: i64) -> ImportResult<()> {
        self.repository.remove(id)
    }

    /// List all feeds
    pub fn list(&self) -> ImportResult<Vec<Feed>> {
        self.repository.get_all()
    }

    /// Get a feed by ID
    pub fn get(&self, id: i64) -> ImportResult<Option<Feed>> {
        self.repository.get_by_id(id)
    }

    /// Store an importer configuration, replacing one with the same id.
    pub fn add_importer(&self, config: &ImporterConfig) -> ImportResult<()> {
        if config.id.trim().is_empty() {
            return Err(ImportError::InvalidInput(
                "importer id must not be empty".to_string(),
            ));
        }
        if config.processor.entity_type.trim().is_empty() {
            return Err(ImportError::InvalidInput(
                "entity_type must not be empty".to_string(),
            ));
        }

        // Fail now rather than on the first import
        self.source_registry.fetcher(config.fetcher)?;
        self.source_registry.parser(config.parser.kind)?;

        self.importers.save(config)
    }

    pub fn list_importers(&self) -> ImportResult<Vec<ImporterConfig>> {
        self.importers.get_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FetcherKind, ParserConfig, ParserKind, ProcessorConfig};
    use crate::storage::sqlite::{SqliteFeedRepository, SqliteImporterRepository, SqliteStorage};
    use crate::storage::traits::{MockFeedRepository, MockImporterRepository};

    fn setup() -> FeedService<SqliteFeedRepository, SqliteImporterRepository> {
        let storage = SqliteStorage::in_memory().unwrap();
        let repo = SqliteFeedRepository::new(storage.clone());
        let importers = SqliteImporterRepository::new(storage);
        FeedService::new(repo, importers, SourceRegistry::new())
    }

    fn importer(id: &str, fetcher: FetcherKind) -> ImporterConfig {
        ImporterConfig {
            id: id.to_string(),
            name: String::new(),
            fetcher,
            parser: ParserConfig::new(ParserKind::Syndication),
            processor: ProcessorConfig::new("article"),
        }
    }

    #[test]
    fn test_list_empty() {
        let service = setup();
        let feeds = service.list().unwrap();
        assert!(feeds.is_empty());
    }

    #[test]
    fn test_add_feed() {
        let service = setup();
        service.add_importer(&importer("blogs", FetcherKind::Http)).unwrap();

        let feed = service.add("https://blog.rust-lang.org/feed.xml", "blogs").unwrap();
        assert!(feed.id.is_some());
        assert_eq!(service.list().unwrap().len(), 1);
        assert_eq!(
            service.get(feed.id.unwrap()).unwrap().unwrap().importer,
            "blogs"
        );
    }

    #[test]
    fn test_add_duplicate() {
        let service = setup();
        service.add_importer(&importer("blogs", FetcherKind::Http)).unwrap();
        service.add("https://example.com/feed", "blogs").unwrap();

        assert!(matches!(
            service.add("https://example.com/feed", "blogs"),
            Err(ImportError::FeedAlreadyExists(_))
        ));
    }

    #[test]
    fn test_add_with_unknown_importer() {
        let service = setup();
        assert!(matches!(
            service.add("https://example.com/feed", "nope"),
            Err(ImportError::ImporterNotFound(_))
        ));
    }

    #[test]
    fn test_add_source_fetcher_cannot_read() {
        let service = setup();
        service.add_importer(&importer("blogs", FetcherKind::Http)).unwrap();

        assert!(matches!(
            service.add("/var/data/feed.xml", "blogs"),
            Err(ImportError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_add_importer_rejects_blank_id() {
        let service = setup();
        assert!(service.add_importer(&importer(" ", FetcherKind::File)).is_err());
        assert!(service.list_importers().unwrap().is_empty());
    }

    #[test]
    fn test_add_importer_checks_registered_kinds() {
        let mut importers = MockImporterRepository::new();
        importers.expect_save().never();

        let service = FeedService::new(MockFeedRepository::new(), importers, SourceRegistry::empty());
        assert!(matches!(
            service.add_importer(&importer("blogs", FetcherKind::Http)),
            Err(ImportError::UnsupportedFetcher(_))
        ));
    }

    #[test]
    fn test_remove_feed() {
        let mut repo = MockFeedRepository::new();
        repo.expect_remove()
            .with(mockall::predicate::eq(4))
            .times(1)
            .returning(|_| Ok(()));

        let service = FeedService::new(repo, MockImporterRepository::new(), SourceRegistry::new());
        service.remove(4).unwrap();
    }
}
