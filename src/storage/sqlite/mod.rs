mod connection;
mod entity_repository;
mod feed_repository;
mod importer_repository;
mod item_info_repository;
mod lock;

pub use connection::SqliteStorage;
pub use entity_repository::SqliteEntityRepository;
pub use feed_repository::SqliteFeedRepository;
pub use importer_repository::SqliteImporterRepository;
pub use item_info_repository::SqliteItemInfoRepository;
pub use lock::SqliteFeedLock;
