pub mod traits;
pub mod sqlite;

pub use traits::{
    EntityRepository, FeedLock, FeedRepository, ImporterRepository, ItemInfoRepository, LockToken,
};
pub use sqlite::{
    SqliteEntityRepository, SqliteFeedLock, SqliteFeedRepository, SqliteImporterRepository,
    SqliteItemInfoRepository, SqliteStorage,
};
