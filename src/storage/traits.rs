use std::time::Duration;

use crate::domain::{Feed, ImporterConfig, ItemInfo, TargetEntity};
use crate::errors::ImportResult;

#[cfg_attr(test, mockall::automock)]
pub trait FeedRepository: Send + Sync {
    fn add(&self, feed: &Feed) -> ImportResult<i64>;
    fn remove(&self, id: i64) -> ImportResult<()>;
    fn get_all(&self) -> ImportResult<Vec<Feed>>;
    fn get_by_id(&self, id: i64) -> ImportResult<Option<Feed>>;
    fn get_by_source(&self, source: &str) -> ImportResult<Option<Feed>>;
    fn exists(&self, source: &str) -> ImportResult<bool>;
    /// Persist run state: stage states, cached fetch result and timestamps.
    /// Never touches the lock.
    fn save_state(&self, feed: &Feed) -> ImportResult<()>;
}

/// Identifies the holder of a feed lock.
pub type LockToken = i64;

/// Per-feed mutual exclusion. Acquisition never waits: a held lock is an
/// immediate `ImportError::Locked`. Renew and release only act while the
/// caller's token still holds the lock.
#[cfg_attr(test, mockall::automock)]
pub trait FeedLock: Send + Sync {
    fn acquire(&self, feed_id: i64, ttl: Duration) -> ImportResult<LockToken>;
    /// Extend the lease, or `ImportError::LeaseExpired` if it was taken over.
    fn renew(&self, feed_id: i64, token: LockToken, ttl: Duration) -> ImportResult<()>;
    fn release(&self, feed_id: i64, token: LockToken) -> ImportResult<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ImporterRepository: Send + Sync {
    fn save(&self, config: &ImporterConfig) -> ImportResult<()>;
    fn get(&self, id: &str) -> ImportResult<Option<ImporterConfig>>;
    fn get_all(&self) -> ImportResult<Vec<ImporterConfig>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ItemInfoRepository: Send + Sync {
    fn get(&self, entity_type: &str, entity_id: i64) -> ImportResult<Option<ItemInfo>>;
    fn find_by_guid(&self, feed_id: i64, entity_type: &str, guid: &str)
        -> ImportResult<Option<i64>>;
    fn find_by_url(&self, feed_id: i64, entity_type: &str, url: &str) -> ImportResult<Option<i64>>;
    fn upsert(&self, info: &ItemInfo) -> ImportResult<()>;
    fn count(&self, feed_id: i64, entity_type: &str) -> ImportResult<u64>;
    fn entity_ids(&self, feed_id: i64, entity_type: &str, limit: usize) -> ImportResult<Vec<i64>>;
    /// Entities imported strictly before `before` (unix seconds).
    fn count_expired(&self, feed_id: i64, entity_type: &str, before: i64) -> ImportResult<u64>;
    fn expired_ids(
        &self,
        feed_id: i64,
        entity_type: &str,
        before: i64,
        limit: usize,
    ) -> ImportResult<Vec<i64>>;
    fn delete(&self, entity_type: &str, entity_ids: &[i64]) -> ImportResult<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait EntityRepository: Send + Sync {
    fn get(&self, id: i64) -> ImportResult<Option<TargetEntity>>;
    /// Insert or update; returns the entity id.
    fn save(&self, entity: &TargetEntity) -> ImportResult<i64>;
    fn delete(&self, ids: &[i64]) -> ImportResult<()>;
    /// Entity of `feed_id` whose `target`/`column` holds `value`.
    fn find_by_value(
        &self,
        feed_id: i64,
        entity_type: &str,
        target: &str,
        column: &str,
        value: &str,
    ) -> ImportResult<Option<i64>>;
}
