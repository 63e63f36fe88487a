use std::time::Duration;

use rusqlite::OptionalExtension;
use tracing::warn;

use crate::errors::{ImportError, ImportResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::{FeedLock, LockToken};

/// Lock held as a lease in `feeds.locked`: the unix time it expires at,
/// 0 when free. An expired lease counts as free. `feeds.lock_token` names
/// the current holder.
pub struct SqliteFeedLock {
    storage: SqliteStorage,
}

impl SqliteFeedLock {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

/// Unix time a lease taken at `now` for `ttl` runs out; at least one second.
fn lease_end(now: i64, ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
    now.saturating_add(secs)
}

impl FeedLock for SqliteFeedLock {
    fn acquire(&self, feed_id: i64, ttl: Duration) -> ImportResult<LockToken> {
        let now = chrono::Utc::now().timestamp();

        let conn = self.storage.connection()?;
        let token: Option<LockToken> = conn
            .query_row(
                "UPDATE feeds SET locked = ?1, lock_token = random()
                 WHERE id = ?2 AND locked <= ?3
                 RETURNING lock_token",
                (lease_end(now, ttl), feed_id, now),
                |row| row.get(0),
            )
            .optional()?;

        if let Some(token) = token {
            return Ok(token);
        }

        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM feeds WHERE id = ?1)")?;
        let exists: bool = stmt.query_row([feed_id], |row| row.get(0))?;
        if exists {
            Err(ImportError::Locked(feed_id))
        } else {
            Err(ImportError::FeedNotFound(feed_id.to_string()))
        }
    }

    fn renew(&self, feed_id: i64, token: LockToken, ttl: Duration) -> ImportResult<()> {
        let now = chrono::Utc::now().timestamp();

        let conn = self.storage.connection()?;
        let changed = conn.execute(
            "UPDATE feeds SET locked = ?1 WHERE id = ?2 AND lock_token = ?3",
            (lease_end(now, ttl), feed_id, token),
        )?;

        if changed == 1 {
            Ok(())
        } else {
            Err(ImportError::LeaseExpired(feed_id))
        }
    }

    fn release(&self, feed_id: i64, token: LockToken) -> ImportResult<()> {
        let conn = self.storage.connection()?;
        let changed = conn.execute(
            "UPDATE feeds SET locked = 0, lock_token = NULL WHERE id = ?1 AND lock_token = ?2",
            (feed_id, token),
        )?;

        if changed == 0 {
            warn!(feed_id, "Lock was taken over before release");
        }
        Ok(())
    }
}
