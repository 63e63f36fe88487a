use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_LOCK_TTL_SECS;
use crate::domain::{
    compose_progress, BatchReport, Feed, ImporterConfig, Stage, StageState, COMPLETE,
};
use crate::errors::{ImportError, ImportResult};
use crate::processor::Processor;
use crate::sources::{FetchCache, SourceRegistry};
use crate::storage::traits::{
    FeedLock, FeedRepository, ImporterRepository, ItemInfoRepository, LockToken,
};

/// Outcome of one import invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportStatus {
    /// Overall run progress; 1.0 once the run finished.
    pub progress: f64,
    /// What this invocation's batch did.
    pub report: BatchReport,
}

impl ImportStatus {
    pub fn is_complete(&self) -> bool {
        self.progress >= COMPLETE
    }
}

/// Drives feeds through fetch, parse and process in bounded batches.
///
/// Every entry point holds the feed's lock for the duration of one batch and
/// persists the feed's stage states before returning, so the next call picks
/// up where this one stopped. A failed batch leaves the states as they were
/// before it, and retrying repeats it.
pub struct Importer<F, C, L, I>
where
    F: FeedRepository,
    C: ImporterRepository,
    L: FeedLock,
    I: ItemInfoRepository,
{
    feeds: F,
    importers: C,
    lock: L,
    sources: SourceRegistry,
    processor: Processor<I>,
    limit: usize,
    lock_ttl: Duration,
}

impl<F, C, L, I> Importer<F, C, L, I>
where
    F: FeedRepository,
    C: ImporterRepository,
    L: FeedLock,
    I: ItemInfoRepository,
{
    pub fn new(
        feeds: F,
        importers: C,
        lock: L,
        sources: SourceRegistry,
        processor: Processor<I>,
        limit: usize,
    ) -> Self {
        Self {
            feeds,
            importers,
            lock,
            sources,
            processor,
            limit,
            lock_ttl: Duration::from_secs(DEFAULT_LOCK_TTL_SECS),
        }
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Import the next batch of a feed.
    pub fn import(&self, feed_id: i64) -> ImportResult<ImportStatus> {
        let mut cache = FetchCache::new();
        self.import_with_cache(feed_id, &mut cache)
    }

    /// Like [`Importer::import`], sharing downloads through `cache`.
    pub fn import_with_cache(
        &self,
        feed_id: i64,
        cache: &mut FetchCache,
    ) -> ImportResult<ImportStatus> {
        self.with_lock(feed_id, true, |feed, config| {
            self.run_import(feed, config, cache)
        })
    }

    /// Remove one batch of what the feed imported.
    pub fn clear(&self, feed_id: i64) -> ImportResult<f64> {
        self.with_lock(feed_id, false, |feed, config| self.run_clear(feed, config))
    }

    /// Remove one batch of the feed's expired entities.
    pub fn expire(&self, feed_id: i64) -> ImportResult<f64> {
        self.with_lock(feed_id, false, |feed, config| self.run_expire(feed, config))
    }

    /// Run `stage` on a working copy of the feed while holding its lock.
    /// The copy is persisted on success; on failure the feed is persisted as
    /// it was loaded, with `imported` stamped when `stamp_on_error` is set.
    fn with_lock<T>(
        &self,
        feed_id: i64,
        stamp_on_error: bool,
        stage: impl FnOnce(&mut Feed, &ImporterConfig) -> ImportResult<T>,
    ) -> ImportResult<T> {
        let token = self.lock.acquire(feed_id, self.lock_ttl)?;

        let outcome = self.run_locked(feed_id, token, stamp_on_error, stage);
        let released = self.lock.release(feed_id, token);

        let value = outcome?;
        released?;
        Ok(value)
    }

    fn run_locked<T>(
        &self,
        feed_id: i64,
        token: LockToken,
        stamp_on_error: bool,
        stage: impl FnOnce(&mut Feed, &ImporterConfig) -> ImportResult<T>,
    ) -> ImportResult<T> {
        let feed = self
            .feeds
            .get_by_id(feed_id)?
            .ok_or_else(|| ImportError::FeedNotFound(feed_id.to_string()))?;
        let config = self
            .importers
            .get(&feed.importer)?
            .ok_or_else(|| ImportError::ImporterNotFound(feed.importer.clone()))?;

        let mut working = feed.clone();
        match stage(&mut working, &config) {
            Ok(value) => {
                self.persist(token, &working)?;
                Ok(value)
            }
            Err(e) => {
                let mut original = feed;
                if stamp_on_error {
                    original.imported = Some(Utc::now().timestamp());
                }
                if let Err(save_err) = self.persist(token, &original) {
                    warn!(feed_id, error = %save_err, "Could not persist feed after failure");
                }
                Err(e)
            }
        }
    }

    /// Save the feed's run state, but only while `token` still holds the
    /// lock; the lease is extended first so it cannot lapse mid-save.
    fn persist(&self, token: LockToken, feed: &Feed) -> ImportResult<()> {
        let feed_id = feed
            .id
            .ok_or_else(|| ImportError::FeedNotFound(feed.source.clone()))?;
        self.lock.renew(feed_id, token, self.lock_ttl)?;
        self.feeds.save_state(feed)
    }

    fn run_import(
        &self,
        feed: &mut Feed,
        config: &ImporterConfig,
        cache: &mut FetchCache,
    ) -> ImportResult<ImportStatus> {
        let fetcher = self.sources.fetcher(config.fetcher)?;
        let parser = self.sources.parser(config.parser.kind)?;

        // Fetch when nothing is cached or the cached content is used up
        if feed.fetch_result.is_none() || feed.state_of(Stage::Parse).is_complete() {
            if feed.started.is_none() {
                feed.started = Some(Utc::now().timestamp());
                info!(source = %feed.source, importer = %config.id, "Import started");
            }

            let mut fetch_state = feed.state_of(Stage::Fetch);
            match fetcher.fetch(feed, &mut fetch_state, cache) {
                Ok(fetched) => {
                    feed.stage_states.insert(Stage::Fetch, fetch_state);
                    feed.fetch_result = Some(fetched);
                    feed.clear_state(Stage::Parse);
                }
                Err(ImportError::EmptyFeed(reason)) => {
                    info!(source = %feed.source, %reason, "Nothing to import");
                    return Ok(Self::finish(feed, BatchReport::default()));
                }
                Err(e) => return Err(e),
            }
        }

        let mut parse_state = feed.state_of(Stage::Parse);
        let mut parsed = match feed.fetch_result.as_ref() {
            Some(fetched) => {
                parser.parse(feed, fetched, &config.parser, &mut parse_state, self.limit)?
            }
            None => {
                return Err(ImportError::InvalidInput(format!(
                    "no fetched content for {}",
                    feed.source
                )))
            }
        };
        debug!(source = %feed.source, items = parsed.len(), "Parsed batch");

        let mut process_state = feed.state_of(Stage::Process);
        let report =
            self.processor
                .process(feed, &config.processor, &mut parsed, &mut process_state)?;
        feed.stage_states.insert(Stage::Parse, parse_state);
        feed.stage_states.insert(Stage::Process, process_state);

        let progress = compose_progress(&feed.state_of(Stage::Fetch), &feed.state_of(Stage::Parse));
        if progress >= COMPLETE {
            let totals = feed.state_of(Stage::Process).report;
            info!(source = %feed.source, %totals, "Import complete");
            return Ok(Self::finish(feed, report));
        }

        debug!(source = %feed.source, progress, %report, "Import batch done");
        Ok(ImportStatus { progress, report })
    }

    fn finish(feed: &mut Feed, report: BatchReport) -> ImportStatus {
        feed.imported = Some(Utc::now().timestamp());
        feed.reset_import();
        ImportStatus {
            progress: COMPLETE,
            report,
        }
    }

    fn run_clear(&self, feed: &mut Feed, config: &ImporterConfig) -> ImportResult<f64> {
        let fetcher = self.sources.fetcher(config.fetcher)?;
        let parser = self.sources.parser(config.parser.kind)?;

        let mut state = feed.state_of(Stage::Clear);
        if !feed.has_state(Stage::Clear) {
            info!(source = %feed.source, "Clearing imported entities");
        }

        fetcher.clear(feed, &mut state)?;
        parser.clear(feed, &mut state)?;
        self.processor.clear(feed, &config.processor, &mut state)?;

        Ok(Self::settle(feed, Stage::Clear, state))
    }

    fn run_expire(&self, feed: &mut Feed, config: &ImporterConfig) -> ImportResult<f64> {
        let mut state = feed.state_of(Stage::Expire);
        self.processor.expire(feed, &config.processor, &mut state)?;

        Ok(Self::settle(feed, Stage::Expire, state))
    }

    /// Keep the state of an unfinished stage, drop it once complete.
    fn settle(feed: &mut Feed, stage: Stage, state: StageState) -> f64 {
        let fraction = state.fraction;
        if state.is_complete() {
            info!(source = %feed.source, stage = %stage, processed = state.processed, "Stage complete");
            feed.clear_state(stage);
        } else {
            feed.stage_states.insert(stage, state);
        }
        fraction
    }
}
