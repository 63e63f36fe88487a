pub mod mapping;
pub mod record;
pub mod writer;

pub use mapping::{MappingEngine, SourceCallback};
pub use record::RecordWriter;
pub use writer::{TargetWriter, WriterRegistry};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::domain::{
    BatchReport, Feed, Item, ItemInfo, MappingRule, ParseResult, ProcessorConfig, StageState,
    GUID_TARGET, URL_TARGET,
};
use crate::errors::{ImportError, ImportResult};
use crate::storage::traits::ItemInfoRepository;

/// SHA-256 hex of an item together with the mapping rules applied to it, so
/// a mapping change counts as a change too.
pub fn fingerprint(item: &Item, mappings: &[MappingRule]) -> ImportResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(item)?);
    hasher.update(serde_json::to_vec(mappings)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Turns parsed items into entities, skipping the ones that did not change
/// since they were last imported.
pub struct Processor<I: ItemInfoRepository> {
    item_info: I,
    writers: WriterRegistry,
    mapper: MappingEngine,
    limit: usize,
}

impl<I: ItemInfoRepository> Processor<I> {
    pub fn new(item_info: I, writers: WriterRegistry, limit: usize) -> Self {
        Self {
            item_info,
            writers,
            mapper: MappingEngine::new(),
            limit,
        }
    }

    pub fn with_mapper(mut self, mapper: MappingEngine) -> Self {
        self.mapper = mapper;
        self
    }

    /// Entities removed per clear or expire call.
    fn batch_size(&self) -> usize {
        self.limit.max(1)
    }

    fn feed_id(feed: &Feed) -> ImportResult<i64> {
        feed.id
            .ok_or_else(|| ImportError::FeedNotFound(feed.source.clone()))
    }

    /// Write every item of `parsed`. Per-item failures are counted and
    /// logged; side-index read errors abort the batch.
    pub fn process(
        &self,
        feed: &Feed,
        config: &ProcessorConfig,
        parsed: &mut ParseResult,
        state: &mut StageState,
    ) -> ImportResult<BatchReport> {
        let feed_id = Self::feed_id(feed)?;
        let writer = self.writers.find(&config.entity_type)?;
        let mut report = BatchReport::default();
        let mut seen = 0;

        while let Some(item) = parsed.shift_item() {
            seen += 1;
            let existing = self.find_existing(feed_id, feed, config, writer, &item)?;

            match existing {
                Some(id) if config.skip_existing => {
                    debug!(entity_id = id, "Skipping existing entity");
                    continue;
                }
                None if !config.insert_new => {
                    debug!("Skipping new item, inserts disabled");
                    continue;
                }
                _ => {}
            }

            let hash = fingerprint(&item, &config.mappings)?;
            if let Some(id) = existing {
                if !config.force_update && self.is_unchanged(&config.entity_type, id, &hash)? {
                    debug!(entity_id = id, "Item unchanged");
                    continue;
                }
            }

            match self.write_item(feed_id, feed, config, writer, &item, existing, &hash) {
                Ok(true) => report.created += 1,
                Ok(false) => report.updated += 1,
                Err(e) => {
                    report.failed += 1;
                    let guid = item.guid().unwrap_or_default();
                    if e.is_item_level() {
                        warn!(feed_id, guid, error = %e, "Item rejected");
                    } else {
                        error!(feed_id, guid, error = %e, "Item failed to import");
                    }
                }
            }
        }

        state.processed += seen;
        state.report.absorb(&report);
        Ok(report)
    }

    /// Entity previously imported for `item` by this feed, found through the
    /// unique mapping columns in declaration order.
    fn find_existing(
        &self,
        feed_id: i64,
        feed: &Feed,
        config: &ProcessorConfig,
        writer: &dyn TargetWriter,
        item: &Item,
    ) -> ImportResult<Option<i64>> {
        for rule in &config.mappings {
            for binding in rule.columns.iter().filter(|b| b.unique) {
                let values = self.mapper.source_values(feed, item, &binding.source);
                let Some(value) = values.first().filter(|v| !v.is_empty()) else {
                    continue;
                };

                let found = match rule.target.as_str() {
                    GUID_TARGET => self.item_info.find_by_guid(feed_id, &config.entity_type, value)?,
                    URL_TARGET => self.item_info.find_by_url(feed_id, &config.entity_type, value)?,
                    target => writer.lookup_unique(
                        feed_id,
                        &config.entity_type,
                        target,
                        &binding.column,
                        value,
                    )?,
                };

                if found.is_some() {
                    return Ok(found);
                }
            }
        }

        Ok(None)
    }

    fn is_unchanged(&self, entity_type: &str, id: i64, hash: &str) -> ImportResult<bool> {
        Ok(self
            .item_info
            .get(entity_type, id)?
            .map(|info| info.hash == hash)
            .unwrap_or(false))
    }

    /// Map, validate and save one item. Returns whether a new entity was
    /// created.
    #[allow(clippy::too_many_arguments)]
    fn write_item(
        &self,
        feed_id: i64,
        feed: &Feed,
        config: &ProcessorConfig,
        writer: &dyn TargetWriter,
        item: &Item,
        existing: Option<i64>,
        hash: &str,
    ) -> ImportResult<bool> {
        let mut entity = match existing {
            Some(id) => writer
                .load(id)?
                .unwrap_or_else(|| writer.new_entity(feed, config)),
            None => writer.new_entity(feed, config),
        };
        let created = entity.is_new();

        writer.prepare(&mut entity, feed, config)?;
        self.mapper.map(feed, item, &config.mappings, &mut entity);
        writer.validate(&entity)?;
        writer.authorize(&entity)?;
        let entity_id = writer.save(&mut entity)?;

        self.item_info.upsert(&ItemInfo {
            feed_id,
            entity_id,
            entity_type: config.entity_type.clone(),
            hash: hash.to_string(),
            url: entity.url.clone(),
            guid: entity.guid.clone(),
            imported_at: Utc::now().timestamp(),
        })?;

        Ok(created)
    }

    /// Delete one batch of the feed's entities. The first call counts what
    /// there is to delete; the stage completes on a short batch.
    pub fn clear(
        &self,
        feed: &Feed,
        config: &ProcessorConfig,
        state: &mut StageState,
    ) -> ImportResult<()> {
        let feed_id = Self::feed_id(feed)?;
        let writer = self.writers.find(&config.entity_type)?;

        if state.pointer.is_none() {
            let total = self.item_info.count(feed_id, &config.entity_type)?;
            state.progress(total, 0);
        }

        let ids = self
            .item_info
            .entity_ids(feed_id, &config.entity_type, self.batch_size())?;
        self.delete_batch(writer, &config.entity_type, &ids, state)?;
        let processed = state.processed + ids.len() as u64;
        state.pointer = Some(processed.to_string());
        self.record_batch(state, processed, ids.len());
        Ok(())
    }

    /// Delete one batch of entities imported longer than `expire_after` ago.
    /// The cutoff is fixed on the first call and kept in the pointer.
    pub fn expire(
        &self,
        feed: &Feed,
        config: &ProcessorConfig,
        state: &mut StageState,
    ) -> ImportResult<()> {
        let Some(expire_after) = config.expire_after else {
            state.progress(0, 0);
            return Ok(());
        };
        let feed_id = Self::feed_id(feed)?;
        let writer = self.writers.find(&config.entity_type)?;

        let before = match state.pointer.as_deref().and_then(|p| p.parse::<i64>().ok()) {
            Some(before) => before,
            None => {
                let before = Utc::now().timestamp() - expire_after;
                let total = self
                    .item_info
                    .count_expired(feed_id, &config.entity_type, before)?;
                state.progress(total, 0);
                state.pointer = Some(before.to_string());
                before
            }
        };

        let ids = self.item_info.expired_ids(
            feed_id,
            &config.entity_type,
            before,
            self.batch_size(),
        )?;
        self.delete_batch(writer, &config.entity_type, &ids, state)?;
        let processed = state.processed + ids.len() as u64;
        self.record_batch(state, processed, ids.len());
        Ok(())
    }

    fn delete_batch(
        &self,
        writer: &dyn TargetWriter,
        entity_type: &str,
        ids: &[i64],
        state: &mut StageState,
    ) -> ImportResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        writer.delete(ids)?;
        self.item_info.delete(entity_type, ids)?;
        state.message = Some(format!("removed {} {}", ids.len(), entity_type));
        Ok(())
    }

    fn record_batch(&self, state: &mut StageState, processed: u64, deleted: usize) {
        let total = if deleted < self.batch_size() {
            processed
        } else {
            state.total.max(processed + 1)
        };
        state.progress(total, processed);
    }
}
