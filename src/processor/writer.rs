use crate::domain::{Feed, ProcessorConfig, TargetEntity};
use crate::errors::{ImportError, ImportResult};

/// Persists entities of the entity types it applies to.
#[cfg_attr(test, mockall::automock)]
pub trait TargetWriter: Send + Sync {
    fn applies_to(&self, entity_type: &str) -> bool;

    /// Blank entity for an item with no previously imported match.
    fn new_entity(&self, _feed: &Feed, config: &ProcessorConfig) -> TargetEntity {
        TargetEntity::new(config.entity_type.clone())
    }

    fn load(&self, id: i64) -> ImportResult<Option<TargetEntity>>;

    /// Seed defaults before mapping.
    fn prepare(
        &self,
        _entity: &mut TargetEntity,
        _feed: &Feed,
        _config: &ProcessorConfig,
    ) -> ImportResult<()> {
        Ok(())
    }

    /// `ImportError::Validation` when the entity must not be saved.
    fn validate(&self, entity: &TargetEntity) -> ImportResult<()>;

    /// `ImportError::AccessDenied` when the import may not write the entity.
    fn authorize(&self, _entity: &TargetEntity) -> ImportResult<()> {
        Ok(())
    }

    /// Insert or update and return the id, which is also set on `entity`.
    fn save(&self, entity: &mut TargetEntity) -> ImportResult<i64>;

    fn delete(&self, ids: &[i64]) -> ImportResult<()>;

    /// Entity of `feed_id` whose `target`/`column` already holds `value`.
    fn lookup_unique(
        &self,
        _feed_id: i64,
        _entity_type: &str,
        _target: &str,
        _column: &str,
        _value: &str,
    ) -> ImportResult<Option<i64>> {
        Ok(None)
    }
}

pub struct WriterRegistry {
    writers: Vec<Box<dyn TargetWriter>>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self {
            writers: Vec::new(),
        }
    }

    pub fn register(&mut self, writer: Box<dyn TargetWriter>) {
        self.writers.push(writer);
    }

    pub fn with(mut self, writer: Box<dyn TargetWriter>) -> Self {
        self.register(writer);
        self
    }

    /// First registered writer that applies to `entity_type`.
    pub fn find(&self, entity_type: &str) -> ImportResult<&dyn TargetWriter> {
        self.writers
            .iter()
            .find(|w| w.applies_to(entity_type))
            .map(|w| w.as_ref())
            .ok_or_else(|| ImportError::UnsupportedEntityType(entity_type.to_string()))
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
