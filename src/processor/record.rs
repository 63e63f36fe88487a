use crate::domain::TargetEntity;
use crate::errors::{ImportError, ImportResult};
use crate::processor::writer::TargetWriter;
use crate::storage::traits::EntityRepository;

/// Writes generic records through an [`EntityRepository`].
///
/// With no entity types configured it applies to every type. Required
/// fields are checked on validation; an entity without any value never
/// validates.
pub struct RecordWriter<E: EntityRepository> {
    repository: E,
    entity_types: Vec<String>,
    required: Vec<String>,
}

impl<E: EntityRepository> RecordWriter<E> {
    pub fn new(repository: E) -> Self {
        Self {
            repository,
            entity_types: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn for_type(mut self, entity_type: &str) -> Self {
        self.entity_types.push(entity_type.to_string());
        self
    }

    pub fn require(mut self, target: &str) -> Self {
        self.required.push(target.to_string());
        self
    }
}

impl<E: EntityRepository> TargetWriter for RecordWriter<E> {
    fn applies_to(&self, entity_type: &str) -> bool {
        self.entity_types.is_empty() || self.entity_types.iter().any(|t| t == entity_type)
    }

    fn load(&self, id: i64) -> ImportResult<Option<TargetEntity>> {
        self.repository.get(id)
    }

    fn validate(&self, entity: &TargetEntity) -> ImportResult<()> {
        if entity.fields.is_empty() && entity.guid.is_none() && entity.url.is_none() {
            return Err(ImportError::Validation(format!(
                "{} has no values",
                entity.entity_type
            )));
        }

        for target in &self.required {
            let present = entity
                .value(target)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(ImportError::Validation(format!(
                    "{} requires {}",
                    entity.entity_type, target
                )));
            }
        }

        Ok(())
    }

    fn save(&self, entity: &mut TargetEntity) -> ImportResult<i64> {
        let id = self.repository.save(entity)?;
        entity.id = Some(id);
        Ok(id)
    }

    fn delete(&self, ids: &[i64]) -> ImportResult<()> {
        self.repository.delete(ids)
    }

    fn lookup_unique(
        &self,
        feed_id: i64,
        entity_type: &str,
        target: &str,
        column: &str,
        value: &str,
    ) -> ImportResult<Option<i64>> {
        self.repository
            .find_by_value(feed_id, entity_type, target, column, value)
    }
}
