use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Column values of one position (delta) of a multi-valued target.
pub type FieldDelta = BTreeMap<String, String>;

/// Targets that carry the entity's natural identity instead of field data.
pub const GUID_TARGET: &str = "guid";
pub const URL_TARGET: &str = "url";

/// The record an item becomes once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntity {
    pub id: Option<i64>,
    pub entity_type: String,
    pub fields: BTreeMap<String, Vec<FieldDelta>>,
    pub url: Option<String>,
    pub guid: Option<String>,
}

impl TargetEntity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            id: None,
            entity_type: entity_type.into(),
            fields: BTreeMap::new(),
            url: None,
            guid: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn clear_target(&mut self, target: &str) {
        match target {
            GUID_TARGET => self.guid = None,
            URL_TARGET => self.url = None,
            _ => {
                self.fields.remove(target);
            }
        }
    }

    pub fn set_target(&mut self, target: &str, deltas: Vec<FieldDelta>) {
        let first = deltas.first().and_then(primary_value).map(str::to_string);

        match target {
            GUID_TARGET => self.guid = first,
            URL_TARGET => self.url = first,
            _ if deltas.is_empty() => {
                self.fields.remove(target);
            }
            _ => {
                self.fields.insert(target.to_string(), deltas);
            }
        }
    }

    /// First value of `target`: its `value` column, or else whatever column
    /// the first delta has.
    pub fn value(&self, target: &str) -> Option<&str> {
        match target {
            GUID_TARGET => self.guid.as_deref(),
            URL_TARGET => self.url.as_deref(),
            _ => {
                primary_value(self.fields.get(target)?.first()?)
            }
        }
    }
}

/// The `value` column of a delta, or else its first column by name.
fn primary_value(delta: &FieldDelta) -> Option<&str> {
    delta
        .get("value")
        .or_else(|| delta.values().next())
        .map(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(column: &str, value: &str) -> FieldDelta {
        let mut d = FieldDelta::new();
        d.insert(column.to_string(), value.to_string());
        d
    }

    #[test]
    fn test_identity_targets_set_natural_keys() {
        let mut entity = TargetEntity::new("article");
        entity.set_target("guid", vec![delta("value", "urn:7")]);
        entity.set_target("url", vec![delta("value", "https://example.com/7")]);

        assert_eq!(entity.guid.as_deref(), Some("urn:7"));
        assert_eq!(entity.value("url"), Some("https://example.com/7"));
        assert!(entity.fields.is_empty());
    }

    #[test]
    fn test_value_prefers_value_column() {
        let mut entity = TargetEntity::new("article");
        let mut d = delta("title", "Link text");
        d.insert("value".to_string(), "https://example.com".to_string());
        entity.set_target("link", vec![d]);

        assert_eq!(entity.value("link"), Some("https://example.com"));
    }

    #[test]
    fn test_identity_comes_from_value_column() {
        let mut entity = TargetEntity::new("product");
        let mut d = delta("alt", "legacy-7");
        d.insert("value".to_string(), "sku-7".to_string());
        entity.set_target("guid", vec![d]);

        assert_eq!(entity.guid.as_deref(), Some("sku-7"));
    }

    #[test]
    fn test_clear_target() {
        let mut entity = TargetEntity::new("article");
        entity.set_target("title", vec![delta("value", "Hello")]);
        entity.clear_target("title");
        assert_eq!(entity.value("title"), None);
    }
}
