use std::collections::BTreeMap;

use crate::domain::{Feed, FieldDelta, Item, MappingRule, TargetEntity};

/// Produces values for mapping sources that are not plain item keys.
pub trait SourceCallback: Send + Sync {
    fn applies_to(&self, source: &str) -> bool;
    fn values(&self, feed: &Feed, item: &Item, source: &str) -> Vec<String>;
}

/// `parent:id`, the id of the feed the item came from.
struct ParentId;

impl SourceCallback for ParentId {
    fn applies_to(&self, source: &str) -> bool {
        source == "parent:id"
    }

    fn values(&self, feed: &Feed, _item: &Item, _source: &str) -> Vec<String> {
        feed.id.map(|id| vec![id.to_string()]).unwrap_or_default()
    }
}

/// `parent:source`, the feed's source path or URL.
struct ParentSource;

impl SourceCallback for ParentSource {
    fn applies_to(&self, source: &str) -> bool {
        source == "parent:source"
    }

    fn values(&self, feed: &Feed, _item: &Item, _source: &str) -> Vec<String> {
        vec![feed.source.clone()]
    }
}

/// `blank`, an empty value.
struct Blank;

impl SourceCallback for Blank {
    fn applies_to(&self, source: &str) -> bool {
        source == "blank"
    }

    fn values(&self, _feed: &Feed, _item: &Item, _source: &str) -> Vec<String> {
        vec![String::new()]
    }
}

/// Copies item values onto entity targets according to mapping rules.
pub struct MappingEngine {
    callbacks: Vec<Box<dyn SourceCallback>>,
}

impl MappingEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            callbacks: Vec::new(),
        };
        engine.register(Box::new(ParentId));
        engine.register(Box::new(ParentSource));
        engine.register(Box::new(Blank));
        engine
    }

    pub fn register(&mut self, callback: Box<dyn SourceCallback>) {
        self.callbacks.push(callback);
    }

    /// Values of `source` for `item`: from the first callback that applies,
    /// else the item's own key. A scalar is one value, a list is many.
    pub fn source_values(&self, feed: &Feed, item: &Item, source: &str) -> Vec<String> {
        if let Some(callback) = self.callbacks.iter().find(|c| c.applies_to(source)) {
            return callback.values(feed, item, source);
        }

        item.get(source).map(|v| v.values()).unwrap_or_default()
    }

    pub fn map(&self, feed: &Feed, item: &Item, rules: &[MappingRule], entity: &mut TargetEntity) {
        for rule in rules {
            entity.clear_target(&rule.target);
        }

        let mut targets: BTreeMap<&str, Vec<FieldDelta>> = BTreeMap::new();
        for rule in rules {
            let mut deltas: Vec<FieldDelta> = Vec::new();

            for binding in &rule.columns {
                let values = self.source_values(feed, item, &binding.source);
                for (delta, value) in values.into_iter().enumerate() {
                    if deltas.len() <= delta {
                        deltas.resize_with(delta + 1, FieldDelta::new);
                    }
                    deltas[delta].insert(binding.column.clone(), value);
                }
            }

            // Rules sharing a target append to it
            targets.entry(rule.target.as_str()).or_default().extend(deltas);
        }

        for (target, deltas) in targets {
            entity.set_target(target, deltas);
        }
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> Feed {
        let mut feed = Feed::new("/data/products.csv".to_string(), "products".to_string());
        feed.id = Some(3);
        feed
    }

    fn column(entity: &TargetEntity, target: &str, delta: usize, column: &str) -> Option<String> {
        entity.fields.get(target)?.get(delta)?.get(column).cloned()
    }

    #[test]
    fn test_simple_mapping() {
        let item = Item::new().with("name", "Kettle").with("sku", "a1");
        let mut entity = TargetEntity::new("product");

        MappingEngine::new().map(
            &feed(),
            &item,
            &[MappingRule::simple("title", "name"), MappingRule::simple("guid", "sku")],
            &mut entity,
        );

        assert_eq!(entity.value("title"), Some("Kettle"));
        assert_eq!(entity.guid.as_deref(), Some("a1"));
    }

    #[test]
    fn test_list_values_become_deltas() {
        let item = Item::new()
            .with("tags", vec!["tea".to_string(), "kitchen".to_string()])
            .with("weights", vec!["1".to_string(), "2".to_string()]);
        let rule = MappingRule::simple("tags", "tags").with_column("weight", "weights");
        let mut entity = TargetEntity::new("product");

        MappingEngine::new().map(&feed(), &item, &[rule], &mut entity);

        assert_eq!(entity.fields["tags"].len(), 2);
        assert_eq!(column(&entity, "tags", 1, "value").as_deref(), Some("kitchen"));
        assert_eq!(column(&entity, "tags", 1, "weight").as_deref(), Some("2"));
    }

    #[test]
    fn test_rules_with_same_target_append() {
        let item = Item::new().with("a", "first").with("b", "second");
        let mut entity = TargetEntity::new("product");

        MappingEngine::new().map(
            &feed(),
            &item,
            &[MappingRule::simple("labels", "a"), MappingRule::simple("labels", "b")],
            &mut entity,
        );

        assert_eq!(column(&entity, "labels", 0, "value").as_deref(), Some("first"));
        assert_eq!(column(&entity, "labels", 1, "value").as_deref(), Some("second"));
    }

    #[test]
    fn test_mapped_targets_are_cleared_first() {
        let mut entity = TargetEntity::new("product");
        entity.set_target(
            "title",
            vec![FieldDelta::from([("value".to_string(), "Old".to_string())])],
        );
        entity.set_target(
            "stock",
            vec![FieldDelta::from([("value".to_string(), "5".to_string())])],
        );

        // Item lacks the title now: the old title goes, unmapped targets stay
        MappingEngine::new().map(
            &feed(),
            &Item::new(),
            &[MappingRule::simple("title", "name")],
            &mut entity,
        );

        assert!(entity.value("title").is_none());
        assert_eq!(entity.value("stock"), Some("5"));
    }

    #[test]
    fn test_builtin_sources() {
        let engine = MappingEngine::new();
        let item = Item::new().with("blank", "shadowed");

        assert_eq!(engine.source_values(&feed(), &item, "parent:id"), vec!["3"]);
        assert_eq!(
            engine.source_values(&feed(), &item, "parent:source"),
            vec!["/data/products.csv"]
        );
        assert_eq!(engine.source_values(&feed(), &item, "blank"), vec![""]);
        assert!(engine.source_values(&feed(), &item, "missing").is_empty());
    }

    #[test]
    fn test_registered_callback() {
        struct Upper;
        impl SourceCallback for Upper {
            fn applies_to(&self, source: &str) -> bool {
                source.starts_with("upper:")
            }
            fn values(&self, _feed: &Feed, item: &Item, source: &str) -> Vec<String> {
                let key = source.trim_start_matches("upper:");
                item.get(key)
                    .map(|v| v.values().into_iter().map(|s| s.to_uppercase()).collect())
                    .unwrap_or_default()
            }
        }

        let mut engine = MappingEngine::new();
        engine.register(Box::new(Upper));
        let item = Item::new().with("name", "kettle");

        assert_eq!(engine.source_values(&feed(), &item, "upper:name"), vec!["KETTLE"]);
    }
}
