use serde::{Deserialize, Serialize};

/// Side-index row linking an imported entity back to the feed item it came
/// from. The hash is what change detection compares on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub feed_id: i64,
    pub entity_id: i64,
    pub entity_type: String,
    pub hash: String,
    pub url: Option<String>,
    pub guid: Option<String>,
    pub imported_at: i64,
}
