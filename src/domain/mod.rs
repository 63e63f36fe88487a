pub mod entity;
pub mod feed;
pub mod importer;
pub mod item;
pub mod item_info;
pub mod report;
pub mod stage;

pub use entity::{FieldDelta, TargetEntity, GUID_TARGET, URL_TARGET};
pub use feed::Feed;
pub use importer::{
    ColumnBinding, FetcherKind, ImporterConfig, MappingRule, ParserConfig, ParserKind,
    ProcessorConfig,
};
pub use item::{FeedInfo, FetchResult, FieldValue, Item, ParseResult};
pub use item_info::ItemInfo;
pub use report::BatchReport;
pub use stage::{compose_progress, Stage, StageState, ALMOST_COMPLETE, COMPLETE};
