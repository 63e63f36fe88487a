use feed_rs::parser;

use crate::domain::{
    Feed, FeedInfo, FetchResult, Item, ParseResult, ParserConfig, ParserKind, StageState,
};
use crate::errors::{ImportError, ImportResult};
use crate::sources::next_batch;
use crate::sources::traits::Parser;

/// RSS, Atom and JSON Feed documents through feed-rs.
///
/// Item keys: `title`, `description`, `content`, `url`, `guid`, `timestamp`
/// (unix seconds), `author_name` and `tags` (a list).
pub struct SyndicationParser;

impl SyndicationParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_bytes(bytes: &[u8]) -> ImportResult<feed_rs::model::Feed> {
        parser::parse(bytes).map_err(|e| ImportError::FeedParse(e.to_string()))
    }

    fn item_from_entry(entry: feed_rs::model::Entry) -> Item {
        let mut item = Item::new().with("guid", entry.id);

        if let Some(title) = entry.title {
            item.set("title", title.content);
        }
        if let Some(summary) = entry.summary {
            item.set("description", summary.content);
        }
        if let Some(body) = entry.content.and_then(|c| c.body) {
            item.set("content", body);
        }
        if let Some(link) = entry.links.into_iter().next() {
            item.set("url", link.href);
        }
        if let Some(at) = entry.published.or(entry.updated) {
            item.set("timestamp", at.timestamp().to_string());
        }
        if let Some(author) = entry.authors.into_iter().next() {
            item.set("author_name", author.name);
        }

        let tags: Vec<String> = entry.categories.into_iter().map(|c| c.term).collect();
        if !tags.is_empty() {
            item.set("tags", tags);
        }

        item
    }
}

impl Default for SyndicationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for SyndicationParser {
    fn kind(&self) -> ParserKind {
        ParserKind::Syndication
    }

    fn parse(
        &self,
        _feed: &Feed,
        fetched: &FetchResult,
        _config: &ParserConfig,
        state: &mut StageState,
        limit: usize,
    ) -> ImportResult<ParseResult> {
        let parsed = Self::parse_bytes(&fetched.read_all()?)?;

        let info = FeedInfo {
            title: parsed.title.map(|t| t.content),
            description: parsed.description.map(|d| d.content),
            link: parsed.links.into_iter().next().map(|l| l.href),
        };

        let items = parsed
            .entries
            .into_iter()
            .map(Self::item_from_entry)
            .collect();

        Ok(ParseResult::new(next_batch(items, state, limit)).with_info(info))
    }
}
