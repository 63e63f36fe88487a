use crate::domain::{
    Feed, FetchResult, FetcherKind, ParseResult, ParserConfig, ParserKind, StageState,
};
use crate::errors::ImportResult;
use crate::sources::FetchCache;

pub trait Fetcher: Send + Sync {
    /// Identifies this fetcher in importer configurations
    fn kind(&self) -> FetcherKind;

    /// Check if this fetcher can read from the given feed source
    fn can_handle(&self, source: &str) -> bool;

    /// Retrieve the feed's content. Fetchers that need several calls to
    /// get through a source (one file per call, say) record their progress
    /// in `state`. Returns `ImportError::EmptyFeed` when there is nothing new.
    fn fetch(
        &self,
        feed: &Feed,
        state: &mut StageState,
        cache: &mut FetchCache,
    ) -> ImportResult<FetchResult>;

    /// Remove whatever this fetcher keeps for the feed.
    fn clear(&self, _feed: &Feed, _state: &mut StageState) -> ImportResult<()> {
        Ok(())
    }
}

pub trait Parser: Send + Sync {
    /// Identifies this parser in importer configurations
    fn kind(&self) -> ParserKind;

    /// Turn fetched content into items. Parsers that batch keep their resume
    /// cursor in `state.pointer` and return at most `limit` items (0 = all).
    fn parse(
        &self,
        feed: &Feed,
        fetched: &FetchResult,
        config: &ParserConfig,
        state: &mut StageState,
        limit: usize,
    ) -> ImportResult<ParseResult>;

    /// Remove whatever this parser keeps for the feed.
    fn clear(&self, _feed: &Feed, _state: &mut StageState) -> ImportResult<()> {
        Ok(())
    }
}
