use std::time::Duration;

use crate::domain::{FetcherKind, ParserKind};
use crate::errors::{ImportError, ImportResult};
use crate::sources::traits::{Fetcher, Parser};
use crate::sources::{
    csv::CsvParser, directory::DirectoryFetcher, file::FileFetcher, http::HttpFetcher,
    opml::OpmlParser, sitemap::SitemapParser, syndication::SyndicationParser,
};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SourceRegistry {
    fetchers: Vec<Box<dyn Fetcher>>,
    parsers: Vec<Box<dyn Parser>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::with_http_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_http_timeout(timeout: Duration) -> Self {
        let mut registry = Self::empty();

        // Order matters for source detection: most specific first
        registry.register_fetcher(Box::new(HttpFetcher::new(timeout)));
        registry.register_fetcher(Box::new(DirectoryFetcher::new()));
        registry.register_fetcher(Box::new(FileFetcher::new())); // Fallback

        registry.register_parser(Box::new(CsvParser::new()));
        registry.register_parser(Box::new(SyndicationParser::new()));
        registry.register_parser(Box::new(OpmlParser::new()));
        registry.register_parser(Box::new(SitemapParser::new()));

        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            fetchers: Vec::new(),
            parsers: Vec::new(),
        }
    }

    /// Register a fetcher; it replaces an earlier one of the same kind.
    pub fn register_fetcher(&mut self, fetcher: Box<dyn Fetcher>) {
        self.fetchers.retain(|f| f.kind() != fetcher.kind());
        self.fetchers.push(fetcher);
    }

    /// Register a parser; it replaces an earlier one of the same kind.
    pub fn register_parser(&mut self, parser: Box<dyn Parser>) {
        self.parsers.retain(|p| p.kind() != parser.kind());
        self.parsers.push(parser);
    }

    pub fn fetcher(&self, kind: FetcherKind) -> ImportResult<&dyn Fetcher> {
        self.fetchers
            .iter()
            .find(|f| f.kind() == kind)
            .map(|f| f.as_ref())
            .ok_or_else(|| ImportError::UnsupportedFetcher(kind.to_string()))
    }

    pub fn parser(&self, kind: ParserKind) -> ImportResult<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
            .ok_or_else(|| ImportError::UnsupportedParser(kind.to_string()))
    }

    /// First fetcher able to read `source`
    pub fn detect_fetcher(&self, source: &str) -> Option<&dyn Fetcher> {
        self.fetchers
            .iter()
            .find(|f| f.can_handle(source))
            .map(|f| f.as_ref())
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
