use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::domain::{Feed, FetchResult, FetcherKind, StageState};
use crate::errors::{ImportError, ImportResult};
use crate::sources::traits::Fetcher;
use crate::sources::FetchCache;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Http
    }

    fn can_handle(&self, source: &str) -> bool {
        Url::parse(source)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    fn fetch(
        &self,
        feed: &Feed,
        _state: &mut StageState,
        cache: &mut FetchCache,
    ) -> ImportResult<FetchResult> {
        if let Some(bytes) = cache.get(&feed.source) {
            debug!(source = %feed.source, "Serving download from fetch cache");
            return Ok(FetchResult::raw(bytes.to_vec()));
        }

        let response = self.client.get(&feed.source).send()?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Err(ImportError::EmptyFeed(format!("{} not modified", feed.source)));
        }

        let bytes = response.error_for_status()?.bytes()?.to_vec();
        if bytes.is_empty() {
            return Err(ImportError::EmptyFeed(format!(
                "{} returned no content",
                feed.source
            )));
        }

        cache.insert(feed.source.clone(), bytes.clone());
        Ok(FetchResult::raw(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_can_handle_http_urls_only() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1));
        assert!(fetcher.can_handle("https://example.com/feed.xml"));
        assert!(fetcher.can_handle("http://example.com/sitemap.xml"));
        assert!(!fetcher.can_handle("ftp://example.com/file.csv"));
        assert!(!fetcher.can_handle("/data/products.csv"));
    }

    #[test]
    fn test_cached_download_skips_network() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1));
        let feed = Feed::new("https://feeds.invalid/rss".to_string(), "rss".to_string());
        let mut cache = FetchCache::new();
        cache.insert("https://feeds.invalid/rss", b"<rss/>".to_vec());

        let result = fetcher
            .fetch(&feed, &mut StageState::default(), &mut cache)
            .unwrap();
        assert_eq!(result, FetchResult::raw(b"<rss/>".to_vec()));
    }
}
