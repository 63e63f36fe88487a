use serde::Deserialize;

use crate::domain::{Feed, FetchResult, Item, ParseResult, ParserConfig, ParserKind, StageState};
use crate::errors::{ImportError, ImportResult};
use crate::sources::next_batch;
use crate::sources::traits::Parser;

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<SitemapUrl>,
}

#[derive(Debug, Deserialize)]
struct SitemapUrl {
    loc: String,
    lastmod: Option<String>,
    changefreq: Option<String>,
    priority: Option<String>,
}

/// XML sitemaps (`<urlset>`). Each `<url>` becomes an item whose `url` and
/// `guid` are its `loc`.
pub struct SitemapParser;

impl SitemapParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SitemapParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for SitemapParser {
    fn kind(&self) -> ParserKind {
        ParserKind::Sitemap
    }

    fn parse(
        &self,
        _feed: &Feed,
        fetched: &FetchResult,
        _config: &ParserConfig,
        state: &mut StageState,
        limit: usize,
    ) -> ImportResult<ParseResult> {
        let bytes = fetched.read_all()?;
        let content =
            std::str::from_utf8(&bytes).map_err(|e| ImportError::SitemapParse(e.to_string()))?;
        let set: UrlSet = quick_xml::de::from_str(content)?;

        let items = set
            .urls
            .into_iter()
            .map(|entry| {
                let loc = entry.loc.trim().to_string();
                let mut item = Item::new().with("url", loc.as_str()).with("guid", loc);
                if let Some(lastmod) = entry.lastmod {
                    item.set("lastmod", lastmod);
                }
                if let Some(changefreq) = entry.changefreq {
                    item.set("changefreq", changefreq);
                }
                if let Some(priority) = entry.priority {
                    item.set("priority", priority);
                }
                item
            })
            .collect();

        Ok(ParseResult::new(next_batch(items, state, limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2024-01-15</lastmod>
    <changefreq>daily</changefreq>
    <priority>1.0</priority>
  </url>
  <url>
    <loc>https://example.com/about</loc>
  </url>
</urlset>"#;

    fn parse(content: &str) -> ImportResult<ParseResult> {
        let feed = Feed::new("https://example.com/sitemap.xml".to_string(), "site".to_string());
        SitemapParser::new().parse(
            &feed,
            &FetchResult::raw(content.as_bytes().to_vec()),
            &ParserConfig::new(ParserKind::Sitemap),
            &mut StageState::default(),
            0,
        )
    }

    #[test]
    fn test_urls_become_items() {
        let result = parse(SITEMAP).unwrap();

        assert_eq!(result.len(), 2);
        let home = &result.items[0];
        assert_eq!(home.url(), Some("https://example.com/"));
        assert_eq!(home.guid(), Some("https://example.com/"));
        assert_eq!(home.get("changefreq").unwrap().first(), Some("daily"));
        assert!(result.items[1].get("lastmod").is_none());
    }

    #[test]
    fn test_empty_urlset() {
        let result = parse(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_url_without_loc_is_error() {
        let result = parse("<urlset><url><lastmod>2024-01-15</lastmod></url></urlset>");
        assert!(matches!(result, Err(ImportError::SitemapParse(_))));
    }
}
