use opml::{Outline, OPML};

use crate::domain::{Feed, FetchResult, Item, ParseResult, ParserConfig, ParserKind, StageState};
use crate::errors::{ImportError, ImportResult};
use crate::sources::next_batch;
use crate::sources::traits::Parser;

/// Subscription lists: one item per outline that carries an `xmlUrl`.
pub struct OpmlParser;

impl OpmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Recursively collect feed outlines; nested ones get their parent's
    /// text as `category`.
    fn extract_items(outlines: &[Outline], category: Option<&str>, items: &mut Vec<Item>) {
        for outline in outlines {
            if let Some(xml_url) = outline.xml_url.as_deref().filter(|u| !u.is_empty()) {
                let title = outline.title.clone().unwrap_or_else(|| outline.text.clone());
                let mut item = Item::new()
                    .with("title", title)
                    .with("xmlurl", xml_url)
                    .with("guid", xml_url);

                let url = match outline.html_url.as_deref() {
                    Some(html_url) if !html_url.is_empty() => {
                        item.set("htmlurl", html_url);
                        html_url
                    }
                    _ => xml_url,
                };
                item.set("url", url);

                if let Some(category) = category {
                    item.set("category", category);
                }
                items.push(item);
            }

            let child_category = if outline.xml_url.is_none() {
                Some(outline.text.as_str())
            } else {
                category
            };
            Self::extract_items(&outline.outlines, child_category, items);
        }
    }
}

impl Default for OpmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for OpmlParser {
    fn kind(&self) -> ParserKind {
        ParserKind::Opml
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
            std::str::from_utf8(&bytes).map_err(|e| ImportError::OpmlParse(e.to_string()))?;
        let opml = OPML::from_str(content).map_err(|e| ImportError::OpmlParse(e.to_string()))?;

        let mut items = Vec::new();
        Self::extract_items(&opml.body.outlines, None, &mut items);

        Ok(ParseResult::new(next_batch(items, state, limit)))
    }
}
