pub mod cache;
pub mod csv;
pub mod directory;
pub mod file;
pub mod http;
pub mod opml;
pub mod registry;
pub mod sitemap;
pub mod syndication;
pub mod traits;

pub use cache::FetchCache;
pub use registry::SourceRegistry;
pub use traits::{Fetcher, Parser};

use crate::domain::{Item, StageState};

/// Next `limit` items (0 = all) of a document that is parsed whole on every
/// call. The parse stage's pointer is the index of the first item not yet
/// handed out.
pub(crate) fn next_batch(items: Vec<Item>, state: &mut StageState, limit: usize) -> Vec<Item> {
    let total = items.len() as u64;
    let offset = state.pointer_u64().unwrap_or(0).min(total);
    let take = if limit == 0 { usize::MAX } else { limit };

    let batch: Vec<Item> = items
        .into_iter()
        .skip(offset as usize)
        .take(take)
        .collect();

    let next = offset + batch.len() as u64;
    state.pointer = Some(next.to_string());
    state.progress(total, next);
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new().with("n", i.to_string())).collect()
    }

    #[test]
    fn test_next_batch_walks_document() {
        let mut state = StageState::default();

        let first = next_batch(items(5), &mut state, 2);
        assert_eq!(first.len(), 2);
        assert_eq!(state.fraction, 0.4);

        let second = next_batch(items(5), &mut state, 2);
        assert_eq!(second[0].get("n").unwrap().first(), Some("2"));

        let last = next_batch(items(5), &mut state, 2);
        assert_eq!(last.len(), 1);
        assert!(state.is_complete());
    }

    #[test]
    fn test_next_batch_without_limit() {
        let mut state = StageState::default();
        assert_eq!(next_batch(items(3), &mut state, 0).len(), 3);
        assert!(state.is_complete());
    }

    #[test]
    fn test_next_batch_empty_document_is_complete() {
        let mut state = StageState::default();
        assert!(next_batch(Vec::new(), &mut state, 10).is_empty());
        assert!(state.is_complete());
    }
}
