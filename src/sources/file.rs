use std::path::Path;

use crate::domain::{Feed, FetchResult, FetcherKind, StageState};
use crate::errors::{ImportError, ImportResult};
use crate::sources::traits::Fetcher;
use crate::sources::FetchCache;

/// Reads a single local file. The parser opens it lazily, so large CSV
/// files are never loaded whole.
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for FileFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::File
    }

    fn can_handle(&self, _source: &str) -> bool {
        // FileFetcher is the fallback, any other source is taken as a path
        true
    }

    fn fetch(
        &self,
        feed: &Feed,
        _state: &mut StageState,
        _cache: &mut FetchCache,
    ) -> ImportResult<FetchResult> {
        let path = Path::new(&feed.source);
        let metadata = std::fs::metadata(path)?;

        if metadata.is_dir() {
            return Err(ImportError::InvalidInput(format!(
                "{} is a directory, use the directory fetcher",
                feed.source
            )));
        }
        if metadata.len() == 0 {
            return Err(ImportError::EmptyFeed(format!("{} is empty", feed.source)));
        }

        Ok(FetchResult::file(path))
    }
}
