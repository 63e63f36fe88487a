use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{Feed, FetchResult, FetcherKind, StageState};
use crate::errors::{ImportError, ImportResult};
use crate::sources::traits::Fetcher;
use crate::sources::FetchCache;

/// Hands out the files of a directory one per call, in name order.
///
/// The files still to go are kept in the fetch stage's pointer, so the
/// fetch fraction is "files handed out / files found".
pub struct DirectoryFetcher;

impl DirectoryFetcher {
    pub fn new() -> Self {
        Self
    }

    fn list_files(dir: &Path) -> ImportResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Default for DirectoryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for DirectoryFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Directory
    }

    fn can_handle(&self, source: &str) -> bool {
        Path::new(source).is_dir()
    }

    fn fetch(
        &self,
        feed: &Feed,
        state: &mut StageState,
        _cache: &mut FetchCache,
    ) -> ImportResult<FetchResult> {
        let mut remaining: Vec<PathBuf> = match state.pointer.as_deref() {
            Some(pointer) => serde_json::from_str(pointer)?,
            None => {
                let files = Self::list_files(Path::new(&feed.source))?;
                state.total = files.len() as u64;
                files
            }
        };

        if remaining.is_empty() {
            return Err(ImportError::EmptyFeed(format!(
                "no files left in {}",
                feed.source
            )));
        }

        let next = remaining.remove(0);
        debug!(file = %next.display(), left = remaining.len(), "Fetching next file");

        state.pointer = Some(serde_json::to_string(&remaining)?);
        let total = state.total;
        state.progress(total, total - remaining.len() as u64);

        Ok(FetchResult::file(next))
    }
}
