use std::collections::HashMap;

/// Downloaded content shared between fetches of one caller run, keyed by
/// source. The caller owns it and decides how long it lives.
#[derive(Debug, Default)]
pub struct FetchCache {
    entries: HashMap<String, Vec<u8>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<&[u8]> {
        self.entries.get(source).map(|bytes| bytes.as_slice())
    }

    pub fn insert(&mut self, source: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(source.into(), bytes);
    }
}
