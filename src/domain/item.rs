use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl FieldValue {
    /// All values, a scalar being a list of one.
    pub fn values(&self) -> Vec<String> {
        match self {
            FieldValue::Scalar(v) => vec![v.clone()],
            FieldValue::List(vs) => vs.clone(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(v) => Some(v.as_str()),
            FieldValue::List(vs) => vs.first().map(|v| v.as_str()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

/// One parsed record. Keys are source names (CSV header, `title`, `guid`...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    fields: BTreeMap<String, FieldValue>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn guid(&self) -> Option<&str> {
        self.get("guid").and_then(|v| v.first())
    }

    pub fn url(&self) -> Option<&str> {
        self.get("url").and_then(|v| v.first())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// What a fetcher hands to the parser: a local file or bytes in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FetchResult {
    File { path: PathBuf },
    Raw { bytes: Vec<u8> },
}

impl FetchResult {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        FetchResult::File { path: path.into() }
    }

    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        FetchResult::Raw { bytes: bytes.into() }
    }

    /// Whole content, read from disk for file results.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        match self {
            FetchResult::File { path } => std::fs::read(path),
            FetchResult::Raw { bytes } => Ok(bytes.clone()),
        }
    }

    pub fn len(&self) -> io::Result<u64> {
        match self {
            FetchResult::File { path } => Ok(File::open(path)?.metadata()?.len()),
            FetchResult::Raw { bytes } => Ok(bytes.len() as u64),
        }
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

/// Items of one parse batch, in document order.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub items: VecDeque<Item>,
    pub info: FeedInfo,
}

impl ParseResult {
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().collect(),
            info: FeedInfo::default(),
        }
    }

    pub fn with_info(mut self, info: FeedInfo) -> Self {
        self.info = info;
        self
    }

    pub fn shift_item(&mut self) -> Option<Item> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
