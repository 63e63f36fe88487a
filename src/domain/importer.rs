use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    File,
    Directory,
    Http,
}

impl FetcherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetcherKind::File => "file",
            FetcherKind::Directory => "directory",
            FetcherKind::Http => "http",
        }
    }
}

impl std::fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    Csv,
    Syndication,
    Opml,
    Sitemap,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Csv => "csv",
            ParserKind::Syndication => "syndication",
            ParserKind::Opml => "opml",
            ParserKind::Sitemap => "sitemap",
        }
    }
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    pub kind: ParserKind,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_true")]
    pub has_header: bool,
}

impl ParserConfig {
    pub fn new(kind: ParserKind) -> Self {
        Self {
            kind,
            delimiter: default_delimiter(),
            has_header: true,
        }
    }

    /// Delimiter bytes; `TAB` and a literal `\t` both mean a tab.
    pub fn delimiter_bytes(&self) -> Vec<u8> {
        match self.delimiter.as_str() {
            "TAB" | "\\t" => b"\t".to_vec(),
            "" => b",".to_vec(),
            other => other.as_bytes().to_vec(),
        }
    }
}

/// One target column and where its value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    #[serde(default = "default_column")]
    pub column: String,
    pub source: String,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub target: String,
    pub columns: Vec<ColumnBinding>,
}

impl MappingRule {
    /// Map `source` into the `value` column of `target`.
    pub fn simple(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            columns: vec![ColumnBinding {
                column: default_column(),
                source: source.to_string(),
                unique: false,
            }],
        }
    }

    /// Like [`MappingRule::simple`], flagged as identifying the item.
    pub fn unique(target: &str, source: &str) -> Self {
        let mut rule = Self::simple(target, source);
        rule.columns[0].unique = true;
        rule
    }

    pub fn with_column(mut self, column: &str, source: &str) -> Self {
        self.columns.push(ColumnBinding {
            column: column.to_string(),
            source: source.to_string(),
            unique: false,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub entity_type: String,
    /// Leave already imported entities alone, even when the item changed.
    #[serde(default)]
    pub skip_existing: bool,
    /// Create entities for items with no previously imported match.
    #[serde(default = "default_true")]
    pub insert_new: bool,
    /// Rewrite matched entities even when their hash is unchanged.
    #[serde(default)]
    pub force_update: bool,
    /// Seconds after import at which entities expire; `None` keeps them.
    #[serde(default)]
    pub expire_after: Option<i64>,
    #[serde(default)]
    pub mappings: Vec<MappingRule>,
}

impl ProcessorConfig {
    pub fn new(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            skip_existing: false,
            insert_new: true,
            force_update: false,
            expire_after: None,
            mappings: Vec::new(),
        }
    }
}

/// Everything that drives the import of a feed: where bytes come from, how
/// they turn into items and how items turn into entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImporterConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub fetcher: FetcherKind,
    pub parser: ParserConfig,
    pub processor: ProcessorConfig,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_column() -> String {
    "value".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_minimal_json() {
        let json = r#"{
            "id": "products",
            "fetcher": "file",
            "parser": { "kind": "csv", "delimiter": ";" },
            "processor": {
                "entity_type": "product",
                "mappings": [
                    { "target": "sku", "columns": [{ "source": "sku", "unique": true }] },
                    { "target": "title", "columns": [{ "source": "name" }] }
                ]
            }
        }"#;

        let config: ImporterConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.fetcher, FetcherKind::File);
        assert_eq!(config.parser.delimiter_bytes(), b";".to_vec());
        assert!(config.parser.has_header);
        assert!(config.processor.insert_new);
        assert!(!config.processor.skip_existing);
        assert_eq!(config.processor.mappings[0].columns[0].column, "value");
        assert!(config.processor.mappings[0].columns[0].unique);
    }

    #[test]
    fn test_tab_delimiter() {
        let mut parser = ParserConfig::new(ParserKind::Csv);
        parser.delimiter = "TAB".to_string();
        assert_eq!(parser.delimiter_bytes(), b"\t".to_vec());
    }
}
