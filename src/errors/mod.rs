use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Pipeline control
    #[error("Feed {0} is locked by another run")]
    Locked(i64),

    #[error("Lock on feed {0} expired before the run finished")]
    LeaseExpired(i64),

    #[error("Nothing new to import: {0}")]
    EmptyFeed(String),

    // Per-item errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    // Feed / importer errors
    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Feed already exists: {0}")]
    FeedAlreadyExists(String),

    #[error("Importer not found: {0}")]
    ImporterNotFound(String),

    #[error("Unsupported fetcher: {0}")]
    UnsupportedFetcher(String),

    #[error("Unsupported parser: {0}")]
    UnsupportedParser(String),

    #[error("Unsupported entity type: {0}")]
    UnsupportedEntityType(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    #[error("OPML parsing failed: {0}")]
    OpmlParse(String),

    #[error("Sitemap parsing failed: {0}")]
    SitemapParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<quick_xml::DeError> for ImportError {
    fn from(err: quick_xml::DeError) -> Self {
        ImportError::SitemapParse(err.to_string())
    }
}

impl ImportError {
    /// Errors scoped to a single item; the batch keeps going after these.
    pub fn is_item_level(&self) -> bool {
        matches!(self, ImportError::Validation(_) | ImportError::AccessDenied(_))
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
