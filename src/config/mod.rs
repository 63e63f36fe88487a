use std::time::Duration;

use crate::errors::{ImportError, ImportResult};

/// Rows/items handled per stage invocation when nothing else is configured.
pub const DEFAULT_IMPORT_LIMIT: usize = 50;

/// Lease on a feed lock; a holder that crashed loses the lock after this.
pub const DEFAULT_LOCK_TTL_SECS: u64 = 60;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub import_limit: usize,
    pub lock_ttl: Duration,
    pub http_timeout: Duration,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "./feedpipe.db".to_string(),
            import_limit: DEFAULT_IMPORT_LIMIT,
            lock_ttl: Duration::from_secs(DEFAULT_LOCK_TTL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> ImportResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        // Default db_path is relative to executable directory
        let db_path = std::env::var("FEEDPIPE_DB_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("feedpipe.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./feedpipe.db".to_string())
        });

        let import_limit = parse_var("FEEDPIPE_IMPORT_LIMIT", DEFAULT_IMPORT_LIMIT)?;
        let lock_ttl = parse_var("FEEDPIPE_LOCK_TTL", DEFAULT_LOCK_TTL_SECS)?;
        let http_timeout = parse_var("FEEDPIPE_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let log_level = std::env::var("FEEDPIPE_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            db_path,
            import_limit,
            lock_ttl: Duration::from_secs(lock_ttl),
            http_timeout: Duration::from_secs(http_timeout),
            log_level,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> ImportResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ImportError::Config(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}
