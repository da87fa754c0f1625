//! Error types for the blob cache

use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    /// No entry is stored under the key
    NotFound(String),
    /// The key could escape the cache directory or collides with temp files
    InvalidKey(String),
    Io(Box<std::io::Error>),
    /// The cache directory itself could not be listed
    Enumeration(String),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound(key) => write!(f, "Cache entry not found: {}", key),
            CacheError::InvalidKey(key) => write!(f, "Invalid cache key: {:?}", key),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Enumeration(msg) => write!(f, "Cache enumeration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
