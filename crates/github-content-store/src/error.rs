//! Error types for the GitHub content store

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Http(Box<reqwest::Error>),
    /// The API answered with a non-success status
    Status { status: u16, key: String },
    /// The API answered 2xx but the body was not what we expected
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Status { status: 404, .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Http(err) => write!(f, "HTTP error: {}", err),
            StoreError::Status { status, key } => {
                write!(f, "GitHub returned status {} for {}", status, key)
            }
            StoreError::Decode(msg) => write!(f, "Unexpected GitHub response: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = StoreError::Status {
            status: 404,
            key: "cat.png".to_string(),
        };
        assert_eq!(format!("{}", err), "GitHub returned status 404 for cat.png");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_server_error_is_not_not_found() {
        let err = StoreError::Status {
            status: 502,
            key: "cat.png".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_is_debug() {
        let err = StoreError::Decode("missing content".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Decode"));
    }
}
