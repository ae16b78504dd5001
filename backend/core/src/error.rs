use thiserror::Error;

/// Top-level error type for the staytime runtime.
///
/// Every variant is contained at the granularity of one user or one record;
/// callers log it and move on to the next unit of work.
#[derive(Debug, Error)]
pub enum StayError {
    #[error("no open session for user {user_id}")]
    SessionNotFound { user_id: String },

    #[error("directory {op} failed: {message}")]
    DirectoryIo { op: &'static str, message: String },

    #[error("messaging failed: {0}")]
    MessagingIo(String),

    #[error("malformed record {user_id}: {message}")]
    MalformedRecord { user_id: String, message: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StayError {
    pub fn directory(op: &'static str, err: impl std::fmt::Display) -> Self {
        StayError::DirectoryIo {
            op,
            message: err.to_string(),
        }
    }

    pub fn messaging(err: impl std::fmt::Display) -> Self {
        StayError::MessagingIo(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_display() {
        let err = StayError::directory("put", "disk full");
        assert_eq!(err.to_string(), "directory put failed: disk full");
    }

    #[test]
    fn test_session_not_found_display() {
        let err = StayError::SessionNotFound {
            user_id: "42".into(),
        };
        assert!(err.to_string().contains("42"));
    }
}
