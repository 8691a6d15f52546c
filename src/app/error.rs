use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListenError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed page data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Download failed: {0}")]
    Acquisition(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used by callers that map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    GatewayFailure,
    StorageFailure,
}

impl ErrorKind {
    /// True for the kinds caused by the request rather than the system.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound | ErrorKind::AlreadyExists | ErrorKind::InvalidInput
        )
    }
}

impl ListenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ListenError::Database(_) | ListenError::Io(_) => ErrorKind::StorageFailure,
            ListenError::Http(_)
            | ListenError::Json(_)
            | ListenError::Discovery(_)
            | ListenError::Acquisition(_) => ErrorKind::GatewayFailure,
            ListenError::NotFound(_) => ErrorKind::NotFound,
            ListenError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ListenError::InvalidInput(_)
            | ListenError::InvalidUrl(_)
            | ListenError::Config(_) => ErrorKind::InvalidInput,
        }
    }
}

pub type Result<T> = std::result::Result<T, ListenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_server_side() {
        let err = ListenError::Database(rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(!err.kind().is_client_error());
    }

    #[test]
    fn test_gateway_errors_are_server_side() {
        let err = ListenError::Acquisition("exit status 1".into());
        assert_eq!(err.kind(), ErrorKind::GatewayFailure);
        assert!(!err.kind().is_client_error());
    }

    #[test]
    fn test_request_errors_are_client_side() {
        assert!(ListenError::NotFound("user u1".into()).kind().is_client_error());
        assert!(ListenError::AlreadyExists("subscription".into())
            .kind()
            .is_client_error());
        assert!(ListenError::InvalidInput("page".into()).kind().is_client_error());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ListenError::NotFound("channel c1".into()).to_string(),
            "channel c1 not found"
        );
        assert_eq!(
            ListenError::AlreadyExists("subscription u1 -> c1".into()).to_string(),
            "subscription u1 -> c1 already exists"
        );
    }
}
