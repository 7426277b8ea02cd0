use thiserror::Error;

#[derive(Error, Debug)]
pub enum VlmExtractError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF extraction failed: {0}")]
    PdfExtraction(String),

    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Model not available: {0}")]
    UnsupportedModel(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),

    #[error("Document conversion failed: {0}")]
    Render(String),

    #[error("File too large: {path} is {size_mb} MB, limit is {limit_mb} MB")]
    FileTooLarge {
        path: String,
        size_mb: u64,
        limit_mb: u64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VlmExtractError {
    /// Stable kind label for callers that match on error class rather
    /// than message text.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VlmExtractError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            VlmExtractError::PdfExtraction(_) => ErrorKind::PdfExtraction,
            VlmExtractError::Transient(_) => ErrorKind::Transient,
            VlmExtractError::Auth(_) => ErrorKind::Auth,
            VlmExtractError::UnsupportedModel(_) => ErrorKind::UnsupportedModel,
            VlmExtractError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            VlmExtractError::Timeout(_) => ErrorKind::Timeout,
            VlmExtractError::Render(_) => ErrorKind::Render,
            VlmExtractError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            VlmExtractError::Config(_) => ErrorKind::Config,
            VlmExtractError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the pipeline may re-attempt the provider call that produced
    /// this error. MalformedResponse is retryable but capped separately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VlmExtractError::Transient(_) | VlmExtractError::MalformedResponse(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    PdfExtraction,
    Transient,
    Auth,
    UnsupportedModel,
    MalformedResponse,
    Timeout,
    Render,
    FileTooLarge,
    Config,
    Io,
}

pub type Result<T> = std::result::Result<T, VlmExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            VlmExtractError::Transient("502".into()).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            VlmExtractError::Auth("bad key".into()).kind(),
            ErrorKind::Auth
        );
        assert_eq!(VlmExtractError::Timeout(30).kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(VlmExtractError::Transient("503".into()).is_retryable());
        assert!(VlmExtractError::MalformedResponse("empty".into()).is_retryable());
        assert!(!VlmExtractError::Auth("401".into()).is_retryable());
        assert!(!VlmExtractError::UnsupportedModel("llava".into()).is_retryable());
        assert!(!VlmExtractError::UnsupportedFormat("xyz".into()).is_retryable());
    }

    #[test]
    fn test_file_too_large_message() {
        let err = VlmExtractError::FileTooLarge {
            path: "scan.png".into(),
            size_mb: 120,
            limit_mb: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("scan.png"));
        assert!(msg.contains("120"));
        assert!(msg.contains("50"));
    }
}
