use thiserror::Error;

/// Main error type for query evaluation and scoring
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Too many clauses: {count} exceeds the limit of {limit}")]
    TooManyClauses { count: usize, limit: usize },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Query did not reach a fixed point after {0} rewrite passes")]
    RewriteLimitExceeded(usize),

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        SearchError::UnsupportedOperation(what.into())
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SearchError::InvalidArgument(what.into())
    }

    pub(crate) fn illegal_state(what: impl Into<String>) -> Self {
        SearchError::IllegalState(what.into())
    }

    /// Check if this error is a contract violation by the caller rather than
    /// a failure of the index collaborator
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SearchError::UnsupportedOperation(_)
                | SearchError::InvalidArgument(_)
                | SearchError::TooManyClauses { .. }
                | SearchError::IllegalState(_)
                | SearchError::RewriteLimitExceeded(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::TooManyClauses {
            count: 33,
            limit: 32,
        };
        assert_eq!(
            err.to_string(),
            "Too many clauses: 33 exceeds the limit of 32"
        );
    }

    #[test]
    fn test_usage_errors() {
        assert!(SearchError::unsupported("explain").is_usage_error());
        assert!(SearchError::invalid("field").is_usage_error());
        assert!(SearchError::RewriteLimitExceeded(64).is_usage_error());
        assert!(!SearchError::Index("corrupt postings".to_string()).is_usage_error());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(!SearchError::from(io).is_usage_error());
    }
}
