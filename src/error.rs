//! Error types for the Prospector library.
//!
//! All failures are represented by the [`SearchError`] enum. The taxonomy is
//! deliberate: compilation-time issues (query syntax, unknown filter ids) are
//! absorbed locally with a safe fallback and never reach the caller, while
//! execution-time backend issues are surfaced distinctly from input issues so
//! callers can tell "the backend is down" apart from "fix your request".
//!
//! # Examples
//!
//! ```
//! use prospector::error::{Result, SearchError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SearchError::invalid_request("missing `type` parameter"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```

use thiserror::Error;

/// The main error type for Prospector operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed boolean query string. Recovered locally by falling back to
    /// a bare-term search; never surfaced to the end user.
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// Structurally invalid input (missing required `type`, filter values of
    /// the wrong shape). Rejected before any engine call is made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backend rejected the aggregation portion of a query. Triggers the
    /// one-shot degraded retry without aggregations.
    #[error("backend aggregation error: {0}")]
    BackendAggregation(String),

    /// The search engine is unreachable or returned a server error. A
    /// distinct, retryable condition; never conflated with an empty result
    /// set.
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The embedding collaborator failed. Absorbed by degrading to
    /// lexical-only search.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error from collaborators.
    #[error("error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Create a new query syntax error.
    pub fn syntax<S: Into<String>>(msg: S) -> Self {
        SearchError::QuerySyntax(msg.into())
    }

    /// Create a new invalid request error.
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        SearchError::InvalidRequest(msg.into())
    }

    /// Create a new backend aggregation error.
    pub fn aggregation<S: Into<String>>(msg: S) -> Self {
        SearchError::BackendAggregation(msg.into())
    }

    /// Create a new backend unavailable error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        SearchError::BackendUnavailable(msg.into())
    }

    /// Create a new embedding error.
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        SearchError::Embedding(msg.into())
    }

    /// True when this error should trigger the degraded (aggregation-free)
    /// retry.
    pub fn is_aggregation_error(&self) -> bool {
        matches!(self, SearchError::BackendAggregation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SearchError::syntax("unbalanced quote");
        assert_eq!(error.to_string(), "query syntax error: unbalanced quote");

        let error = SearchError::invalid_request("missing `type`");
        assert_eq!(error.to_string(), "invalid request: missing `type`");

        let error = SearchError::backend("connection refused");
        assert_eq!(
            error.to_string(),
            "search backend unavailable: connection refused"
        );
    }

    #[test]
    fn test_aggregation_error_classification() {
        assert!(SearchError::aggregation("fielddata disabled").is_aggregation_error());
        assert!(!SearchError::backend("timeout").is_aggregation_error());
        assert!(!SearchError::syntax("bad").is_aggregation_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = SearchError::from(json_error);

        match error {
            SearchError::Json(_) => {}
            _ => panic!("Expected JSON error variant"),
        }
    }
}
