//! Error taxonomy for backend calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP status. Carries the status code and reason phrase
    /// so views can show "502 Bad Gateway" style messages.
    #[error("backend returned {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),

    /// Local filesystem failure while saving a downloaded body.
    #[error("failed to save download: {0}")]
    Save(#[from] std::io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let e = ApiError::Status {
            status: 503,
            reason: "Service Unavailable".into(),
        };
        assert_eq!(e.to_string(), "backend returned 503: Service Unavailable");
    }
}
