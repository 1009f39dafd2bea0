//! Error types for backend calls and bookmark toggles.

use thiserror::Error;

/// Failure talking to the jobs backend.
///
/// `Clone` so a failed search phase can keep the error it ended with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("network request failed: {0}")]
    Network(String),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("job {0} not found")]
    NotFound(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookmarkError {
    /// No session; nothing was sent to the server.
    #[error("sign in to bookmark jobs")]
    SignInRequired,
    /// The job was never fetched with a token, so its current flag is unknown.
    #[error("bookmark status of job {0} is not known yet, open the job first")]
    Unknown(String),
    /// A toggle for this job is still waiting on the server.
    #[error("bookmark change for job {0} is still in progress")]
    InFlight(String),
    /// The server rejected the toggle; the local flag has been reverted.
    #[error("could not update bookmark, please try again: {0}")]
    Remote(#[source] ApiError),
}
