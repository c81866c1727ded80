//! Remote-call error taxonomy shared by both engines.

/// Longest response body kept in an error (bytes of UTF-8, char-aligned).
const MAX_ERROR_BODY: usize = 512;

/// Transport and remote failures from the imaging API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Imaging API is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("API returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    Malformed(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl ApiError {
    /// Classify a reqwest failure the way every call site needs it.
    pub(crate) fn from_reqwest(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout_secs)
        } else if err.is_connect() {
            ApiError::Connection(base_url.to_string())
        } else if err.is_decode() {
            ApiError::Malformed(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }

    pub(crate) fn status(status: u16, body: &str) -> Self {
        ApiError::Status {
            status,
            body: truncate_body(body),
        }
    }

    /// Transport-level failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Connection(_) | ApiError::Timeout(_) | ApiError::Http(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Malformed(_) => false,
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
