use crate::storage::StorageError;

/// Error returned by [`super::HttpClient`] and the API wrappers built on it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API rejected the bearer token or the credentials (HTTP 401).
    #[error("authentication rejected{}", detail_suffix(.detail.as_deref()))]
    Unauthorized { detail: Option<String> },

    /// Any other non-success HTTP status.
    #[error("request failed with status {status}{}", detail_suffix(.detail.as_deref()))]
    Status { status: u16, detail: Option<String> },

    /// Transport-level failure, timeouts included.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected schema.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

fn detail_suffix(detail: Option<&str>) -> String {
    detail.map(|d| format!(": {d}")).unwrap_or_default()
}
