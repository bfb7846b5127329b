use super::transform::TransformError;
use thiserror::Error;

/// Failure of a single fetch-and-transform call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure or timeout.
    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The API answered with a throttling note or an error message instead
    /// of a time series.
    #[error("API returned {field:?}: {message}")]
    ApiLimit { field: String, message: String },

    #[error("response is not a JSON object: {0}")]
    Decode(String),

    #[error("invalid request URL")]
    Url(#[from] url::ParseError),

    #[error("transform failed")]
    Transform(#[from] TransformError),
}

impl FetchError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}
