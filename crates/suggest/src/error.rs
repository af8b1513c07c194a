use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failure of one gateway attempt. The retrying gateway never lets these escape
/// [`crate::SuggestionGateway::expand`]; they end up as an empty suggestion list.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Attempt timed out after {0} ms")]
    Timeout(u128),

    #[error("Suggestion service is not configured")]
    NotConfigured,

    #[error("All {0} attempts failed")]
    Exhausted(u32),
}

impl GatewayError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
