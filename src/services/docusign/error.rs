//! Errors from DocuSign calls

use hyper::StatusCode;

/// Failure of a single DocuSign operation.
///
/// Transport and HTTP failures are carried as-is; nothing is classified per operation.
#[derive(Debug, thiserror::Error)]
pub enum DocuSignError {
    #[error("DocuSign transport error: {0}")]
    Transport(String),

    #[error("DocuSign returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid DocuSign response: {0}")]
    InvalidResponse(String),

    #[error("Credential has no DocuSign account")]
    NoAccount,
}

impl DocuSignError {
    /// Status to answer with when this error reaches an HTTP caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport(_) | Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::NoAccount => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// DocuSign answered, and refused (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (400..500).contains(status))
    }
}

impl From<reqwest::Error> for DocuSignError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
