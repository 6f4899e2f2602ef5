use http::StatusCode;
use thiserror::Error;

/// Core error type for the chat relay.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// The upstream call never produced a response (connect/send failure).
    #[error("{target} unreachable: {message}")]
    Dispatch { target: String, message: String },

    /// The upstream answered with a non-success status. `body` is kept verbatim.
    #[error("upstream rejected request with status {status}")]
    Upstream { status: u16, body: String },

    /// Malformed or interrupted event stream after streaming began.
    #[error("stream decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// HTTP status used when this error is reported before a response is committed.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch { .. } | Self::Decode(_) => StatusCode::BAD_GATEWAY,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::MissingCredential(_) | Self::Io(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short, caller-facing label for logs and span fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::MissingCredential(_) => "missing_credential",
            Self::Dispatch { .. } => "dispatch",
            Self::Upstream { .. } => "upstream",
            Self::Decode(_) => "decode",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, RelayError>;
