use thiserror::Error;

/// Error type for identity provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IamError {
    /// Credentials rejected (401) or session lacking permission (403).
    #[error("authentication failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Provider answered with an unexpected status.
    #[error("unexpected status {status} from {operation}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// Provider could not be reached or the request did not complete.
    #[error("transport error during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// Provider response could not be decoded.
    #[error("invalid response from {operation}: {message}")]
    InvalidResponse {
        operation: &'static str,
        message: String,
    },

    /// Client misconfiguration (e.g. an unusable base URL).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IamError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            IamError::Status { status, .. } | IamError::Unauthorized { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
