//! Gateway failure taxonomy.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Vendor answered 503. The only kind worth retrying.
    #[error("vendor unavailable (503): {body}")]
    Unavailable { body: String },

    #[error("vendor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected vendor response: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    MissingApiKey(&'static str),
}

impl GatewayError {
    /// Classify a non-2xx vendor response.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::SERVICE_UNAVAILABLE {
            Self::Unavailable { body }
        } else {
            Self::Status {
                status: status.as_u16(),
                body,
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// HTTP status to report to our own callers.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unavailable { .. } => 503,
            Self::Status { status, .. } => *status,
            Self::Transport(_) | Self::Decode(_) | Self::MissingApiKey(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_503_is_transient() {
        let unavailable = GatewayError::from_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into());
        assert!(unavailable.is_transient());
        assert_eq!(unavailable.http_status(), 503);

        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::BAD_GATEWAY, StatusCode::BAD_REQUEST] {
            let err = GatewayError::from_status(status, String::new());
            assert!(!err.is_transient(), "{status} should not be retried");
            assert_eq!(err.http_status(), status.as_u16());
        }

        assert!(!GatewayError::MissingApiKey("GEMINI_API_KEY").is_transient());
        assert!(!GatewayError::Decode("bad json".into()).is_transient());
    }
}
