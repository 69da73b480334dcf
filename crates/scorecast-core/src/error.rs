// Error types for upstream fetches.

use thiserror::Error;

/// A failed request to the upstream data API.
///
/// Cancellation is deliberately not represented here: a superseded fetch
/// is reported as [`crate::sync::store::FetchOutcome::Discarded`] or
/// [`crate::sync::paginate::Completion::Cancelled`], never as an error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Convert to the short string shown to the user in place of data.
    pub fn display_message(&self) -> String {
        match self {
            FetchError::Network(_) => "Unable to reach the server. Check your connection.".into(),
            FetchError::Status { status: 404, .. } => "Not found.".into(),
            FetchError::Status { status, .. } if *status >= 500 => {
                format!("Server error ({status}). Try again shortly.")
            }
            FetchError::Status { status, .. } => format!("Request failed ({status})."),
            FetchError::Decode(_) => "Received an unexpected response from the server.".into(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_has_short_message() {
        let err = FetchError::Status {
            status: 404,
            body: "{\"detail\":\"missing\"}".into(),
        };
        assert_eq!(err.display_message(), "Not found.");
    }

    #[test]
    fn server_errors_mention_status() {
        let err = FetchError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(err.display_message().contains("503"));
    }

    #[test]
    fn display_includes_body_for_logs() {
        let err = FetchError::Status {
            status: 400,
            body: "bad league".into(),
        };
        assert_eq!(err.to_string(), "API returned status 400: bad league");
        assert_eq!(err.display_message(), "Request failed (400).");
    }
}
