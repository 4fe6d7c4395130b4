//! Error types for request facade operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::envelope::GENERIC_FAILURE_MESSAGE;
use crate::storage::StorageError;

/// Primary error type for the request facade.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP call itself failed (connect, timeout, invalid URL).
    #[error("request to {url} failed")]
    Transport {
        /// Absolute URL of the call.
        url: String,
        /// Source transport error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success HTTP status.
    #[error("request to {url} returned status {status}")]
    Status {
        /// Absolute URL of the call.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the body when available.
        message: Option<String>,
    },
    /// The response body was not valid JSON.
    #[error("response from {url} was not valid JSON")]
    Decode {
        /// Absolute URL of the call.
        url: String,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// The backend refused the request (`code != 200` or `success == false`).
    #[error("backend rejected the request: {message}")]
    Business {
        /// Backend status code when present.
        code: Option<i64>,
        /// Backend or fallback message.
        message: String,
    },
    /// The upload endpoint rejected the file or answered with garbage.
    #[error("upload failed: {message}")]
    Upload {
        /// Server or fallback message.
        message: String,
    },
    /// The login exchange failed.
    #[error("login failed: {message}")]
    Login {
        /// Server or fallback message.
        message: String,
    },
    /// A local file could not be read.
    #[error("failed to read {path}")]
    File {
        /// File path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Session storage could not be written.
    #[error("session storage failed")]
    Storage {
        /// Source storage error.
        #[from]
        source: StorageError,
    },
}

/// Convenience alias for facade results.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Message suitable for a user-facing toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Business { message, .. }
            | Self::Upload { message }
            | Self::Login { message } => message.clone(),
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_backend_text() {
        let business = ClientError::Business {
            code: Some(500),
            message: "库存不足".to_string(),
        };
        assert_eq!(business.user_message(), "库存不足");

        let status = ClientError::Status {
            url: "http://x/api".to_string(),
            status: 502,
            message: None,
        };
        assert_eq!(
            status.user_message(),
            "request to http://x/api returned status 502"
        );
    }

    #[test]
    fn user_message_falls_back_when_blank() {
        let upload = ClientError::Upload {
            message: "  ".to_string(),
        };
        assert_eq!(upload.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn storage_errors_convert() {
        let err: ClientError = StorageError::Backend {
            key: "token".to_string(),
            detail: "quota".to_string(),
        }
        .into();
        assert!(matches!(err, ClientError::Storage { .. }));
    }
}
