use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a refresh cycle failed
#[derive(Debug, Error)]
pub enum RefreshFailure {
    /// There was no refresh token to exchange
    #[error("no refresh token available")]
    NoCredential,
    /// The refresh exchange itself failed
    #[error("refresh exchange failed")]
    Exchange(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    /// The refresh cycle was dropped before it resolved, with nobody left to finish it
    ///
    /// The session itself is untouched.
    #[error("refresh was abandoned before it completed")]
    Abandoned,
}

/// A request could not be completed because the session could not be refreshed
///
/// Every caller whose request was waiting on the same refresh cycle receives
/// the same underlying failure.
#[derive(Clone, Debug, Error)]
#[error("session expired and could not be refreshed")]
pub struct SessionExpired(#[source] pub Arc<RefreshFailure>);

impl SessionExpired {
    /// The reason the refresh cycle failed
    pub fn failure(&self) -> &RefreshFailure {
        &self.0
    }
}

/// An error returned by the [`ApiClient`][crate::ApiClient]
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request target could not be turned into a valid address
    #[error("invalid request address `{target}`")]
    InvalidUrl {
        /// The target as given by the caller
        target: String,
        /// The parse failure
        source: url::ParseError,
    },
    /// The request failed before a response was received, or a middleware rejected it
    #[error("error sending request")]
    Transport(#[from] reqwest_middleware::Error),
    /// The backend answered with a non-success status
    #[error("request failed with status {status}")]
    Status {
        /// The response status
        status: StatusCode,
        /// The response body, as text
        body: String,
    },
    /// Unable to read the response
    #[error("error reading response body")]
    BodyRead(#[source] reqwest::Error),
    /// Unable to serialize a request body or deserialize a response body
    #[error("error decoding response body")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// The status of the response that caused the error, if there was one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// The refresh failure behind this error, if the session could not be refreshed
    ///
    /// An abandoned refresh leaves the session in place and is not reported here.
    pub fn session_expired(&self) -> Option<&SessionExpired> {
        match self {
            Self::Transport(reqwest_middleware::Error::Middleware(err)) => err
                .downcast_ref::<SessionExpired>()
                .filter(|e| !matches!(e.failure(), RefreshFailure::Abandoned)),
            _ => None,
        }
    }

    /// Whether this error was caused by a failed session refresh
    pub fn is_session_expired(&self) -> bool {
        self.session_expired().is_some()
    }
}
