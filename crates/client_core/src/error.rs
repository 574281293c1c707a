//! Failure taxonomy for controller operations and its normalization to the
//! single message string kept in controller state.

use shared::error::ApiError;
use thiserror::Error;

pub const REQUEST_FAILED: &str = "request failed";
pub const UNEXPECTED_ERROR: &str = "unexpected error";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// The server answered with a non-success status.
    #[error("{}", .message.as_deref().unwrap_or(REQUEST_FAILED))]
    Http { status: u16, message: Option<String> },
    /// The request never produced a response (connect, timeout, TLS).
    #[error("{0}")]
    Transport(String),
    /// A response arrived but its body could not be read or decoded.
    #[error("{0}")]
    Decode(String),
    #[error("unexpected error")]
    Unexpected,
}

impl ControllerError {
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = ApiError::from_body(body)
            .and_then(|err| err.message().map(str::to_string));
        Self::Http { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable text stored in `ControllerState::error`.
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNEXPECTED_ERROR.to_string()
        } else {
            message
        }
    }
}

fn classify_reqwest(err: &reqwest::Error) -> ControllerError {
    if let Some(status) = err.status() {
        return ControllerError::Http {
            status: status.as_u16(),
            message: None,
        };
    }
    if err.is_decode() || err.is_body() {
        ControllerError::Decode(err.to_string())
    } else {
        ControllerError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ControllerError {
    fn from(err: reqwest::Error) -> Self {
        classify_reqwest(&err)
    }
}

impl From<serde_json::Error> for ControllerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<ControllerError>() {
            return err.clone();
        }
        if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            return classify_reqwest(err);
        }
        if let Some(err) = err.downcast_ref::<serde_json::Error>() {
            return Self::Decode(err.to_string());
        }
        let message = format!("{err:#}");
        if message.trim().is_empty() {
            Self::Unexpected
        } else {
            Self::Transport(message)
        }
    }
}
