use std::fmt::{Display, Formatter};
use serde_json::Value;
use thiserror::Error;

/// A payload returned by the server alongside a non-success status
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(Value),
    Text(String),
}

impl ErrorBody {

    /// Parses `raw` as json, keeping it as text if it is not
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.trim().to_string()),
        }
    }

    /// Returns the messages reported for a single field, e.g. `bio` in `{"bio": ["too long"]}`
    pub fn field_messages(&self, field: &str) -> Vec<String> {
        let Self::Json(Value::Object(map)) = self else { return vec![] };
        match map.get(field) {
            Some(Value::Array(messages)) => messages.iter()
                .map(|message| message.as_str().map_or_else(|| message.to_string(), str::to_string))
                .collect(),
            Some(Value::String(message)) => vec![message.clone()],
            _ => vec![],
        }
    }

}

impl Display for ErrorBody {
    /// Compact json, byte for byte what the server meant
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorBody::Json(value) => write!(f, "{}", value),
            ErrorBody::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Everything that can go wrong when talking to the api
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token is available, so nothing was sent
    #[error("Not authenticated")]
    NoSession,

    /// The request did not reach the server or the response could not be read
    #[error("Connection failed: {0}")]
    Transport(String),

    /// The server rejected the submitted fields
    #[error("Validation failed ({status}): {body}")]
    Validation { status: u16, body: ErrorBody },

    #[error("Unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: ErrorBody },

    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: ErrorBody },

    /// A success response did not contain the expected json
    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {

    /// Classifies a non-success response
    pub fn from_status(status: u16, raw_body: &str) -> Self {
        let body = ErrorBody::parse(raw_body);
        match status {
            400 if matches!(body, ErrorBody::Json(Value::Object(_))) => ApiError::Validation { status, body },
            401 | 403 => ApiError::Unauthorized { status, body },
            _ => ApiError::Rejected { status, body },
        }
    }

    /// The payload the server sent with a rejection, if this is one
    pub fn server_body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Validation { body, .. }
            | ApiError::Unauthorized { body, .. }
            | ApiError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }

}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
