use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Broad failure classes, used to decide between retrying and surfacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or provider fault; retry with backoff
    Transient,
    /// Bad input; show to the customer, never retry
    ClientInput,
    /// Response did not match the expected schema
    DataShape,
    /// No bookable day inside the advance window
    Exhausted,
    /// Operation invoked without the context it needs
    Context,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{context} timed out")]
    Timeout { context: String },
    #[error("{context} failed: {source}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{context} failed with HTTP {status}: {message}")]
    Upstream {
        context: String,
        status: u16,
        message: String,
    },
    #[error("{context} returned an unexpected response: {source}")]
    Shape {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("No available appointments found within the booking window.")]
    NoAvailability,
    #[error("{0}")]
    MissingContext(&'static str),
    #[error("Gave up after {0} retries. Reset the session to start over.")]
    RetryLimit(u32),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Timeout { .. } | BookingError::Network { .. } => ErrorKind::Transient,
            BookingError::Upstream { status, .. } if (400..500).contains(status) => {
                ErrorKind::ClientInput
            }
            BookingError::Upstream { .. } => ErrorKind::Transient,
            BookingError::Validation(_) => ErrorKind::ClientInput,
            BookingError::Shape { .. } => ErrorKind::DataShape,
            BookingError::NoAvailability => ErrorKind::Exhausted,
            BookingError::MissingContext(_) | BookingError::RetryLimit(_) => ErrorKind::Context,
        }
    }

    /// Whether repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::ClientInput
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::ClientInput => StatusCode::BAD_REQUEST,
            ErrorKind::Exhausted => StatusCode::NOT_FOUND,
            ErrorKind::Context => StatusCode::CONFLICT,
            ErrorKind::Transient if matches!(self, BookingError::Timeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ErrorKind::Transient | ErrorKind::DataShape => {
                error!("Upstream failure: {}", self);
                StatusCode::BAD_GATEWAY
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
