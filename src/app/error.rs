//! Dispatch-level errors and the reporter they are handed to.

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::http::{Method, MissingArgument, Response, StatusCode};
use crate::router::RouteNotFound;

/// An error that ends a request with a specific status code.
///
/// Handlers return it to short-circuit; the dispatcher also produces it for
/// unmatched paths, unsupported verbs, missing arguments and panics.
///
/// # Examples
///
/// ```
/// use pathwise::app::HttpError;
/// use pathwise::http::StatusCode;
///
/// let err = HttpError::with_message(StatusCode::NotFound, "no such page");
/// assert_eq!(err.to_string(), "HTTP 404: Not Found (no such page)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "HTTP {}: {}{}",
    .status.as_u16(),
    .status.canonical_reason(),
    message_suffix(.message)
)]
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// A plain-text response carrying the message, or the reason phrase when
    /// there is none.
    pub fn into_response(self) -> Response {
        let body = self
            .message
            .unwrap_or_else(|| self.status.canonical_reason().to_owned());
        Response::new(self.status).body(body)
    }
}

// Renders ` (message)` when a message is present.
fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(" ({message})"))
        .unwrap_or_default()
}

impl From<RouteNotFound> for HttpError {
    fn from(err: RouteNotFound) -> Self {
        Self::with_message(
            StatusCode::NotFound,
            format!("The requested URL {} was not found on this server", err.path),
        )
    }
}

impl From<MissingArgument> for HttpError {
    fn from(err: MissingArgument) -> Self {
        Self::with_message(
            StatusCode::BadRequest,
            format!("Missing argument {}", err.name),
        )
    }
}

/// Receives every error the dispatcher turns into a response.
///
/// Injected into [`Application`](super::Application); the default is
/// [`TracingReporter`].
pub trait ErrorReporter: Send + Sync {
    fn report(&self, method: &Method, path: &str, error: &HttpError);
}

/// Logs dispatch errors through `tracing`: client errors at `debug`, except
/// `405`/`501` at `warn`, and server errors at `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, method: &Method, path: &str, err: &HttpError) {
        let status = err.status().as_u16();
        match err.status() {
            s if s.is_server_error() && s != StatusCode::NotImplemented => {
                error!(method = %method, path, status, error = %err, "request failed");
            }
            StatusCode::MethodNotAllowed | StatusCode::NotImplemented => {
                warn!(method = %method, path, status, "method not supported");
            }
            _ => debug!(method = %method, path, status, error = %err, "request rejected"),
        }
    }
}
