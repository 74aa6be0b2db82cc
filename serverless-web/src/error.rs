use hyper::{Method, StatusCode};
use std::error::Error as StdError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failure on the dispatch path. The dispatcher converts it into a status code and
/// an error message on the response, it never reaches the caller of `service`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler layer decided the caller may not do this.
    #[error("{0}")]
    AccessDenied(String),

    /// The handler looked for something that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// No route matches the method and path, including paths with extra segments.
    #[error("No handler for {method} {path}")]
    NoRoute { method: Method, path: String },

    /// The invocation could not be turned into a request, e.g. a gateway event without a method.
    /// Only raised before dispatch. The dispatcher reports it as a handler failure if a handler returns it.
    #[error("{0}")]
    BadRequest(String),

    /// Anything else raised by the handler.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl DispatchError {
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error as a handler failure, keeping its message verbatim.
    pub fn from_error<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self::Failed {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// The HTTP status the failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::AccessDenied(_) => StatusCode::FORBIDDEN,
            DispatchError::NotFound(_) | DispatchError::NoRoute { .. } => StatusCode::NOT_FOUND,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::from_error(e)
    }
}
