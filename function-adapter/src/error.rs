use thiserror::Error;

/// Failures that abort an invocation before or after the handler runs.
/// Per-request handler failures never end up here, they are absorbed by the dispatcher.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The inbound payload is not valid JSON.
    #[error("failed to decode the invocation payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// A structured payload or header could not be turned into JSON.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The gateway response envelope could not be serialized.
    /// Indicates a codec or configuration defect rather than a bad request.
    #[error("invalid state: {message}")]
    InvalidState {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
