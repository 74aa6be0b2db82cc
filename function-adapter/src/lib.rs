//! Normalizes AWS Lambda invocation payloads into [CanonicalMessage]s and encodes handler
//! results back into what the invoking service expects.
//!
//! - [RequestAdapter] decodes the payload, works out where it came from and tags the message
//! - [encode] wraps the handler output into an API Gateway proxy response when the request came
//!   from API Gateway, or passes it through otherwise
//!
//! JSON handling is injected as a [JsonCodec]. [SerdeJsonCodec] is the default implementation.

pub mod classifier;
pub mod codec;
pub mod error;
pub mod message;
pub mod request;
pub mod response;

pub use classifier::{Classification, EventKind, EventTypeClassifier, TypeDescriptor};
pub use codec::{JsonCodec, SerdeJsonCodec};
pub use error::AdapterError;
pub use message::{CanonicalMessage, Headers, Payload};
pub use request::RequestAdapter;
pub use response::encode;

/// Set to `true` on messages built from an API Gateway proxy request.
pub const AWS_API_GATEWAY: &str = "aws-api-gateway";

/// Set to `true` on messages for handlers that declare one of the known event types as input.
pub const AWS_EVENT: &str = "aws-event";

/// Holds the serialized Lambda invocation context.
pub const AWS_CONTEXT: &str = "aws-context";

/// The response header the handler uses to pass its HTTP status to the gateway envelope.
pub const STATUS_CODE: &str = "statusCode";

/// Present on requests from stream sources, which expect a `statusDescription` in the response.
pub const RECORDS: &str = "Records";
