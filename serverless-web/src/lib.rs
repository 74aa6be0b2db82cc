//! Runs web-style handlers inside a Lambda invocation without a listener.
//!
//! A [ProxyRequest] is built from the invocation (see [ProxyRequest::from_gateway_event]),
//! [ProxyDispatcher::service] routes it to a handler, and the handler writes into a
//! [ProxyResponse]. The response turns into a message for `function_adapter::encode` with
//! [ProxyResponse::into_message].

pub mod dispatcher;
pub mod error;
pub mod request;
pub mod response;
pub mod routing;

pub use dispatcher::ProxyDispatcher;
pub use error::DispatchError;
pub use request::ProxyRequest;
pub use response::{ErrorOutcome, ProxyResponse};
pub use routing::{Configuration, HandlerContext, PathParams, ResolvedRoute, Router, RouterBuilder};
