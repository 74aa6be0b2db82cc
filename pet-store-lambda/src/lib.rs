//! A pet store served from an AWS Lambda function.
//!
//! The routes are plain web handlers in [pets]. [Invocation] feeds them API Gateway requests
//! and any other Lambda events, and encodes their responses for the caller.

pub mod config;
pub mod invocation;
pub mod pets;

pub use config::Config;
pub use invocation::{Invocation, InvocationContext, InvocationError};
pub use pets::{Pet, PetStore, PetStoreErrors};

/// Tells the event route what kind of event it was given, e.g. `queue`.
pub const EVENT_KIND_HEADER: &str = "x-event-kind";
