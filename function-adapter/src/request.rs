use hyper::body::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::classifier::{Classification, EventTypeClassifier, TypeDescriptor};
use crate::codec::{printable, JsonCodec};
use crate::error::AdapterError;
use crate::message::{CanonicalMessage, Headers};
use crate::{AWS_API_GATEWAY, AWS_CONTEXT, AWS_EVENT};

/// Turns raw invocation bytes into a [CanonicalMessage] tagged with where they came from.
#[derive(Debug, Clone, Default)]
pub struct RequestAdapter {
    classifier: EventTypeClassifier,
}

impl RequestAdapter {
    pub fn new(classifier: EventTypeClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &EventTypeClassifier {
        &self.classifier
    }

    /// Builds a message from the invocation payload without an invocation context.
    /// * `declared` - the input type of the handler the message is meant for
    /// * `is_producer` - the handler takes no input (a source), so it never gets the typed-event marker
    pub fn adapt(
        &self,
        raw: impl Into<Bytes>,
        declared: &TypeDescriptor,
        is_producer: bool,
        codec: &dyn JsonCodec,
    ) -> Result<CanonicalMessage, AdapterError> {
        self.build(raw.into(), declared, is_producer, codec, None)
            .map(|(message, _)| message)
    }

    /// Same as [RequestAdapter::adapt], with the invocation context stored in the `aws-context` header
    /// in its serialized form. Use [CanonicalMessage::context] to get it back.
    pub fn adapt_with_context<C: Serialize + ?Sized>(
        &self,
        raw: impl Into<Bytes>,
        declared: &TypeDescriptor,
        is_producer: bool,
        codec: &dyn JsonCodec,
        context: &C,
    ) -> Result<CanonicalMessage, AdapterError> {
        self.adapt_and_decode(raw, declared, is_producer, codec, context)
            .map(|(message, _)| message)
    }

    /// Same as [RequestAdapter::adapt_with_context], also returns the decoded payload
    /// so the caller does not have to decode it again.
    pub fn adapt_and_decode<C: Serialize + ?Sized>(
        &self,
        raw: impl Into<Bytes>,
        declared: &TypeDescriptor,
        is_producer: bool,
        codec: &dyn JsonCodec,
        context: &C,
    ) -> Result<(CanonicalMessage, Value), AdapterError> {
        let context = serde_json::to_value(context).map_err(|source| AdapterError::Encode {
            what: "invocation context",
            source,
        })?;
        self.build(raw.into(), declared, is_producer, codec, Some(context))
    }

    fn build(
        &self,
        raw: Bytes,
        declared: &TypeDescriptor,
        is_producer: bool,
        codec: &dyn JsonCodec,
        context: Option<Value>,
    ) -> Result<(CanonicalMessage, Value), AdapterError> {
        info!("Received: {}", printable(&raw));

        let decoded = codec.decode(&raw).map_err(AdapterError::Decode)?;
        let classification = self.classifier.classify(&decoded, declared);
        debug!("Classified as {:?}, declared input: {:?}", classification, declared.name());

        let mut headers = Headers::new();

        if classification == Classification::HttpGateway {
            headers.insert(AWS_API_GATEWAY.to_owned(), Value::Bool(true));
        }

        // a gateway payload can be declared as a gateway event type too, so this is not tied to the classification
        if !is_producer && self.classifier.kind_of(declared).is_some() {
            headers.insert(AWS_EVENT.to_owned(), Value::Bool(true));
        }

        if let Some(context) = context {
            headers.insert(AWS_CONTEXT.to_owned(), context);
        }

        // caller-supplied headers are copied last and win over the markers on a name collision
        if let Some(Value::Object(caller_headers)) = decoded.get("headers") {
            for (name, value) in caller_headers {
                headers.insert(name.clone(), value.clone());
            }
        }

        Ok((CanonicalMessage::with_headers(raw, headers), decoded))
    }
}
