use hyper::body::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

use crate::codec::JsonCodec;
use crate::error::AdapterError;
use crate::AWS_CONTEXT;

/// Message headers. Keys are case-sensitive and kept exactly as received.
pub type Headers = HashMap<String, Value>;

/// The body of a [CanonicalMessage].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Bytes that go on the wire as-is.
    Raw(Bytes),
    /// A value that still has to go through the codec.
    Structured(Value),
}

impl Payload {
    /// Returns the wire form of the payload.
    /// Raw bytes are passed through, structured values are serialized with `codec`.
    pub fn to_bytes(&self, codec: &dyn JsonCodec) -> Result<Bytes, AdapterError> {
        match self {
            Payload::Raw(bytes) => Ok(bytes.clone()),
            Payload::Structured(value) => codec.encode(value).map_err(|source| AdapterError::Encode {
                what: "message payload",
                source,
            }),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Raw(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Raw(Bytes::from(value))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(value: &'static [u8]) -> Self {
        Self::Raw(Bytes::from_static(value))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

/// Transport-agnostic envelope of a payload and its headers.
///
/// There is no way to change a message once it is built. The `with_*` methods consume
/// the message and return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMessage {
    payload: Payload,
    headers: Headers,
}

impl CanonicalMessage {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            headers: Headers::new(),
        }
    }

    pub fn with_headers(payload: impl Into<Payload>, headers: Headers) -> Self {
        Self {
            payload: payload.into(),
            headers,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    pub fn contains_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// True only if the header is present and holds boolean `true`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.headers.get(name), Some(Value::Bool(true)))
    }

    /// Restores the invocation context attached by the request adapter, if any.
    pub fn context<C: DeserializeOwned>(&self) -> Result<Option<C>, serde_json::Error> {
        match self.headers.get(AWS_CONTEXT) {
            Some(v) => serde_json::from_value(v.clone()).map(Some),
            None => Ok(None),
        }
    }

    pub fn into_parts(self) -> (Payload, Headers) {
        (self.payload, self.headers)
    }
}

/// The string form of a header value: JSON strings without quotes, anything else as JSON text.
pub fn header_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}
