use base64::{engine::general_purpose::STANDARD, Engine as _};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, IntoHeaderName, CONTENT_TYPE};
use hyper::{HeaderMap, Method};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::error::DispatchError;

/// An HTTP request that was never on the wire.
///
/// The body is already buffered. All mutators take `&mut self` while the dispatcher only
/// borrows the request, so nothing can change it once `service` has started.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    path: String,
    parameters: HashMap<String, Vec<String>>,
    headers: HeaderMap,
    body: Bytes,
}

impl ProxyRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Non-empty path segments, so `/pets/` and `/pets` have the same segments.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Replaces all values of the query parameter.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), vec![value.into()]);
    }

    /// Adds one more value to the query parameter.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.entry(name.into()).or_default().push(value.into());
    }

    /// The first value of the query parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn parameter_values(&self, name: &str) -> &[String] {
        self.parameters.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parameters(&self) -> &HashMap<String, Vec<String>> {
        &self.parameters
    }

    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn add_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// The first value of the header if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets the `Content-Type` header. Values that are not valid header values are dropped.
    pub fn set_content_type(&mut self, content_type: &str) {
        match HeaderValue::from_str(content_type) {
            Ok(v) => {
                self.headers.insert(CONTENT_TYPE, v);
            }
            Err(e) => warn!("Invalid content type {content_type:?}: {e}"),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    pub fn set_content(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn content(&self) -> &Bytes {
        &self.body
    }

    /// Builds a request from an API Gateway proxy event, REST API (v1) or HTTP API (v2).
    pub fn from_gateway_event(event: &Value) -> Result<Self, DispatchError> {
        // v1 has httpMethod at the top, v2 nests it in requestContext.http
        let method = event
            .get("httpMethod")
            .or_else(|| event.pointer("/requestContext/http/method"))
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::bad_request("The event has no HTTP method"))?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| DispatchError::bad_request(format!("Invalid HTTP method: {method}")))?;

        let path = event
            .get("path")
            .or_else(|| event.get("rawPath"))
            .or_else(|| event.pointer("/requestContext/http/path"))
            .and_then(Value::as_str)
            .unwrap_or("/");

        let mut request = Self::new(method, path);

        // multi-value parameters are a superset of the single-value ones in v1
        if let Some(Value::Object(params)) = event.get("multiValueQueryStringParameters") {
            for (name, values) in params {
                for value in values.as_array().into_iter().flatten().filter_map(Value::as_str) {
                    request.add_parameter(name.as_str(), value);
                }
            }
        } else if let Some(Value::Object(params)) = event.get("queryStringParameters") {
            for (name, value) in params {
                if let Some(value) = value.as_str() {
                    request.set_parameter(name.as_str(), value);
                }
            }
        }

        if let Some(Value::Object(headers)) = event.get("multiValueHeaders") {
            for (name, values) in headers {
                for value in values.as_array().into_iter().flatten().filter_map(Value::as_str) {
                    request.add_raw_header(name, value);
                }
            }
        } else if let Some(Value::Object(headers)) = event.get("headers") {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request.add_raw_header(name, value);
                }
            }
        }

        if let Some(body) = event.get("body").and_then(Value::as_str) {
            let is_base64_encoded = event
                .get("isBase64Encoded")
                .and_then(Value::as_bool)
                .unwrap_or_default();

            if is_base64_encoded {
                let decoded = STANDARD
                    .decode(body)
                    .map_err(|e| DispatchError::bad_request(format!("Invalid base64 body: {e}")))?;
                request.set_content(decoded);
            } else {
                request.set_content(body.to_owned());
            }
        }

        Ok(request)
    }

    /// Gateway header names are arbitrary strings, so the ones HTTP would reject are skipped.
    fn add_raw_header(&mut self, name: &str, value: &str) {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!("Skipping invalid header {name}: {value:?}"),
        }
    }
}
