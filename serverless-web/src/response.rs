use function_adapter::{CanonicalMessage, Headers, STATUS_CODE};
use hyper::header::{HeaderValue, IntoHeaderName, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use serde_json::Value;
use std::borrow::Cow;
use std::error::Error as StdError;
use tracing::debug;

use crate::error::DispatchError;

/// The failure recorded on a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorOutcome {
    pub status: StatusCode,
    pub message: String,
    /// The message of the underlying error, if there was one.
    pub cause: Option<String>,
}

/// An HTTP response that is collected in memory.
///
/// The body is append-only. Status and headers are last-write-wins until a failure is recorded.
/// After that the status and the error outcome stay as the first failure left them.
#[derive(Debug)]
pub struct ProxyResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    error: Option<ErrorOutcome>,
}

impl Default for ProxyResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            error: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Ignored once a failure was recorded.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.error.is_some() {
            debug!("Status {status} ignored, the response already failed with {}", self.status);
            return;
        }
        self.status = status;
    }

    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn add_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.headers.append(name, value);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    /// Appends to the body.
    pub fn append(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    pub fn content(&self) -> &[u8] {
        &self.body
    }

    pub fn content_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Records a failure with the given status. Returns false and changes nothing
    /// if an earlier failure was already recorded.
    pub fn send_error(&mut self, status: StatusCode, message: impl Into<String>) -> bool {
        self.fail(ErrorOutcome {
            status,
            message: message.into(),
            cause: None,
        })
    }

    /// Records a dispatch failure with its mapped status. First failure wins, same as [ProxyResponse::send_error].
    pub fn record_failure(&mut self, error: &DispatchError) -> bool {
        self.fail(ErrorOutcome {
            status: error.status(),
            message: error.to_string(),
            cause: error.source().map(|e| e.to_string()),
        })
    }

    fn fail(&mut self, outcome: ErrorOutcome) -> bool {
        if let Some(first) = &self.error {
            debug!("Already failed with {}: {}. Ignoring: {}", first.status, first.message, outcome.message);
            return false;
        }
        self.status = outcome.status;
        self.error = Some(outcome);
        true
    }

    pub fn error_outcome(&self) -> Option<&ErrorOutcome> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// Converts the response into a message for the response adapter.
    /// The body becomes the raw payload. Headers are copied with multiple values joined by `,`
    /// and the status goes into the `statusCode` header.
    pub fn into_message(self) -> CanonicalMessage {
        let mut headers = Headers::new();
        for name in self.headers.keys() {
            let joined = self
                .headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            headers.insert(name.as_str().to_owned(), Value::String(joined));
        }
        headers.insert(STATUS_CODE.to_owned(), Value::from(self.status.as_u16()));

        CanonicalMessage::with_headers(self.body, headers)
    }
}

impl std::io::Write for ProxyResponse {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use function_adapter::Payload;
    use serde_json::json;

    #[test]
    fn defaults_to_ok() {
        let resp = ProxyResponse::new();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.error_outcome().is_none());
        assert!(resp.content().is_empty());
    }

    #[test]
    fn body_is_appended() {
        let mut resp = ProxyResponse::new();
        resp.append(b"[1,");
        serde_json::to_writer(&mut resp, &json!(2)).unwrap();
        resp.append(b"]");

        assert_eq!(resp.content_as_string(), "[1,2]");
    }

    #[test]
    fn first_failure_wins() {
        let mut resp = ProxyResponse::new();
        resp.set_status(StatusCode::CREATED);

        assert!(resp.send_error(StatusCode::FORBIDDEN, "Can't touch this"));
        assert!(!resp.send_error(StatusCode::INTERNAL_SERVER_ERROR, "later"));
        assert!(!resp.record_failure(&DispatchError::not_found("also later")));
        resp.set_status(StatusCode::OK);

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.error_message(), Some("Can't touch this"));
    }

    #[test]
    fn cause_is_recorded() {
        let mut resp = ProxyResponse::new();
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        resp.record_failure(&DispatchError::from_error(io));

        let outcome = resp.error_outcome().unwrap();
        assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(outcome.message, "disk on fire");
        assert_eq!(outcome.cause.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn headers_are_last_write_wins() {
        let mut resp = ProxyResponse::new();
        resp.set_header("x-a", HeaderValue::from_static("1"));
        resp.set_header("x-a", HeaderValue::from_static("2"));
        assert_eq!(resp.header("x-a"), Some("2"));
    }

    #[test]
    fn into_message() {
        let mut resp = ProxyResponse::new();
        resp.set_status(StatusCode::CREATED);
        resp.set_content_type("application/json");
        resp.add_header("set-cookie", HeaderValue::from_static("a=1"));
        resp.add_header("set-cookie", HeaderValue::from_static("b=2"));
        resp.append(b"{}");

        let msg = resp.into_message();
        assert_eq!(msg.header(STATUS_CODE), Some(&json!(201)));
        assert_eq!(msg.header("content-type"), Some(&json!("application/json")));
        assert_eq!(msg.header("set-cookie"), Some(&json!("a=1,b=2")));
        assert_eq!(msg.payload(), &Payload::from(b"{}".to_vec()));
    }
}
