use hyper::body::Bytes;
use hyper::StatusCode;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::classifier::TypeDescriptor;
use crate::codec::{printable, JsonCodec};
use crate::error::AdapterError;
use crate::message::{header_to_string, CanonicalMessage};
use crate::{AWS_API_GATEWAY, RECORDS, STATUS_CODE};

/// Handler output types that already have the exact shape the caller expects.
/// Their payload is returned without wrapping.
pub const GATEWAY_RESPONSE_TYPES: [&str; 5] = [
    "ApiGatewayV2httpResponse",
    "ApiGatewayProxyResponse",
    "AlbTargetGroupResponse",
    "ApiGatewayCustomAuthorizerResponse",
    "ApiGatewayV2CustomAuthorizerIamPolicyResponse",
];

/// The body returned when the handler produced nothing. It's the JSON string `"OK"`.
const DEFAULT_BODY: &[u8] = b"\"OK\"";

/// Encodes the handler result into the bytes the invoking service expects back.
///
/// * `request` - the message built by the request adapter for this invocation
/// * `response` - the handler output, None if the handler returned nothing
/// * `declared_output` - the output type of the handler
///
/// API Gateway invocations get a proxy response envelope. Everything else gets the handler
/// output as-is.
pub fn encode(
    request: &CanonicalMessage,
    response: Option<&CanonicalMessage>,
    codec: &dyn JsonCodec,
    declared_output: &TypeDescriptor,
) -> Result<Bytes, AdapterError> {
    if let Ok(payload) = request.payload().to_bytes(codec) {
        info!("Encoding response for: {}", printable(&payload));
    }

    if let Some(name) = declared_output.simple_name() {
        if GATEWAY_RESPONSE_TYPES.contains(&name) {
            return match response {
                Some(response) => response.payload().to_bytes(codec),
                None => Ok(Bytes::from_static(DEFAULT_BODY)),
            };
        }
    }

    let response_bytes = match response {
        Some(response) => response.payload().to_bytes(codec)?,
        None => Bytes::from_static(DEFAULT_BODY),
    };

    if !request.flag(AWS_API_GATEWAY) {
        return Ok(response_bytes);
    }

    let status_code = response.map_or(StatusCode::OK, status_code_of);

    let mut envelope = Map::new();
    envelope.insert("isBase64Encoded".to_owned(), Value::Bool(false));
    envelope.insert("statusCode".to_owned(), Value::from(status_code.as_u16()));

    // stream-sourced requests expect the ALB-style description, e.g. "404 Not Found"
    if request.contains_header(RECORDS) {
        envelope.insert("statusDescription".to_owned(), Value::String(status_code.to_string()));
    }

    envelope.insert(
        "body".to_owned(),
        Value::String(String::from_utf8_lossy(&response_bytes).into_owned()),
    );

    if let Some(response) = response {
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(header_to_string(value))))
            .collect::<Map<String, Value>>();
        envelope.insert("headers".to_owned(), Value::Object(headers));
    }

    codec
        .encode(&Value::Object(envelope))
        .map_err(|source| AdapterError::InvalidState {
            message: "Failed to serialize AWS Lambda output".to_owned(),
            source,
        })
}

/// The `statusCode` header of the handler output, a number or a numeric string.
/// Anything else is reported and treated as 200.
fn status_code_of(response: &CanonicalMessage) -> StatusCode {
    let value = match response.header(STATUS_CODE) {
        Some(v) => v,
        None => return StatusCode::OK,
    };

    let code = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };

    match code.map(StatusCode::from_u16) {
        Some(Ok(status)) => status,
        _ => {
            warn!("Invalid statusCode header in the handler output: {value}. Using 200.");
            StatusCode::OK
        }
    }
}
