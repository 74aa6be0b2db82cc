use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayV2httpResponse};
use aws_lambda_events::event::kinesis::KinesisEvent;
use aws_lambda_events::event::s3::S3Event;
use function_adapter::{
    encode, CanonicalMessage, EventKind, EventTypeClassifier, RequestAdapter, SerdeJsonCodec, TypeDescriptor,
    AWS_API_GATEWAY, AWS_EVENT, STATUS_CODE,
};
use serde_json::{json, Value};

fn pets(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| json!({"id": i.to_string(), "breed": "Beagle", "name": format!("Pet {i}")}))
            .collect(),
    )
}

#[test]
fn gateway_get_with_list_output() {
    let adapter = RequestAdapter::default();
    let request = adapter
        .adapt(
            br#"{"httpMethod":"GET","path":"/pets"}"#.to_vec(),
            &TypeDescriptor::unknown(),
            false,
            &SerdeJsonCodec,
        )
        .unwrap();

    let response = CanonicalMessage::new(pets(10)).with_header(STATUS_CODE, 200);
    let out = encode(&request, Some(&response), &SerdeJsonCodec, &TypeDescriptor::unknown()).unwrap();
    let out: Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(out["isBase64Encoded"], json!(false));
    assert_eq!(out["statusCode"], json!(200));

    let body: Value = serde_json::from_str(out["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, pets(10));
}

#[test]
fn pass_through_headers_survive_adaptation() {
    let raw = json!({
        "httpMethod": "POST",
        "headers": {"Content-Type": "application/json", "X-Trace": "abc", "x-count": 2}
    });
    let msg = RequestAdapter::default()
        .adapt(
            serde_json::to_vec(&raw).unwrap(),
            &TypeDescriptor::unknown(),
            false,
            &SerdeJsonCodec,
        )
        .unwrap();

    for (name, value) in raw["headers"].as_object().unwrap() {
        assert_eq!(msg.header(name), Some(value), "header {name}");
    }
}

#[test]
fn echo_handler_keeps_the_body() {
    let raw = br#"{ "httpMethod": "POST", "body": "hello" }"#.to_vec();
    let request = RequestAdapter::default()
        .adapt(raw.clone(), &TypeDescriptor::unknown(), false, &SerdeJsonCodec)
        .unwrap();

    // the echo handler returns its input as a structured value
    let echoed: Value = serde_json::from_slice(&raw).unwrap();
    let response = CanonicalMessage::new(echoed.clone());

    let out = encode(&request, Some(&response), &SerdeJsonCodec, &TypeDescriptor::unknown()).unwrap();
    let out: Value = serde_json::from_slice(&out).unwrap();
    let body: Value = serde_json::from_str(out["body"].as_str().unwrap()).unwrap();

    assert_eq!(body, echoed);
}

#[test]
fn declared_types_from_aws_lambda_events() {
    let adapter = RequestAdapter::default();

    let s3 = adapter
        .adapt(
            br#"{"Records":[]}"#.to_vec(),
            &TypeDescriptor::of::<S3Event>(),
            false,
            &SerdeJsonCodec,
        )
        .unwrap();
    assert!(s3.flag(AWS_EVENT));
    assert!(!s3.flag(AWS_API_GATEWAY));

    let classifier = EventTypeClassifier::default();
    assert_eq!(
        classifier.kind_of(&TypeDescriptor::of::<KinesisEvent>()),
        Some(EventKind::Stream)
    );
    assert_eq!(
        classifier.kind_of(&TypeDescriptor::of::<ApiGatewayProxyRequest>()),
        Some(EventKind::ApiGatewayV1)
    );
}

#[test]
fn typed_gateway_response_is_not_wrapped_twice() {
    let request = RequestAdapter::default()
        .adapt(
            br#"{"routeKey":"GET /","version":"2.0"}"#.to_vec(),
            &TypeDescriptor::unknown(),
            false,
            &SerdeJsonCodec,
        )
        .unwrap();
    let handler_output = json!({"statusCode": 302, "headers": {"location": "/new"}});
    let response = CanonicalMessage::new(handler_output.clone());

    let out = encode(
        &request,
        Some(&response),
        &SerdeJsonCodec,
        &TypeDescriptor::of::<ApiGatewayV2httpResponse>(),
    )
    .unwrap();

    assert_eq!(serde_json::from_slice::<Value>(&out).unwrap(), handler_output);
}
