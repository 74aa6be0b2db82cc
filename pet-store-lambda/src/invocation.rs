use function_adapter::{AdapterError, EventTypeClassifier, JsonCodec, RequestAdapter, SerdeJsonCodec, AWS_API_GATEWAY};
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serverless_web::{DispatchError, HandlerContext, ProxyDispatcher, ProxyRequest, ProxyResponse, Router};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::{pets, EVENT_KIND_HEADER};

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// A handler failed on an event that has no HTTP response to carry the status.
    #[error("{status}: {message}")]
    Dispatch { status: StatusCode, message: String },
}

/// The parts of the Lambda context passed on to the handlers in the `aws-context` header.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    /// Milliseconds since the epoch
    pub deadline: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xray_trace_id: Option<String>,
}

impl From<&lambda_runtime::Context> for InvocationContext {
    fn from(ctx: &lambda_runtime::Context) -> Self {
        Self {
            request_id: ctx.request_id.clone(),
            invoked_function_arn: ctx.invoked_function_arn.clone(),
            deadline: ctx.deadline,
            xray_trace_id: ctx.xray_trace_id.clone(),
        }
    }
}

/// Runs one Lambda invocation end to end: adapt the payload, dispatch it to the routes,
/// encode the response for the caller.
///
/// API Gateway requests are dispatched as the HTTP requests they describe. Any other payload
/// is POSTed to the event route as-is with its event kind in the `x-event-kind` header.
pub struct Invocation<C = Router> {
    adapter: RequestAdapter,
    codec: Box<dyn JsonCodec>,
    dispatcher: ProxyDispatcher<C>,
    config: Config,
}

impl Invocation<Router> {
    /// The pet store. The router is built on the first invocation.
    pub fn pet_store(config: Config) -> Self {
        Self::new(ProxyDispatcher::new(pets::router), config)
    }
}

impl<C> Invocation<C>
where
    C: HandlerContext + 'static,
{
    pub fn new(dispatcher: ProxyDispatcher<C>, config: Config) -> Self {
        Self {
            adapter: RequestAdapter::default(),
            codec: Box::new(SerdeJsonCodec),
            dispatcher,
            config,
        }
    }

    /// Replaces the default event classifier, e.g. to register more event types.
    pub fn with_classifier(mut self, classifier: EventTypeClassifier) -> Self {
        self.adapter = RequestAdapter::new(classifier);
        self
    }

    pub fn dispatcher(&self) -> &ProxyDispatcher<C> {
        &self.dispatcher
    }

    /// Handles the raw invocation payload and returns the bytes to send back to the runtime.
    ///
    /// Handler failures on API Gateway requests end up in the HTTP response. Handler failures on
    /// other events and payloads that are not JSON are returned as errors.
    pub fn handle<X>(&self, raw: impl Into<Bytes>, context: &X) -> Result<Bytes, InvocationError>
    where
        X: Serialize + ?Sized,
    {
        let raw = raw.into();
        let (request, event) = self.adapter.adapt_and_decode(
            raw.clone(),
            &self.config.input_type,
            false,
            self.codec.as_ref(),
            context,
        )?;

        let mut response = ProxyResponse::new();
        match self.proxy_request(raw, &event) {
            Ok(proxy_request) => self.dispatcher.service(&proxy_request, &mut response),
            Err(e) => {
                info!("Cannot dispatch the invocation: {e}");
                response.record_failure(&e);
            }
        }
        debug!("Handler responded with {}", response.status());

        if !request.flag(AWS_API_GATEWAY) {
            if let Some(failure) = response.error_outcome() {
                return Err(InvocationError::Dispatch {
                    status: failure.status,
                    message: failure.message.clone(),
                });
            }
        }

        let response = response.into_message();
        Ok(function_adapter::encode(
            &request,
            Some(&response),
            self.codec.as_ref(),
            &self.config.output_type,
        )?)
    }

    /// Turns the invocation payload into the request the routes see.
    fn proxy_request(&self, raw: Bytes, event: &Value) -> Result<ProxyRequest, DispatchError> {
        if EventTypeClassifier::is_gateway_shape(event) {
            return ProxyRequest::from_gateway_event(event);
        }

        let kind = self
            .adapter
            .classifier()
            .kind_of(&self.config.input_type)
            .map_or("unknown", |kind| kind.as_str());
        debug!("Posting a {kind} event to {}", self.config.event_route);

        let mut request = ProxyRequest::new(Method::POST, self.config.event_route.as_str());
        request.set_header(EVENT_KIND_HEADER, HeaderValue::from_static(kind));
        request.set_content_type("application/json");
        request.set_content(raw);

        Ok(request)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use function_adapter::TypeDescriptor;
    use serde_json::json;

    fn invoke(config: Config, payload: Value) -> Value {
        let invocation = Invocation::pet_store(config);
        let output = invocation
            .handle(serde_json::to_vec(&payload).unwrap(), &InvocationContext::default())
            .unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn gateway_request_is_routed() {
        let output = invoke(Config::default(), json!({"httpMethod": "GET", "path": "/foo"}));

        assert_eq!(output["statusCode"], 403);
        assert_eq!(output["body"], "Can't touch this");
    }

    #[test]
    fn invalid_gateway_request_is_a_bad_request() {
        let output = invoke(Config::default(), json!({"httpMethod": "GET /", "path": "/pets"}));
        assert_eq!(output["statusCode"], 400);
    }

    #[test]
    fn events_go_to_the_event_route() {
        let config = Config {
            input_type: TypeDescriptor::named("SqsEvent"),
            ..Config::default()
        };
        let output = invoke(config, json!({"Records": [{"body": "hi"}]}));

        // not from API Gateway, so no envelope
        assert_eq!(output, json!({"kind": "queue", "records": 1}));
    }

    #[test]
    fn failed_event_is_an_error() {
        let config = Config {
            input_type: TypeDescriptor::named("SqsEvent"),
            ..Config::default()
        };
        let invocation = Invocation::pet_store(config);
        let result = invocation.handle(&br#"{"Records":[]}"#[..], &InvocationContext::default());

        match result {
            Err(InvocationError::Dispatch { status, message }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "No records in the queue event");
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_json_payload_fails() {
        let invocation = Invocation::pet_store(Config::default());
        let result = invocation.handle(&b"not json"[..], &InvocationContext::default());

        assert!(matches!(result, Err(InvocationError::Adapter(AdapterError::Decode(_)))));
    }

    #[test]
    fn context_round_trip() {
        let ctx = InvocationContext {
            request_id: "req-1".to_owned(),
            invoked_function_arn: "arn:aws:lambda:us-east-1:123456789012:function:pets".to_owned(),
            deadline: 1_700_000_000_000,
            xray_trace_id: None,
        };
        let message = RequestAdapter::default()
            .adapt_with_context(
                &b"{}"[..],
                &TypeDescriptor::unknown(),
                false,
                &SerdeJsonCodec,
                &ctx,
            )
            .unwrap();

        assert_eq!(message.context::<InvocationContext>().unwrap(), Some(ctx));
    }
}
