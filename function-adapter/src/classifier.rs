use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Known non-HTTP invocation sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ApiGatewayV1,
    ApiGatewayV2,
    ObjectStorage,
    Notification,
    Queue,
    Authorizer,
    Stream,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ApiGatewayV1 => "api-gateway-v1",
            EventKind::ApiGatewayV2 => "api-gateway-v2",
            EventKind::ObjectStorage => "object-storage",
            EventKind::Notification => "notification",
            EventKind::Queue => "queue",
            EventKind::Authorizer => "authorizer",
            EventKind::Stream => "stream",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the classifier made of an invocation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The payload has the shape of an API Gateway proxy request (v1 or v2).
    HttpGateway,
    /// The declared handler input is one of the known event types.
    TypedEvent(EventKind),
    /// Neither of the above. The payload is passed through untouched.
    Unclassified,
}

/// Generic wrappers that are looked through to find the actual event type,
/// e.g. `LambdaEvent<S3Event>` is treated as `S3Event`.
const WRAPPER_TYPES: [&str; 3] = ["CanonicalMessage", "Message", "LambdaEvent"];

/// The declared input or output type of a handler, identified by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: Option<Cow<'static, str>>,
}

impl TypeDescriptor {
    /// Describes `T` by its compiler-provided type name.
    pub fn of<T: ?Sized>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: Some(name.into()) }
    }

    /// A handler with no declared type, e.g. one that takes raw bytes.
    pub fn unknown() -> Self {
        Self { name: None }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The last path segment of the type name with generic arguments removed,
    /// e.g. `aws_lambda_events::event::s3::S3Event` -> `S3Event`.
    pub fn simple_name(&self) -> Option<&str> {
        self.name.as_deref().map(simple_name)
    }
}

fn simple_name(full: &str) -> &str {
    let full = full.trim().trim_start_matches('&');
    let (base, generic) = match full.find('<') {
        Some(idx) => (&full[..idx], full[idx + 1..].strip_suffix('>')),
        None => (full, None),
    };
    let base = base.rsplit(|c: char| c == ':' || c == '.').next().unwrap_or(base);

    match generic {
        Some(inner) if WRAPPER_TYPES.contains(&base) => simple_name(inner),
        _ => base,
    }
}

/// Decides which invocation source a payload came from.
///
/// The structural check for API Gateway payloads is fixed. The typed-event check is a
/// lookup of the declared input type name in a table, so new event types can be added
/// with [EventTypeClassifier::register] without touching the matching code.
#[derive(Debug, Clone)]
pub struct EventTypeClassifier {
    registry: HashMap<Cow<'static, str>, EventKind>,
}

impl Default for EventTypeClassifier {
    /// Pre-populated with the `aws_lambda_events` type names.
    fn default() -> Self {
        Self::empty()
            .register("ApiGatewayProxyRequest", EventKind::ApiGatewayV1)
            .register("ApiGatewayV2httpRequest", EventKind::ApiGatewayV2)
            .register("S3Event", EventKind::ObjectStorage)
            .register("SnsEvent", EventKind::Notification)
            .register("SqsEvent", EventKind::Queue)
            .register("ApiGatewayCustomAuthorizerRequest", EventKind::Authorizer)
            .register("KinesisEvent", EventKind::Stream)
    }
}

impl EventTypeClassifier {
    /// A classifier that knows no typed events. Only the API Gateway shape is detected.
    pub fn empty() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// Adds a type name to the typed-event table. The name is matched against
    /// [TypeDescriptor::simple_name], so pass it without the module path.
    pub fn register(mut self, name: impl Into<Cow<'static, str>>, kind: EventKind) -> Self {
        self.registry.insert(name.into(), kind);
        self
    }

    /// Returns the event kind the declared type is registered as, if any.
    pub fn kind_of(&self, declared: &TypeDescriptor) -> Option<EventKind> {
        declared
            .simple_name()
            .and_then(|name| self.registry.get(name))
            .copied()
    }

    /// An object with `httpMethod` (v1), or with both `routeKey` and `version` (v2).
    pub fn is_gateway_shape(decoded: &Value) -> bool {
        match decoded.as_object() {
            Some(map) => {
                map.contains_key("httpMethod") || (map.contains_key("routeKey") && map.contains_key("version"))
            }
            None => false,
        }
    }

    /// Never fails. Anything that is not recognized is `Unclassified`.
    pub fn classify(&self, decoded: &Value, declared: &TypeDescriptor) -> Classification {
        if Self::is_gateway_shape(decoded) {
            return Classification::HttpGateway;
        }

        match self.kind_of(declared) {
            Some(kind) => Classification::TypedEvent(kind),
            None => Classification::Unclassified,
        }
    }
}
