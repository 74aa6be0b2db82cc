use hyper::Method;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::error::DispatchError;
use crate::request::ProxyRequest;
use crate::response::ProxyResponse;

/// Values captured from `{name}` segments of the route pattern.
pub type PathParams = HashMap<String, String>;

/// The routing engine the dispatcher drives. It is built once and then shared read-only
/// by any number of concurrent invocations.
pub trait HandlerContext: Send + Sync {
    type Handler;

    /// Finds the handler for the method and path.
    fn resolve(&self, method: &Method, path: &str) -> Result<Self::Handler, DispatchError>;

    /// Runs the handler to completion against the request/response pair.
    fn invoke(
        &self,
        handler: Self::Handler,
        request: &ProxyRequest,
        response: &mut ProxyResponse,
    ) -> Result<(), DispatchError>;

    /// Lets the context rewrite a failure before it is recorded on the response.
    fn handle_error(&self, error: DispatchError, _request: &ProxyRequest) -> DispatchError {
        error
    }
}

type RouteFn = dyn Fn(&ProxyRequest, &PathParams, &mut ProxyResponse) -> Result<(), DispatchError> + Send + Sync;

type ErrorFn = dyn Fn(DispatchError, &ProxyRequest) -> DispatchError + Send + Sync;

/// A source of routes and error handlers, applied once when the [Router] is built.
pub trait Configuration {
    fn configure(&self, router: &mut RouterBuilder);
}

/// Matches `{name}` path segments.
static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A route path such as `/pets/{id}`. Leading, trailing and repeated slashes are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        let regex = PARAM_REGEX.get_or_init(|| {
            Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("Invalid path parameter regex. It's a bug.")
        });

        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match regex.captures(s).and_then(|c| c.get(1)) {
                Some(name) => Segment::Param(name.as_str().to_owned()),
                None => Segment::Literal(s.to_owned()),
            })
            .collect();

        Self { segments }
    }

    /// Returns the captured parameters if the path matches, segment for segment.
    fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut segments = path.split('/').filter(|s| !s.is_empty());

        for expected in &self.segments {
            let actual = segments.next()?;
            match expected {
                Segment::Literal(literal) if literal == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), actual.to_owned());
                }
            }
        }

        // extra segments do not match
        match segments.next() {
            Some(_) => None,
            None => Some(params),
        }
    }
}

struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<RouteFn>,
}

/// A handler matched to a request along with the parameters captured from its path.
#[derive(Clone)]
pub struct ResolvedRoute {
    handler: Arc<RouteFn>,
    pub params: PathParams,
}

impl std::fmt::Debug for ResolvedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedRoute").field("params", &self.params).finish()
    }
}

/// Collects routes and error handlers for a [Router].
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
    error_handlers: Vec<Arc<ErrorFn>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. Routes are tried in the order they were added.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&ProxyRequest, &PathParams, &mut ProxyResponse) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&ProxyRequest, &PathParams, &mut ProxyResponse) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&ProxyRequest, &PathParams, &mut ProxyResponse) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// Adds an error handler. Error handlers run in the order they were added,
    /// each one gets the error returned by the previous one.
    pub fn error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(DispatchError, &ProxyRequest) -> DispatchError + Send + Sync + 'static,
    {
        self.error_handlers.push(Arc::new(handler));
        self
    }

    pub fn configure(&mut self, configuration: &dyn Configuration) -> &mut Self {
        configuration.configure(self);
        self
    }

    pub fn build(&mut self) -> Router {
        debug!(
            "Router built with {} routes and {} error handlers",
            self.routes.len(),
            self.error_handlers.len()
        );
        Router {
            routes: std::mem::take(&mut self.routes),
            error_handlers: std::mem::take(&mut self.error_handlers),
        }
    }
}

/// The stock [HandlerContext]: a table of `(method, path pattern)` routes.
pub struct Router {
    routes: Vec<Route>,
    error_handlers: Vec<Arc<ErrorFn>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Builds a router from a list of configurations, e.g. the application routes and the error handlers.
    pub fn from_configurations(configurations: &[&dyn Configuration]) -> Self {
        let mut builder = RouterBuilder::new();
        for configuration in configurations {
            builder.configure(*configuration);
        }
        builder.build()
    }
}

impl HandlerContext for Router {
    type Handler = ResolvedRoute;

    /// A path served for other methods only is the same as an unknown path.
    fn resolve(&self, method: &Method, path: &str) -> Result<ResolvedRoute, DispatchError> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route.pattern.matches(path).map(|params| ResolvedRoute {
                    handler: Arc::clone(&route.handler),
                    params,
                })
            })
            .ok_or_else(|| DispatchError::NoRoute {
                method: method.clone(),
                path: path.to_owned(),
            })
    }

    fn invoke(
        &self,
        handler: ResolvedRoute,
        request: &ProxyRequest,
        response: &mut ProxyResponse,
    ) -> Result<(), DispatchError> {
        (handler.handler)(request, &handler.params, response)
    }

    fn handle_error(&self, error: DispatchError, request: &ProxyRequest) -> DispatchError {
        self.error_handlers
            .iter()
            .fold(error, |error, handler| handler(error, request))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ok(_: &ProxyRequest, _: &PathParams, _: &mut ProxyResponse) -> Result<(), DispatchError> {
        Ok(())
    }

    #[test]
    fn pattern_matching() {
        let pattern = PathPattern::parse("/pets/{id}");

        let params = pattern.matches("/pets/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(pattern.matches("/pets/42/").is_some());
        assert!(pattern.matches("/pets").is_none());
        assert!(pattern.matches("/pets/2/3/4").is_none());
        assert!(pattern.matches("/cats/42").is_none());
    }

    #[test]
    fn invalid_param_names_are_literals() {
        let pattern = PathPattern::parse("/a/{1x}");
        assert!(pattern.matches("/a/{1x}").is_some());
        assert!(pattern.matches("/a/b").is_none());
    }

    #[test]
    fn root_pattern() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("").is_some());
        assert!(pattern.matches("/x").is_none());
    }

    #[test]
    fn resolve_by_method_and_path() {
        let router = Router::builder().get("/pets", ok).post("/pets", ok).get("/pets/{id}", ok).build();

        assert!(router.resolve(&Method::GET, "/pets").is_ok());
        assert!(router.resolve(&Method::POST, "/pets/").is_ok());
        assert_eq!(
            router.resolve(&Method::GET, "/pets/7").unwrap().params.get("id").map(String::as_str),
            Some("7")
        );
        assert!(matches!(
            router.resolve(&Method::DELETE, "/pets"),
            Err(DispatchError::NoRoute { .. })
        ));
        assert!(matches!(
            router.resolve(&Method::GET, "/pets/2/3/4"),
            Err(DispatchError::NoRoute { .. })
        ));
    }

    #[test]
    fn error_handlers_are_chained() {
        let router = Router::builder()
            .error_handler(|error, _| match error {
                DispatchError::NoRoute { path, .. } => DispatchError::not_found(format!("Nothing at {path}")),
                other => other,
            })
            .error_handler(|error, req| match error {
                DispatchError::NotFound(msg) => DispatchError::not_found(format!("{msg} ({})", req.method())),
                other => other,
            })
            .build();

        let req = ProxyRequest::new(Method::GET, "/nope");
        let err = router.handle_error(
            DispatchError::NoRoute {
                method: Method::GET,
                path: "/nope".to_owned(),
            },
            &req,
        );

        assert_eq!(err.to_string(), "Nothing at /nope (GET)");
    }

    struct Health;

    impl Configuration for Health {
        fn configure(&self, router: &mut RouterBuilder) {
            router.get("/health", |_, _, resp| {
                resp.append(b"up");
                Ok(())
            });
        }
    }

    #[test]
    fn configurations() {
        let router = Router::from_configurations(&[&Health]);
        let handler = router.resolve(&Method::GET, "/health").unwrap();
        let mut resp = ProxyResponse::new();

        router
            .invoke(handler, &ProxyRequest::new(Method::GET, "/health"), &mut resp)
            .unwrap();
        assert_eq!(resp.content(), b"up");
    }
}
