use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::request::ProxyRequest;
use crate::response::ProxyResponse;
use crate::routing::HandlerContext;

type Bootstrap<C> = Box<dyn FnOnce() -> C + Send>;

enum State<C> {
    /// The context has not been built yet.
    Uninitialized(Bootstrap<C>),
    Ready(Arc<C>),
    /// The bootstrap panicked. Holds the panic message.
    Failed(String),
    Stopped,
}

/// Runs routed handlers against in-memory requests and responses.
///
/// The handler context is expensive to build, so it is built once, either up front with
/// [ProxyDispatcher::start] or on the first call with [ProxyDispatcher::new], and then shared
/// by all calls to [ProxyDispatcher::service]. Concurrent calls only share the context,
/// each one brings its own request and response.
pub struct ProxyDispatcher<C> {
    state: Mutex<State<C>>,
}

impl<C> ProxyDispatcher<C>
where
    C: HandlerContext + 'static,
{
    /// The context is built by `bootstrap` on the first call to `service` or `initialize`.
    pub fn new<F>(bootstrap: F) -> Self
    where
        F: FnOnce() -> C + Send + 'static,
    {
        Self {
            state: Mutex::new(State::Uninitialized(Box::new(bootstrap))),
        }
    }

    /// Starts with a context that is already built.
    pub fn start(context: C) -> Self {
        Self {
            state: Mutex::new(State::Ready(Arc::new(context))),
        }
    }

    /// Builds the context now rather than on the first request.
    /// Fails if the bootstrap panics, now or on an earlier call.
    ///
    /// # Panics
    /// If called after [ProxyDispatcher::stop].
    pub fn initialize(&self) -> Result<(), DispatchError> {
        self.context().map(|_| ())
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), State::Ready(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(*self.lock(), State::Stopped)
    }

    /// The bootstrap panicked and every request fails with 500.
    pub fn is_failed(&self) -> bool {
        matches!(*self.lock(), State::Failed(_))
    }

    /// Resolves and runs the handler for the request.
    ///
    /// Never fails: every failure on the way, bootstrap and handler panics included, ends up
    /// as an error status and message on the response.
    ///
    /// # Panics
    /// If called after [ProxyDispatcher::stop].
    pub fn service(&self, request: &ProxyRequest, response: &mut ProxyResponse) {
        let context = match self.context() {
            Ok(context) => context,
            Err(e) => {
                record(request, response, &e);
                return;
            }
        };
        debug!("Servicing {} {}", request.method(), request.path());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let handler = context.resolve(request.method(), request.path())?;
            context.invoke(handler, request, response)
        }));

        let error = match outcome {
            Ok(Ok(())) => return,
            // 400 is for invocations that could not be turned into a request at all
            Ok(Err(DispatchError::BadRequest(message))) => DispatchError::failed(message),
            Ok(Err(e)) => e,
            Err(payload) => DispatchError::failed(panic_message(payload.as_ref())),
        };

        let error = context.handle_error(error, request);
        record(request, response, &error);
    }

    /// Releases the handler context. Calls in progress keep their reference until they finish.
    /// Stopping more than once does nothing.
    pub fn stop(&self) {
        let mut state = self.lock();
        match *state {
            State::Stopped => warn!("The dispatcher is already stopped"),
            _ => {
                *state = State::Stopped;
                info!("Dispatcher stopped");
            }
        }
    }

    /// Returns the context, building it first if needed.
    fn context(&self) -> Result<Arc<C>, DispatchError> {
        let mut state = self.lock();

        match std::mem::replace(&mut *state, State::Stopped) {
            State::Ready(context) => {
                *state = State::Ready(Arc::clone(&context));
                Ok(context)
            }
            State::Uninitialized(bootstrap) => {
                info!("Bootstrapping the handler context");
                match panic::catch_unwind(AssertUnwindSafe(bootstrap)) {
                    Ok(context) => {
                        let context = Arc::new(context);
                        *state = State::Ready(Arc::clone(&context));
                        Ok(context)
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!("Handler context bootstrap failed: {message}");
                        *state = State::Failed(message.clone());
                        Err(bootstrap_failed(&message))
                    }
                }
            }
            State::Failed(message) => {
                let err = bootstrap_failed(&message);
                *state = State::Failed(message);
                Err(err)
            }
            State::Stopped => panic!("ProxyDispatcher used after stop. It's a bug."),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<C>> {
        // the state is replaced atomically, so a poisoned lock still holds a consistent value
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bootstrap_failed(message: &str) -> DispatchError {
    DispatchError::failed(format!("The handler context failed to start: {message}"))
}

/// Records the failure on the response. The message doubles as the body if the handler did not write anything.
fn record(request: &ProxyRequest, response: &mut ProxyResponse, error: &DispatchError) {
    info!(
        "{} {} failed with {}: {}",
        request.method(),
        request.path(),
        error.status(),
        error
    );

    if response.record_failure(error) && response.content().is_empty() {
        response.append(error.to_string().as_bytes());
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "The handler panicked".to_owned()
    }
}
