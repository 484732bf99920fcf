//! Dispatch boundary: parse, route, invoke the per-verb handler, render.
//!
//! Routing is path-only: a [`Router`] maps a template to an `Arc<dyn Resource>`,
//! and the resource decides per HTTP verb. The order of outcomes is therefore:
//!
//! 1. no route matches the path → `404 Not Found`;
//! 2. the method is not one of the [`Resource`] verbs → `501 Not Implemented`;
//! 3. the resource does not implement the verb → `405 Method Not Allowed`;
//! 4. otherwise the handler's own result.
//!
//! Failures are rendered as plain-text responses and handed to the injected
//! [`ErrorReporter`]; there is no process-wide error hook.

mod error;
mod resource;

pub use error::{ErrorReporter, HttpError, TracingReporter};
pub use resource::{Handler, HandlerFuture, Methods, Resource};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::context::{Context, Extensions};
use crate::http::{Method, ParsedRequest, RawRequest, RequestParser, Response, StatusCode};
use crate::router::Router;

// Populates a request's extensions with one piece of application state.
type Injector = Box<dyn Fn(&mut Extensions) + Send + Sync>;

/// A compiled router plus everything needed to answer requests with it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pathwise::app::{Application, Methods, Resource};
/// use pathwise::http::{RawRequest, Response, StatusCode};
/// use pathwise::router::RouteTable;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let api: Arc<dyn Resource> = Arc::new(Methods::new().get(|ctx| async move {
///     let method = ctx.param("method").unwrap_or_default().to_owned();
///     Ok(Response::new(StatusCode::Ok).body(method))
/// }));
///
/// let mut table = RouteTable::new();
/// table.register("/api/{method}/{continuation:\\d+}/", api);
/// let app = Application::new(table.compile().unwrap());
///
/// let ok = app.handle(RawRequest::new("GET", "/api/echo/42/")).await;
/// assert_eq!(ok.status(), StatusCode::Ok);
///
/// let missing = app.handle(RawRequest::new("GET", "/api/echo/x/")).await;
/// assert_eq!(missing.status(), StatusCode::NotFound);
/// # }
/// ```
pub struct Application {
    router: Router<Arc<dyn Resource>>,
    parser: RequestParser,
    reporter: Arc<dyn ErrorReporter>,
    injectors: Vec<Injector>,
}

impl Application {
    /// Create an application with the default parser and a [`TracingReporter`].
    pub fn new(router: Router<Arc<dyn Resource>>) -> Self {
        Self {
            router,
            parser: RequestParser::default(),
            reporter: Arc::new(TracingReporter),
            injectors: Vec::new(),
        }
    }

    /// Replace the request parser.
    #[must_use]
    pub fn parser(mut self, parser: RequestParser) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the error reporter.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Share `value` with every request; handlers read it with
    /// [`Context::state`].
    #[must_use]
    pub fn state<T>(mut self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let value = Arc::new(value);
        self.injectors
            .push(Box::new(move |ext: &mut Extensions| ext.insert(Arc::clone(&value))));
        self
    }

    pub fn router(&self) -> &Router<Arc<dyn Resource>> {
        &self.router
    }

    /// Parse `raw` and dispatch it.
    pub async fn handle(&self, raw: RawRequest) -> Response {
        let request = self.parser.parse(raw);
        self.dispatch(request).await
    }

    /// Route an already parsed request and render the outcome.
    pub async fn dispatch(&self, request: ParsedRequest) -> Response {
        let method = request.method().clone();
        let path = request.path().to_owned();

        let result = match self.router.lookup(&path) {
            Ok(found) => {
                debug!(
                    method = %method,
                    path = %path,
                    route = %found.template,
                    "dispatching request"
                );
                let resource = Arc::clone(found.handler);
                let mut ctx = Context::with_params(request, found.params);
                for inject in &self.injectors {
                    inject(ctx.extensions_mut());
                }
                invoke(resource, ctx).await
            }
            Err(not_found) => Err(HttpError::from(not_found)),
        };

        match result {
            Ok(response) => response,
            Err(error) => {
                self.reporter.report(&method, &path, &error);
                error.into_response()
            }
        }
    }
}

// Aborts the handler task when the dispatch future is dropped before it
// finishes, e.g. because the caller gave up on the request.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// Selects the verb handler and runs it on its own task so a panic becomes a 500.
async fn invoke(resource: Arc<dyn Resource>, ctx: Context) -> Result<Response, HttpError> {
    let method = ctx.request().method().clone();
    let future = match method {
        Method::Get => resource.get(ctx),
        Method::Post => resource.post(ctx),
        Method::Put => resource.put(ctx),
        Method::Delete => resource.delete(ctx),
        Method::Head => resource.head(ctx),
        Method::Options => resource.options(ctx),
        Method::Patch => resource.patch(ctx),
        Method::Connect | Method::Trace | Method::Extension(_) => {
            return Err(HttpError::new(StatusCode::NotImplemented));
        }
    };

    let mut task = AbortOnDrop(tokio::spawn(future));
    match (&mut task.0).await {
        Ok(result) => result,
        Err(join) if join.is_panic() => Err(HttpError::with_message(
            StatusCode::InternalServerError,
            "handler panicked",
        )),
        Err(_) => Err(HttpError::with_message(
            StatusCode::InternalServerError,
            "handler was cancelled",
        )),
    }
}
