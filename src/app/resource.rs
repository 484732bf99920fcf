//! Per-verb request handlers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::HttpError;
use crate::context::Context;
use crate::http::{Response, StatusCode};

/// Boxed future returned by every verb handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, HttpError>> + Send>>;

/// Type-erased, heap-allocated async handler that processes a [`Context`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be shared across
/// tasks without copying the underlying closure. In practice you never
/// construct this type directly; use the [`Methods`] builder instead.
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

fn method_not_allowed() -> HandlerFuture {
    Box::pin(async { Err(HttpError::new(StatusCode::MethodNotAllowed)) })
}

/// A routable resource with one async handler per HTTP verb.
///
/// Every verb defaults to `405 Method Not Allowed`; implement only the ones the
/// resource supports.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync` because a resource is shared by
///   every request routed to it.
/// - The returned future **must** be `Send + 'static`; it runs on its own task.
///
/// # Examples
///
/// ```rust,no_run
/// use pathwise::app::{HandlerFuture, Resource};
/// use pathwise::context::Context;
/// use pathwise::http::{Response, StatusCode};
///
/// struct Frontpage;
///
/// impl Resource for Frontpage {
///     fn get(&self, _ctx: Context) -> HandlerFuture {
///         Box::pin(async {
///             Ok(Response::new(StatusCode::Ok)
///                 .header("Content-Type", "text/html")
///                 .body("<h1>hello</h1>"))
///         })
///     }
/// }
/// ```
pub trait Resource: Send + Sync + 'static {
    fn get(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }

    fn post(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }

    fn put(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }

    fn delete(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }

    fn head(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }

    fn options(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }

    fn patch(&self, _ctx: Context) -> HandlerFuture {
        method_not_allowed()
    }
}

/// A [`Resource`] assembled from closures, one per verb.
///
/// # Examples
///
/// ```rust,no_run
/// use pathwise::app::Methods;
/// use pathwise::http::{Response, StatusCode};
///
/// let users = Methods::new()
///     .get(|_ctx| async { Ok(Response::new(StatusCode::Ok)) })
///     .post(|_ctx| async { Ok(Response::new(StatusCode::Created)) });
/// ```
#[derive(Clone, Default)]
pub struct Methods {
    get: Option<Handler>,
    post: Option<Handler>,
    put: Option<Handler>,
    delete: Option<Handler>,
    head: Option<Handler>,
    options: Option<Handler>,
    patch: Option<Handler>,
}

// Erase the concrete handler type and store it as a `Handler` trait object.
fn erase<F, Fut>(handler: F) -> Option<Handler>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
{
    Some(Arc::new(move |ctx| Box::pin(handler(ctx)) as HandlerFuture))
}

fn call(slot: &Option<Handler>, ctx: Context) -> HandlerFuture {
    match slot {
        Some(handler) => handler(ctx),
        None => method_not_allowed(),
    }
}

impl Methods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle `GET` requests.
    #[must_use]
    pub fn get<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.get = erase(handler);
        self
    }

    /// Handle `POST` requests.
    #[must_use]
    pub fn post<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.post = erase(handler);
        self
    }

    /// Handle `PUT` requests.
    #[must_use]
    pub fn put<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.put = erase(handler);
        self
    }

    /// Handle `DELETE` requests.
    #[must_use]
    pub fn delete<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.delete = erase(handler);
        self
    }

    /// Handle `HEAD` requests.
    #[must_use]
    pub fn head<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.head = erase(handler);
        self
    }

    /// Handle `OPTIONS` requests.
    #[must_use]
    pub fn options<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.options = erase(handler);
        self
    }

    /// Handle `PATCH` requests.
    #[must_use]
    pub fn patch<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
    {
        self.patch = erase(handler);
        self
    }
}

impl Resource for Methods {
    fn get(&self, ctx: Context) -> HandlerFuture {
        call(&self.get, ctx)
    }

    fn post(&self, ctx: Context) -> HandlerFuture {
        call(&self.post, ctx)
    }

    fn put(&self, ctx: Context) -> HandlerFuture {
        call(&self.put, ctx)
    }

    fn delete(&self, ctx: Context) -> HandlerFuture {
        call(&self.delete, ctx)
    }

    fn head(&self, ctx: Context) -> HandlerFuture {
        call(&self.head, ctx)
    }

    fn options(&self, ctx: Context) -> HandlerFuture {
        call(&self.options, ctx)
    }

    fn patch(&self, ctx: Context) -> HandlerFuture {
        call(&self.patch, ctx)
    }
}
