//! The application: route table, middleware chain, shutdown hook.
//!
//! One radix tree per HTTP method, O(path-length) lookup. Every handler is
//! wrapped in the middleware chain once, at registration, so dispatch is a
//! lookup plus one call.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::metrics::Registry;
use crate::middleware;
use crate::web::handler::wrap_middleware;
use crate::web::{BoxedHandler, Context, Handler, Middleware, Request, Response, Shutdown, Signal, Values};

/// A route pattern that could not be registered.
#[derive(Debug, thiserror::Error)]
#[error("invalid route `{path}`: {source}")]
pub struct RouteError {
    path: String,
    #[source]
    source: matchit::InsertError,
}

/// The entrypoint into the application.
///
/// Build it once at startup, register routes with [`App::handle`], then pass
/// it to [`Server::serve`](crate::web::Server::serve).
pub struct App {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<Arc<dyn Middleware>>,
    shutdown: Shutdown,
    root: CancellationToken,
}

impl App {
    /// An app whose handlers run inside the standard chain: logger, errors,
    /// metrics, panics (outermost first).
    pub fn new(shutdown: Shutdown, metrics: Arc<Registry>) -> Self {
        Self::with_middleware(shutdown, middleware::standard(metrics))
    }

    pub(crate) fn with_middleware(shutdown: Shutdown, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            routes: HashMap::new(),
            middleware,
            shutdown,
            root: CancellationToken::new(),
        }
    }

    /// Registers `handler` for `method` at `"/" + group + path`, or at bare
    /// `path` when `group` is empty. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use http::Method;
    /// # use sales::metrics::Registry;
    /// # use sales::web::{App, Context, Error, Request, Response, Shutdown};
    /// # async fn get_user(_: Context, _: Request) -> Result<Response, Error> { Ok(Response::text("")) }
    /// # fn build() -> Result<App, sales::web::RouteError> {
    /// let (shutdown, _listener) = Shutdown::channel();
    /// let app = App::new(shutdown, Arc::new(Registry::new()))
    ///     .handle(Method::GET, "v1", "/users/{id}", get_user)?;
    /// # Ok(app) }
    /// ```
    pub fn handle(self, method: Method, group: &str, path: &str, handler: impl Handler) -> Result<Self, RouteError> {
        let path = if group.is_empty() { path.to_owned() } else { format!("/{group}{path}") };
        let handler = wrap_middleware(&self.middleware, handler.into_boxed_handler());
        self.insert(method, path, handler)
    }

    /// Registers `handler` without the middleware chain. Dispatch still
    /// attaches request values. Used for the debug surface.
    pub fn handle_no_middleware(self, method: Method, path: &str, handler: impl Handler) -> Result<Self, RouteError> {
        self.insert(method, path.to_owned(), handler.into_boxed_handler())
    }

    fn insert(mut self, method: Method, path: String, handler: BoxedHandler) -> Result<Self, RouteError> {
        self.routes
            .entry(method)
            .or_default()
            .insert(path.clone(), handler)
            .map_err(|source| RouteError { path, source })?;
        Ok(self)
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Routes one request and produces its response.
    ///
    /// Returns `None` when no route matches; the transport answers that
    /// itself. A shutdown-class error triggers a shutdown and is answered
    /// with a bare `500`. Any other error can only come from a route
    /// registered without the chain; it is logged and answered here.
    pub async fn dispatch(&self, req: Request) -> Option<Response> {
        let (handler, params) = self.lookup(req.method(), req.path())?;
        let values = Values::new();
        let trace_id = values.trace_id().to_owned();
        let ctx = Context::for_request(values, self.root.child_token());

        let response = match handler.call(ctx, req.with_params(params)).await {
            Ok(response) => response,
            Err(err) if err.is_shutdown() => {
                error!(trace_id = %trace_id, error = %err, "integrity failure, requesting shutdown");
                self.signal_shutdown();
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(err) => {
                // Only routes outside the chain get here; the errors
                // middleware has not seen this one.
                error!(trace_id = %trace_id, error = %err, "request error");
                middleware::error_response(&err)
            }
        };
        Some(response)
    }

    /// Requests a graceful shutdown because an integrity issue was found.
    pub fn signal_shutdown(&self) {
        self.shutdown.signal(Signal::Integrity);
    }

    /// Cancels every in-flight request's context.
    pub fn cancel_in_flight(&self) {
        self.root.cancel();
    }
}
