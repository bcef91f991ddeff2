//! The request pipeline.
//!
//! A small web framework extension over hyper: an [`App`] owns the route
//! table and wraps every registered handler in the middleware chain, a
//! [`Context`] carries the request-scoped [`Values`] through that chain, and
//! a [`Server`] adapts hyper connections to [`App::dispatch`].
//!
//! ```text
//! hyper ──▶ Server ──▶ App::dispatch ──▶ Logger ─▶ Errors ─▶ Metrics ─▶ Panics ─▶ handler
//!                          │
//!                          └─ no route: 404 from the transport
//! ```

mod app;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod server;
mod shutdown;

pub use app::{App, RouteError};
pub use context::{Context, Interrupted, Values};
pub use error::{Error, FieldError, RequestError};
pub use handler::{BoxedHandler, ErasedHandler, Handler, HandlerResult, Middleware};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::{ServeError, Server};
pub use shutdown::{Shutdown, ShutdownListener, Signal, watch_os};

pub(crate) use handler::{BoxFuture, from_fn};
