//! Handler and middleware traits, and how handlers are type-erased.
//!
//! # How async handlers are stored
//!
//! The app needs to hold handlers of *different* types in one route table,
//! so every handler is hidden behind a trait object (`dyn ErasedHandler`):
//!
//! ```text
//! async fn get_user(ctx: Context, req: Request) -> Result<Response, Error>
//!        ↓ app.handle(Method::GET, "v1", "/users/{id}", get_user)
//! get_user.into_boxed_handler()            ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_user))            ← stored as BoxedHandler
//!        ↓ wrapped by each Middleware, innermost first
//! handler.call(ctx, req)                   ← one vtable dispatch per layer
//! ```
//!
//! Middleware are the same shape: a [`Middleware`] takes the next
//! [`BoxedHandler`] and returns a new one that calls it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::web::{Context, Error, IntoResponse, Request, Response};

/// What every layer of the chain resolves to.
pub type HandlerResult = Result<Response, Error>;

/// A heap-allocated, type-erased future that resolves to a [`HandlerResult`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in [`BoxedHandler`] and the
/// public [`Middleware`] trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler:
///
/// ```text
/// async fn name(ctx: Context, req: Request) -> Result<impl IntoResponse, Error>
/// ```
///
/// Sealed; the blanket impl below is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete business handler into the trait-object world.
///
/// This is the innermost layer of every chain, so it is also where the
/// handler's chosen status is recorded in the request's values.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture {
        let fut = (self.0)(ctx.clone(), req);
        Box::pin(async move {
            let response = fut.await?.into_response();
            if let Ok(values) = ctx.values() {
                values.set_status_code(response.status_code().as_u16());
            }
            Ok(response)
        })
    }
}

/// Wraps a handler with behaviour that runs before and/or after it.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// Builds a [`BoxedHandler`] from a closure that already returns a boxed
/// future. Middleware use this to avoid a named wrapper type per layer.
pub(crate) fn from_fn<F>(f: F) -> BoxedHandler
where
    F: Fn(Context, Request) -> BoxFuture + Send + Sync + 'static,
{
    Arc::new(LayerFn(f))
}

struct LayerFn<F>(F);

impl<F> ErasedHandler for LayerFn<F>
where
    F: Fn(Context, Request) -> BoxFuture,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture {
        (self.0)(ctx, req)
    }
}

/// Wraps `handler` so that `middleware[0]` runs first.
pub(crate) fn wrap_middleware(middleware: &[Arc<dyn Middleware>], handler: BoxedHandler) -> BoxedHandler {
    middleware.iter().rev().fold(handler, |next, mw| mw.wrap(next))
}
