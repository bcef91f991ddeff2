//! # sales
//!
//! The sales service: an HTTP API behind a fixed middleware chain, and a
//! data layer that turns named-parameter queries into typed results.
//!
//! ## The request pipeline
//!
//! [`web::App`] owns the route table. Every handler registered with
//! [`web::App::handle`] is wrapped, once, in the same chain:
//!
//! - **Logger**: one "request started" and one "request completed" record.
//! - **Errors**: the single place errors become responses. Trusted
//!   [`web::RequestError`]s keep their status; anything else is a bare `500`.
//! - **Metrics**: counts requests and errors in the [`metrics::Registry`].
//! - **Panics**: contains a panicking handler and turns it into an error.
//!
//! Each request carries a [`web::Context`] holding its [`web::Values`]
//! (trace id, start time, status) and its cancellation signal.
//!
//! ## The data layer
//!
//! [`database::exec`], [`database::query_one`] and [`database::query_many`]
//! take a `:name` template and any [`database::Bind`] record, and map rows
//! onto any `sqlx::FromRow` type. [`user::Store`] is built on them.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use http::Method;
//! use sales::metrics::Registry;
//! use sales::web::{App, Context, Error, Request, Response, Server, Shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (shutdown, mut listener) = Shutdown::channel();
//!     sales::web::watch_os(shutdown.clone());
//!
//!     let app = App::new(shutdown, Arc::new(Registry::new()))
//!         .handle(Method::GET, "v1", "/hello/{name}", hello)?;
//!
//!     Server::bind("0.0.0.0:3000")?
//!         .serve(app, async move { listener.recv().await; })
//!         .await?;
//!     Ok(())
//! }
//!
//! async fn hello(_ctx: Context, req: Request) -> Result<Response, Error> {
//!     let name = req.param("name").unwrap_or("world");
//!     Ok(Response::text(format!("hello, {name}")))
//! }
//! ```

pub mod database;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod user;
pub mod web;
