//! Route tables for the API and debug listeners.

pub mod checkgrp;
pub mod testgrp;
pub mod usergrp;

use std::sync::Arc;

use http::Method;
use sqlx::AnyPool;

use crate::metrics::Registry;
use crate::user;
use crate::web::{App, Context, Request, RouteError, Shutdown};

/// What the API routes need.
pub struct ApiConfig {
    pub shutdown: Shutdown,
    pub metrics: Arc<Registry>,
    pub pool: AnyPool,
}

/// Builds the API app: every route runs inside the standard middleware chain.
pub fn api_mux(cfg: ApiConfig) -> Result<App, RouteError> {
    let ugh = usergrp::Handlers::new(user::Store::new(cfg.pool));

    App::new(cfg.shutdown, cfg.metrics)
        .handle(Method::GET, "v1", "/test", testgrp::test)?
        .handle(Method::GET, "v1", "/users/{page}/{rows}", {
            let h = ugh.clone();
            move |ctx: Context, req: Request| h.clone().query(ctx, req)
        })?
        .handle(Method::GET, "v1", "/users/{id}", {
            let h = ugh.clone();
            move |ctx: Context, req: Request| h.clone().query_by_id(ctx, req)
        })?
        .handle(Method::POST, "v1", "/users", {
            let h = ugh.clone();
            move |ctx: Context, req: Request| h.clone().create(ctx, req)
        })?
        .handle(Method::PUT, "v1", "/users/{id}", {
            let h = ugh.clone();
            move |ctx: Context, req: Request| h.clone().update(ctx, req)
        })?
        .handle(Method::DELETE, "v1", "/users/{id}", move |ctx: Context, req: Request| ugh.clone().delete(ctx, req))
}

/// What the debug routes need.
pub struct DebugConfig {
    pub build: String,
    pub shutdown: Shutdown,
    pub metrics: Arc<Registry>,
    pub pool: AnyPool,
}

/// Builds the debug app. These routes bypass the middleware chain so that
/// probing the service does not move its own request counters.
pub fn debug_mux(cfg: DebugConfig) -> Result<App, RouteError> {
    let cgh = checkgrp::Handlers::new(cfg.build, Arc::clone(&cfg.metrics), cfg.pool);

    App::new(cfg.shutdown, cfg.metrics)
        .handle_no_middleware(Method::GET, "/debug/vars", {
            let h = cgh.clone();
            move |ctx: Context, req: Request| h.clone().vars(ctx, req)
        })?
        .handle_no_middleware(Method::GET, "/debug/liveness", {
            let h = cgh.clone();
            move |ctx: Context, req: Request| h.clone().liveness(ctx, req)
        })?
        .handle_no_middleware(Method::GET, "/debug/readiness", move |ctx: Context, req: Request| cgh.clone().readiness(ctx, req))
}
