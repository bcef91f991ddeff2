//! Request start/completion logging.

use std::sync::Arc;

use tracing::info;

use crate::web::{BoxedHandler, Middleware, from_fn};

/// Logs one "request started" and one "request completed" record per
/// request, whatever the inner chain returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        from_fn(move |ctx, req| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let v = ctx.values()?;

                let method = req.method().clone();
                let path = req.path().to_owned();
                let remote_addr = req.remote_addr().map(|a| a.to_string()).unwrap_or_default();

                info!(
                    trace_id = %v.trace_id(),
                    %method,
                    %path,
                    %remote_addr,
                    "request started"
                );

                let result = next.call(ctx, req).await;

                info!(
                    trace_id = %v.trace_id(),
                    %method,
                    %path,
                    %remote_addr,
                    status_code = v.status_code(),
                    since = ?v.since(),
                    "request completed"
                );

                result
            })
        })
    }
}
