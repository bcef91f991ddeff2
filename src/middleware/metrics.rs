//! Request and error counting.

use std::sync::Arc;

use crate::metrics::Registry;
use crate::web::{BoxedHandler, Middleware, from_fn};

/// Counts every request once the inner chain returns, and every error.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
}

impl Metrics {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

impl Middleware for Metrics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let registry = Arc::clone(&self.registry);
        from_fn(move |ctx, req| {
            let next = Arc::clone(&next);
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                let result = next.call(ctx, req).await;

                registry.add_requests();
                registry.add_workers();
                if result.is_err() {
                    registry.add_errors();
                }

                result
            })
        })
    }
}
