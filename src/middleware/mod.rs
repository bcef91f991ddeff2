//! The middleware chain.
//!
//! Cross-cutting behaviour composed around every business handler. The
//! order is fixed, outermost first:
//!
//! 1. [`Logger`]: "request started" / "request completed" records.
//! 2. [`Errors`]: turns errors into responses; the only place that does.
//! 3. [`Metrics`]: counts requests and errors, after panic containment.
//! 4. [`Panics`]: contains panics nearest the real work.

mod errors;
mod logger;
mod metrics;
mod panics;

use std::sync::Arc;

use crate::metrics::Registry;
use crate::web::Middleware;

pub use errors::Errors;
pub use logger::Logger;
pub use metrics::Metrics;
pub use panics::Panics;

pub(crate) use errors::error_response;

/// The standard chain, outermost first.
pub fn standard(registry: Arc<Registry>) -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(Logger),
        Arc::new(Errors),
        Arc::new(Metrics::new(Arc::clone(&registry))),
        Arc::new(Panics::new(registry)),
    ]
}
