//! Request-scoped state.
//!
//! Every inbound request gets exactly one [`Values`] bag, created by
//! [`App::dispatch`](crate::web::App::dispatch) before the middleware chain
//! runs. The bag travels inside a [`Context`], which also carries the
//! request's cancellation token and optional deadline. Handlers and the data
//! layer take the context by reference; nothing else is threaded through.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::web::Error;

/// Trace id reported when a context carries no [`Values`].
const NIL_TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

/// State owned by one in-flight request.
#[derive(Debug)]
pub struct Values {
    trace_id: String,
    started_at: Instant,
    status: AtomicU16,
}

impl Values {
    /// A fresh bag: new v4 trace id, started now, no status yet.
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            started_at: Instant::now(),
            status: AtomicU16::new(0),
        }
    }

    pub fn trace_id(&self) -> &str { &self.trace_id }
    pub fn started_at(&self) -> Instant { self.started_at }
    pub fn since(&self) -> Duration { self.started_at.elapsed() }

    /// The status code decided for this request, `0` until one is set.
    pub fn status_code(&self) -> u16 {
        self.status.load(Ordering::Relaxed)
    }

    pub fn set_status_code(&self, code: u16) {
        self.status.store(code, Ordering::Relaxed);
    }
}

impl Default for Values {
    fn default() -> Self { Self::new() }
}

/// Why a [`Context::run`] call gave up on its future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// The request-scoped context handed to every handler and middleware.
///
/// Cloning is cheap: the values are shared behind an `Arc` and the
/// cancellation token is itself a shared handle.
#[derive(Clone, Debug)]
pub struct Context {
    values: Option<Arc<Values>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// An empty context: no request values, never canceled, no deadline.
    pub fn background() -> Self {
        Self { values: None, cancel: CancellationToken::new(), deadline: None }
    }

    pub(crate) fn for_request(values: Values, cancel: CancellationToken) -> Self {
        Self { values: Some(Arc::new(values)), cancel, deadline: None }
    }

    /// Attaches `values` to this context, replacing any already present.
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = Some(Arc::new(values));
        self
    }

    /// Returns the request's value bag.
    ///
    /// A missing bag means the pipeline was wired incorrectly. The error is
    /// [`Error::MissingValues`], which the pipeline treats as a reason to
    /// shut the service down.
    pub fn values(&self) -> Result<Arc<Values>, Error> {
        self.values.clone().ok_or(Error::MissingValues)
    }

    /// The request's trace id, or the nil UUID outside of a request.
    pub fn trace_id(&self) -> &str {
        self.values.as_deref().map_or(NIL_TRACE_ID, Values::trace_id)
    }

    /// Derives a context that also expires `timeout` from now. An earlier
    /// deadline already on the context wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let at = Instant::now() + timeout;
        self.deadline = Some(self.deadline.map_or(at, |current| current.min(at)));
        self
    }

    /// Derives a context whose cancellation can be triggered independently
    /// of, but is still triggered by, this one.
    pub fn child(&self) -> Self {
        Self {
            values: self.values.clone(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) { self.cancel.cancel(); }

    pub fn is_canceled(&self) -> bool { self.cancel.is_cancelled() }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Drives `fut` until it completes, the context is canceled, or the
    /// deadline passes, whichever comes first. An abandoned `fut` is dropped
    /// in place.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupted::Canceled),
            () = deadline => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

impl Default for Context {
    fn default() -> Self { Self::background() }
}
