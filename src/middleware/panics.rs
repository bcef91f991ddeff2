//! Panic containment.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::{Arc, Once};

use futures_util::FutureExt;

use crate::metrics::Registry;
use crate::web::{BoxedHandler, Error, Middleware, from_fn};

/// Where the last panic on this thread happened, recorded by the hook while
/// the faulting frames are still on the stack.
struct Fault {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    static LAST_FAULT: RefCell<Option<Fault>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chains a recording hook in front of whatever hook is already installed.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            let fault = Fault {
                location: info.location().map(|l| l.to_string()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            // The slot is gone while the thread is being torn down.
            let _ = LAST_FAULT.try_with(|slot| *slot.borrow_mut() = Some(fault));
            previous(info);
        }));
    });
}

/// The fault the hook recorded for the panic just caught on this thread.
/// Falls back to a backtrace of the recovery point if another hook has
/// since replaced ours.
fn take_fault() -> Fault {
    LAST_FAULT
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| Fault { location: None, backtrace: Backtrace::force_capture().to_string() })
}

/// Runs the handler inside a recovery scope.
///
/// A panic becomes an untrusted [`Error::Panic`] carrying the panic site and
/// the backtrace taken there, and the panics counter goes up by one. The
/// fault never leaves the request.
#[derive(Debug, Clone)]
pub struct Panics {
    registry: Arc<Registry>,
}

impl Panics {
    pub fn new(registry: Arc<Registry>) -> Self {
        install_hook();
        Self { registry }
    }
}

impl Middleware for Panics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let registry = Arc::clone(&self.registry);
        from_fn(move |ctx, req| {
            let next = Arc::clone(&next);
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                // The call itself runs inside the scope too, so a handler
                // that panics before its first await is caught as well.
                let guarded = AssertUnwindSafe(async move { next.call(ctx, req).await });
                match guarded.catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        let fault = take_fault();
                        registry.add_panics();

                        let mut message = panic_message(payload.as_ref());
                        if let Some(location) = fault.location {
                            message = format!("{message} at {location}");
                        }
                        Err(Error::Panic { message, backtrace: fault.backtrace })
                    }
                }
            })
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
