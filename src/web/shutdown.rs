//! The shutdown coordinator.
//!
//! A single bounded queue with capacity one. The OS signal watcher and the
//! app's integrity check both post to it; the API server loop is the only
//! reader. Posting never blocks: if a signal is already queued, the new one
//! is a duplicate and is dropped.

use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Why the service is being asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM, sent by Kubernetes before it kills a pod.
    Terminate,
    /// The pipeline detected a broken invariant.
    Integrity,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Integrity => "integrity",
        })
    }
}

/// Posting side of the coordinator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: mpsc::Sender<Signal>,
}

/// Reading side of the coordinator, owned by the server loop.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: mpsc::Receiver<Signal>,
}

impl Shutdown {
    pub fn channel() -> (Shutdown, ShutdownListener) {
        let (tx, rx) = mpsc::channel(1);
        (Shutdown { tx }, ShutdownListener { rx })
    }

    /// Posts `signal` without waiting.
    pub fn signal(&self, signal: Signal) {
        match self.tx.try_send(signal) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!(%signal, "shutdown already signaled"),
            Err(TrySendError::Closed(_)) => warn!(%signal, "shutdown listener is gone"),
        }
    }
}

impl ShutdownListener {
    /// Waits for the first posted signal. If every [`Shutdown`] handle is
    /// dropped nobody can post any more, so this never resolves.
    pub async fn recv(&mut self) -> Signal {
        match self.rx.recv().await {
            Some(signal) => signal,
            None => std::future::pending().await,
        }
    }

    pub fn try_recv(&mut self) -> Option<Signal> {
        self.rx.try_recv().ok()
    }
}

/// Spawns a task that forwards the first OS termination signal to `shutdown`.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// other platforms only Ctrl-C is available.
pub fn watch_os(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => Signal::Interrupt,
                Err(e) => {
                    error!("failed to install Ctrl-C handler: {e}");
                    std::future::pending().await
                }
            }
        };

        #[cfg(unix)]
        let sigterm = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    Signal::Terminate
                }
                Err(e) => {
                    error!("failed to install SIGTERM handler: {e}");
                    std::future::pending().await
                }
            }
        };

        #[cfg(not(unix))]
        let sigterm = std::future::pending::<Signal>();

        let signal = tokio::select! {
            s = ctrl_c  => s,
            s = sigterm => s,
        };
        shutdown.signal(signal);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_signals_do_not_block() {
        let (shutdown, mut listener) = Shutdown::channel();
        shutdown.signal(Signal::Integrity);
        shutdown.signal(Signal::Terminate);
        shutdown.clone().signal(Signal::Integrity);

        assert_eq!(listener.try_recv(), Some(Signal::Integrity));
        assert_eq!(listener.try_recv(), None);
    }

    #[test]
    fn posting_after_the_listener_is_dropped_is_harmless() {
        let (shutdown, listener) = Shutdown::channel();
        drop(listener);
        shutdown.signal(Signal::Terminate);
    }

    #[tokio::test]
    async fn recv_returns_the_posted_signal() {
        let (shutdown, mut listener) = Shutdown::channel();
        let poster = shutdown.clone();
        tokio::spawn(async move { poster.signal(Signal::Terminate) });
        assert_eq!(listener.recv().await, Signal::Terminate);
    }
}
