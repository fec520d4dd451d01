//! Deferred handler results.
//!
//! An action handler either completes synchronously or hands back a
//! [`Deferred`]: a one-shot settlement slot the dispatcher watches so it can
//! invoke the store-local `<action>Success` / `<action>Error` continuation
//! once the producer settles it. The settlement side ([`DeferredHandle`]) is
//! `Send`, so a handler may move it into a worker thread; delivery still
//! happens on the dispatching thread.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::value::Value;

/// Outcome of a settled deferred.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// The deferred work succeeded; values feed the `<action>Success` handler.
    Fulfilled(Vec<Value>),
    /// The deferred work failed; values feed the `<action>Error` handler.
    Rejected(Vec<Value>),
}

/// What an action handler produced.
///
/// The dispatcher matches on this exhaustively: `Sync` ends the exchange,
/// `Async` enqueues a pending continuation.
#[derive(Debug)]
pub enum HandlerResult {
    /// The handler finished; no continuation will fire.
    Sync,
    /// The handler started deferred work that settles later.
    Async(Deferred),
}

/// A deferred handler result, settled at most once.
#[derive(Debug)]
pub struct Deferred {
    rx: Receiver<Settled>,
}

/// The producer side of a [`Deferred`].
///
/// Dropping the handle without settling abandons the deferred; the pending
/// continuation then becomes inert and is discarded.
#[derive(Debug)]
pub struct DeferredHandle {
    tx: Sender<Settled>,
}

/// Observation of a deferred, used by the dispatcher's settle loop.
#[derive(Debug)]
pub(crate) enum Polled {
    /// Not settled yet.
    Pending,
    /// Settled with an outcome.
    Ready(Settled),
    /// The producer dropped its handle without settling.
    Abandoned,
}

impl Deferred {
    /// Creates a pending deferred and the handle that settles it.
    #[must_use]
    pub fn new() -> (Self, DeferredHandle) {
        let (tx, rx) = bounded(1);
        (Self { rx }, DeferredHandle { tx })
    }

    /// Creates an already-fulfilled deferred.
    #[must_use]
    pub fn fulfilled(values: Vec<Value>) -> Self {
        let (deferred, handle) = Self::new();
        handle.fulfill(values);
        deferred
    }

    /// Creates an already-rejected deferred.
    #[must_use]
    pub fn rejected(values: Vec<Value>) -> Self {
        let (deferred, handle) = Self::new();
        handle.reject(values);
        deferred
    }

    pub(crate) fn poll(&self) -> Polled {
        match self.rx.try_recv() {
            Ok(settled) => Polled::Ready(settled),
            Err(TryRecvError::Empty) => Polled::Pending,
            Err(TryRecvError::Disconnected) => Polled::Abandoned,
        }
    }

    pub(crate) fn wait(&self, timeout: Duration) -> Polled {
        match self.rx.recv_timeout(timeout) {
            Ok(settled) => Polled::Ready(settled),
            Err(RecvTimeoutError::Timeout) => Polled::Pending,
            Err(RecvTimeoutError::Disconnected) => Polled::Abandoned,
        }
    }
}

impl DeferredHandle {
    /// Settles the deferred as fulfilled.
    ///
    /// The capacity-one channel cannot be full here: each deferred has exactly
    /// one handle and settling consumes it.
    pub fn fulfill(self, values: Vec<Value>) {
        let _ = self.tx.send(Settled::Fulfilled(values));
    }

    /// Settles the deferred as rejected.
    pub fn reject(self, values: Vec<Value>) {
        let _ = self.tx.send(Settled::Rejected(values));
    }
}
