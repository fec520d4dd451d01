//! The action dispatcher.
//!
//! A [`Dispatcher`] owns the routing table from action name to the ordered
//! list of registered stores and performs synchronous fan-out dispatch.
//! Handlers that return deferred results are parked as pending continuations
//! and delivered later by [`Dispatcher::settle_ready`] or
//! [`Dispatcher::settle`], strictly after the triggering dispatch returned.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::deferred::{Deferred, HandlerResult, Polled, Settled};
use crate::store::Store;
use crate::value::Value;

/// Suffix of the synthetic continuation action fired on fulfillment.
pub const SUCCESS_SUFFIX: &str = "Success";

/// Suffix of the synthetic continuation action fired on rejection.
pub const ERROR_SUFFIX: &str = "Error";

/// Routes named actions to the stores registered for them.
///
/// The handle is cheap to clone; clones share one routing table. Identity
/// (`==`) is pointer identity, so two independently created dispatchers never
/// compare equal.
///
/// Dispatch is synchronous and takes no lock: fan-out iterates a stable
/// snapshot of the registered list, so a handler may re-enter `dispatch` (the
/// inner dispatch completes fully before the outer one resumes) and may
/// register or unregister stores without skipping or double-invoking anyone
/// in the current fan-out.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Rc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    // format: {"actionA": [storeA, storeB], "actionB": [storeC]}
    action_handlers: RefCell<HashMap<String, Vec<Store>>>,
    pending: RefCell<Vec<Continuation>>,
}

struct Continuation {
    store: Store,
    action: String,
    deferred: Deferred,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `store` for `action`, appending it to the handler list.
    ///
    /// Silently idempotent: a store already registered for that action is not
    /// appended again.
    pub fn register(&self, action: &str, store: &Store) {
        let mut handlers = self.inner.action_handlers.borrow_mut();
        let entry = handlers.entry(action.to_string()).or_default();
        if entry.iter().any(|registered| registered == store) {
            return;
        }
        entry.push(store.clone());
    }

    /// Removes `store` from the handler list for `action`; no-op if absent.
    pub fn unregister(&self, action: &str, store: &Store) {
        let mut handlers = self.inner.action_handlers.borrow_mut();
        if let Some(entry) = handlers.get_mut(action) {
            entry.retain(|registered| registered != store);
        }
    }

    /// The stores currently registered for `action`, in registration order.
    #[must_use]
    pub fn registered_for(&self, action: &str) -> Vec<Store> {
        self.inner
            .action_handlers
            .borrow()
            .get(action)
            .cloned()
            .unwrap_or_default()
    }

    /// Dispatches `action` with `args` to every registered store, in
    /// registration order.
    ///
    /// A store lacking a handler named `action` is silently skipped. A handler
    /// returning [`HandlerResult::Async`] enqueues a pending continuation
    /// targeting that store; nothing asynchronous runs inside this call.
    pub fn dispatch(&self, action: &str, args: &[Value]) {
        for store in self.registered_for(action) {
            match store.invoke(action, args) {
                Some(HandlerResult::Async(deferred)) => {
                    self.inner.pending.borrow_mut().push(Continuation {
                        store: store.clone(),
                        action: action.to_string(),
                        deferred,
                    });
                }
                Some(HandlerResult::Sync) | None => {}
            }
        }
    }

    /// Number of continuations still waiting for their deferred to settle.
    #[must_use]
    pub fn pending_continuations(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Delivers every continuation whose deferred has already settled and
    /// returns how many were delivered.
    ///
    /// Fulfillment invokes `<action>Success` and rejection `<action>Error`
    /// directly on the store that produced the deferred; this never fans out
    /// to other stores registered under the synthetic name, and a store
    /// lacking the handler is silently skipped. Abandoned deferreds are
    /// discarded. Non-blocking.
    pub fn settle_ready(&self) -> usize {
        let pending = self.inner.pending.take();
        let mut ready = Vec::new();
        let mut waiting = Vec::new();
        for continuation in pending {
            match continuation.deferred.poll() {
                Polled::Ready(outcome) => ready.push((continuation, outcome)),
                Polled::Pending => waiting.push(continuation),
                Polled::Abandoned => {}
            }
        }
        // Restore the waiters before invoking anything: a continuation handler
        // may dispatch again and enqueue new pending entries.
        self.inner.pending.borrow_mut().extend(waiting);

        let delivered = ready.len();
        for (continuation, outcome) in ready {
            Self::deliver(&continuation.store, &continuation.action, outcome);
        }
        delivered
    }

    /// Blocks until every pending continuation settles or `timeout` elapses,
    /// delivering each as it resolves; returns how many were delivered.
    ///
    /// Waits on the oldest continuation first, so same-store continuations
    /// arrive in dispatch order.
    pub fn settle(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut delivered = self.settle_ready();
        while self.pending_continuations() > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let next = {
                let mut pending = self.inner.pending.borrow_mut();
                if pending.is_empty() {
                    break;
                }
                pending.remove(0)
            };
            match next.deferred.wait(deadline - now) {
                Polled::Ready(outcome) => {
                    Self::deliver(&next.store, &next.action, outcome);
                    delivered += 1;
                }
                Polled::Pending => {
                    // Deadline hit; keep it at the head for a later settle.
                    self.inner.pending.borrow_mut().insert(0, next);
                    break;
                }
                Polled::Abandoned => {}
            }
            delivered += self.settle_ready();
        }
        delivered
    }

    /// Resets all registrations and drops pending continuations.
    ///
    /// Intended for test isolation, not steady-state operation.
    pub fn clear(&self) {
        self.inner.action_handlers.borrow_mut().clear();
        self.inner.pending.borrow_mut().clear();
    }

    // Store-local continuation delivery. A deferred returned by the
    // continuation handler itself is not chained; dropping it abandons it.
    fn deliver(store: &Store, action: &str, outcome: Settled) {
        let (suffix, values) = match outcome {
            Settled::Fulfilled(values) => (SUCCESS_SUFFIX, values),
            Settled::Rejected(values) => (ERROR_SUFFIX, values),
        };
        let name = format!("{action}{suffix}");
        let _ = store.invoke(&name, &values);
    }
}

impl PartialEq for Dispatcher {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.inner.action_handlers.borrow();
        let mut registrations: Vec<(&String, usize)> =
            handlers.iter().map(|(action, stores)| (action, stores.len())).collect();
        registrations.sort();
        f.debug_struct("Dispatcher")
            .field("registrations", &registrations)
            .field("pending", &self.inner.pending.borrow().len())
            .finish()
    }
}
