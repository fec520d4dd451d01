//! # fluxgate - a minimal unidirectional data-flow runtime
//!
//! A central [`Dispatcher`] routes named actions to the stores registered for
//! them; each [`Store`] holds private state and notifies subscribers on real
//! change. UI components (or any observer) react to state changes without
//! holding references to the logic that produced them.
//!
//! ## Core Concepts
//!
//! - **Action**: a named event identifier dispatched with positional arguments
//! - **Dispatcher**: the routing table mapping action names to subscribed stores
//! - **Store**: a stateful unit reacting to actions, exposing its state to subscribers
//! - **ActionRegistry**: a bound, filterable collection of action triggers
//! - **Continuation**: the store-local `<action>Success` / `<action>Error`
//!   follow-up fired when a handler's deferred result settles
//!
//! ## Usage
//!
//! ```rust
//! # fn main() -> Result<(), fluxgate::FluxError> {
//! use fluxgate::{state, ActionRegistry, Dispatcher, HandlerResult, Store, StorePrototype, Value};
//!
//! let dispatcher = Dispatcher::new();
//! let time_actions = ActionRegistry::new(&dispatcher, ["travelBy"])?;
//!
//! let prototype = StorePrototype::builder()
//!     .action_set(time_actions.clone())
//!     .initial_state(|| state([("year", 1985)]))
//!     .handler("travelBy", |store, args| {
//!         let years = args.first().and_then(Value::as_int).unwrap_or(0);
//!         let year = store.get("year").and_then(|v| v.as_int()).unwrap_or(0);
//!         store.set_state(state([("year", year + years)]));
//!         HandlerResult::Sync
//!     })
//!     .build()?;
//! let store = Store::new(&prototype, &[])?;
//!
//! store.subscribe(fluxgate::listener(|new_state| {
//!     let _ = new_state.get("year");
//! }));
//!
//! time_actions.trigger("travelBy").unwrap().emit(&[Value::Int(30)]);
//! assert_eq!(store.get("year"), Some(Value::Int(2015)));
//! # Ok(())
//! # }
//! ```
//!
//! Dispatch is synchronous and single-threaded; handlers returning a
//! [`Deferred`] get their continuation delivered by [`Dispatcher::settle`] /
//! [`Dispatcher::settle_ready`], strictly after the triggering dispatch
//! returned.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod binding;
pub mod deferred;
pub mod dispatcher;
pub mod error;
pub mod store;
pub mod value;

// Re-export primary types at crate root for convenience
pub use actions::{ActionRegistry, ActionTrigger};
pub use binding::StoreBinding;
pub use deferred::{Deferred, DeferredHandle, HandlerResult, Settled};
pub use dispatcher::{Dispatcher, ERROR_SUFFIX, SUCCESS_SUFFIX};
pub use error::{FluxError, FluxResult};
pub use store::{listener, ActionHandler, ChangeListener, Store, StorePrototype, StorePrototypeBuilder};
pub use value::{state, StateMap, Value};
