//! Stores: stateful units reacting to dispatched actions.
//!
//! A [`StorePrototype`] is the validated, reusable description of a store:
//! its action sets, handlers and optional lifecycle hooks. [`Store::new`]
//! constructs an isolated instance from a prototype — fresh state, fresh
//! listener list, its own registrations — so any number of stores can share
//! one prototype without sharing anything else.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::actions::ActionRegistry;
use crate::deferred::HandlerResult;
use crate::error::{FluxError, FluxResult};
use crate::value::{StateMap, Value};

/// A subscriber callback, invoked with the new state after an accepted change.
///
/// Listeners are compared by pointer identity: subscribing the same
/// `ChangeListener` twice registers it twice, and [`Store::unsubscribe`]
/// removes every occurrence of the given listener.
pub type ChangeListener = Rc<dyn Fn(&StateMap)>;

/// An action handler: receives the store it runs on and the dispatch
/// arguments, and reports whether it started deferred work.
pub type ActionHandler = Rc<dyn Fn(&Store, &[Value]) -> HandlerResult>;

type InitializeHook = Rc<dyn Fn(&Store, &[Value])>;
type InitialStateHook = Rc<dyn Fn() -> StateMap>;

/// Wraps a closure as a [`ChangeListener`] so it can later be unsubscribed
/// by reference.
pub fn listener(f: impl Fn(&StateMap) + 'static) -> ChangeListener {
    Rc::new(f)
}

/// A validated store description: handlers, action sets and lifecycle hooks.
#[derive(Clone)]
pub struct StorePrototype {
    initialize: Option<InitializeHook>,
    initial_state: Option<InitialStateHook>,
    actions: Vec<ActionRegistry>,
    handlers: BTreeMap<String, ActionHandler>,
}

/// Builder for [`StorePrototype`].
///
/// # Example
/// ```rust,ignore
/// let prototype = StorePrototype::builder()
///     .action_set(time_actions)
///     .initial_state(|| state([("year", 1985)]))
///     .handler("travelBy", |store, args| { /* ... */ HandlerResult::Sync })
///     .build()?;
/// ```
#[derive(Default)]
pub struct StorePrototypeBuilder {
    initialize: Option<InitializeHook>,
    initial_state: Option<InitialStateHook>,
    actions: Vec<ActionRegistry>,
    handlers: BTreeMap<String, ActionHandler>,
    error: Option<FluxError>,
}

impl StorePrototype {
    /// Creates a new prototype builder.
    #[must_use]
    pub fn builder() -> StorePrototypeBuilder {
        StorePrototypeBuilder::default()
    }
}

impl StorePrototypeBuilder {
    /// Declares an action set; every name it carries will be registered
    /// against its dispatcher when a store is constructed. Repeatable.
    #[must_use]
    pub fn action_set(mut self, registry: ActionRegistry) -> Self {
        self.actions.push(registry);
        self
    }

    /// Sets the initialization hook, invoked with the store and the
    /// constructor arguments before anything else (dependency injection).
    #[must_use]
    pub fn initialize(mut self, f: impl Fn(&Store, &[Value]) + 'static) -> Self {
        self.initialize = Some(Rc::new(f));
        self
    }

    /// Sets the initial-state hook; its result fully replaces the empty
    /// starting state (no merge).
    #[must_use]
    pub fn initial_state(mut self, f: impl Fn() -> StateMap + 'static) -> Self {
        self.initial_state = Some(Rc::new(f));
        self
    }

    /// Adds a handler for the action named `name`. Repeatable.
    #[must_use]
    pub fn handler(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Store, &[Value]) -> HandlerResult + 'static,
    ) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            self.error
                .get_or_insert(FluxError::invalid_store_prototype("blank handler name"));
            return self;
        }
        if self.handlers.insert(name.clone(), Rc::new(f)).is_some() {
            self.error.get_or_insert(FluxError::invalid_store_prototype(
                format!("duplicate handler {name:?}"),
            ));
        }
        self
    }

    /// Validates and produces the prototype.
    ///
    /// # Errors
    ///
    /// [`FluxError::InvalidStorePrototype`] if a handler name was blank or
    /// declared twice.
    pub fn build(self) -> FluxResult<StorePrototype> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(StorePrototype {
            initialize: self.initialize,
            initial_state: self.initial_state,
            actions: self.actions,
            handlers: self.handlers,
        })
    }
}

impl fmt::Debug for StorePrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorePrototype")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("action_sets", &self.actions.len())
            .field("has_initialize", &self.initialize.is_some())
            .field("has_initial_state", &self.initial_state.is_some())
            .finish()
    }
}

struct StoreShared {
    state: RefCell<StateMap>,
    listeners: RefCell<Vec<ChangeListener>>,
    handlers: BTreeMap<String, ActionHandler>,
}

/// A constructed store instance.
///
/// The handle is cheap to clone; clones share one instance. Identity (`==`)
/// is pointer identity, which is also what dispatcher registration lists use
/// to stay duplicate-free.
#[derive(Clone)]
pub struct Store {
    shared: Rc<StoreShared>,
}

impl Store {
    /// Constructs a store from `prototype`.
    ///
    /// In order: fresh empty state and listener list; the `initialize` hook
    /// with `init_args`, if any; the `initial_state` hook, if any (full state
    /// replace); then every action name of every declared set is registered
    /// against its dispatcher with this store as target.
    ///
    /// # Errors
    ///
    /// [`FluxError::EmptyActionsArray`] if the prototype declares no action
    /// sets.
    pub fn new(prototype: &StorePrototype, init_args: &[Value]) -> FluxResult<Self> {
        let store = Self {
            shared: Rc::new(StoreShared {
                state: RefCell::new(StateMap::new()),
                listeners: RefCell::new(Vec::new()),
                handlers: prototype.handlers.clone(),
            }),
        };
        if let Some(initialize) = &prototype.initialize {
            initialize(&store, init_args);
        }
        if let Some(initial_state) = &prototype.initial_state {
            *store.shared.state.borrow_mut() = initial_state();
        }
        if prototype.actions.is_empty() {
            return Err(FluxError::EmptyActionsArray);
        }
        for registry in &prototype.actions {
            for name in registry.names() {
                registry.dispatcher().register(name, &store);
            }
        }
        Ok(store)
    }

    /// A snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> StateMap {
        self.shared.state.borrow().clone()
    }

    /// The value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.state.borrow().get(key).cloned()
    }

    /// Merges `partial` into the state and notifies subscribers — unless
    /// nothing actually changed.
    ///
    /// Change detection is shallow and strict: if every key of `partial` is
    /// present in the current state with a `==`-equal value, this is a no-op
    /// (no new state, no notification). Otherwise the state is replaced by a
    /// new shallow merge of current and `partial`, and every listener is
    /// invoked in subscription order with the new state. Listeners are
    /// iterated over a stable snapshot, so subscribing or unsubscribing from
    /// inside a notification never skips or double-invokes anyone.
    pub fn set_state(&self, partial: StateMap) {
        let changed = {
            let current = self.shared.state.borrow();
            partial.iter().any(|(key, value)| current.get(key) != Some(value))
        };
        if !changed {
            return;
        }

        {
            let mut slot = self.shared.state.borrow_mut();
            let mut next = slot.clone();
            next.extend(partial);
            *slot = next;
        }

        let snapshot = self.shared.state.borrow().clone();
        let listeners: Vec<ChangeListener> = self.shared.listeners.borrow().clone();
        for subscriber in listeners {
            subscriber(&snapshot);
        }
    }

    /// Appends `subscriber` to the listener list. No dedup: subscribing the
    /// same listener twice means two notifications per change.
    pub fn subscribe(&self, subscriber: ChangeListener) {
        self.shared.listeners.borrow_mut().push(subscriber);
    }

    /// Removes every occurrence of `subscriber` (by pointer identity).
    pub fn unsubscribe(&self, subscriber: &ChangeListener) {
        self.shared
            .listeners
            .borrow_mut()
            .retain(|registered| !Rc::ptr_eq(registered, subscriber));
    }

    /// Returns true if this store has a handler named `action`.
    #[must_use]
    pub fn handles(&self, action: &str) -> bool {
        self.shared.handlers.contains_key(action)
    }

    pub(crate) fn invoke(&self, action: &str, args: &[Value]) -> Option<HandlerResult> {
        let handler = self.shared.handlers.get(action).cloned()?;
        Some(handler(self, args))
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.shared.state.borrow())
            .field("handlers", &self.shared.handlers.keys().collect::<Vec<_>>())
            .field("listeners", &self.shared.listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::value::state;

    fn actions(dispatcher: &Dispatcher, names: &[&str]) -> ActionRegistry {
        ActionRegistry::new(dispatcher, names.iter().copied()).unwrap()
    }

    fn minimal_prototype(dispatcher: &Dispatcher) -> StorePrototype {
        StorePrototype::builder()
            .action_set(actions(dispatcher, &["foo"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_construction_requires_action_sets() {
        let prototype = StorePrototype::builder().build().unwrap();
        let err = Store::new(&prototype, &[]).unwrap_err();
        assert!(err.is_empty_actions_array());
    }

    #[test]
    fn test_builder_rejects_blank_handler_name() {
        let err = StorePrototype::builder()
            .handler("  ", |_store, _args| HandlerResult::Sync)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_store_prototype());
    }

    #[test]
    fn test_builder_rejects_duplicate_handler() {
        let err = StorePrototype::builder()
            .handler("foo", |_store, _args| HandlerResult::Sync)
            .handler("foo", |_store, _args| HandlerResult::Sync)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_store_prototype());
        assert!(format!("{err}").contains("duplicate"));
    }

    #[test]
    fn test_state_is_empty_by_default() {
        let dispatcher = Dispatcher::new();
        let store = Store::new(&minimal_prototype(&dispatcher), &[]).unwrap();
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_initialize_receives_constructor_args() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let hook_seen = Rc::clone(&seen);
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initialize(move |_store, args| {
                hook_seen.borrow_mut().extend(args.iter().cloned());
            })
            .build()
            .unwrap();

        let _store = Store::new(&prototype, &[Value::Int(1), Value::from("x")]).unwrap();

        assert_eq!(seen.borrow().as_slice(), &[Value::Int(1), Value::from("x")]);
    }

    #[test]
    fn test_initialize_can_seed_state_through_the_store() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initialize(|store, args| {
                store.set_state(state([("injected", args.first().cloned().unwrap_or(Value::Null))]));
            })
            .build()
            .unwrap();

        let store = Store::new(&prototype, &[Value::Int(9)]).unwrap();

        assert_eq!(store.get("injected"), Some(Value::Int(9)));
    }

    #[test]
    fn test_initial_state_fully_replaces_state() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initialize(|store, _args| store.set_state(state([("seeded", true)])))
            .initial_state(|| state([("foo", 42)]))
            .build()
            .unwrap();

        let store = Store::new(&prototype, &[]).unwrap();

        // Full replace, not a merge over what initialize set.
        assert_eq!(store.state(), state([("foo", 42)]));
    }

    #[test]
    fn test_construction_registers_every_declared_action_once() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo", "bar"]))
            .action_set(actions(&dispatcher, &["bar", "baz"]))
            .build()
            .unwrap();

        let store = Store::new(&prototype, &[]).unwrap();

        assert_eq!(dispatcher.registered_for("foo"), vec![store.clone()]);
        assert_eq!(dispatcher.registered_for("bar"), vec![store.clone()]);
        assert_eq!(dispatcher.registered_for("baz"), vec![store]);
    }

    #[test]
    fn test_set_state_merges_properties() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initial_state(|| state([("foo", 42), ("bar", 1)]))
            .build()
            .unwrap();
        let store = Store::new(&prototype, &[]).unwrap();

        store.set_state(state([("foo", 43)]));

        assert_eq!(store.state(), state([("foo", 43), ("bar", 1)]));
    }

    #[test]
    fn test_set_state_notifies_each_subscriber_once() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initial_state(|| state([("foo", 42)]))
            .build()
            .unwrap();
        let store = Store::new(&prototype, &[]).unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let first_calls = Rc::clone(&calls);
        let second_calls = Rc::clone(&calls);
        store.subscribe(listener(move |new_state| {
            first_calls.borrow_mut().push(("first", new_state.clone()));
        }));
        store.subscribe(listener(move |new_state| {
            second_calls.borrow_mut().push(("second", new_state.clone()));
        }));

        store.set_state(state([("foo", 43)]));

        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("first", state([("foo", 43)])));
        assert_eq!(calls[1], ("second", state([("foo", 43)])));
    }

    #[test]
    fn test_set_state_with_unchanged_values_is_a_noop() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initial_state(|| state([("a", 1), ("b", 2)]))
            .build()
            .unwrap();
        let store = Store::new(&prototype, &[]).unwrap();

        let notified = Rc::new(RefCell::new(0));
        let count = Rc::clone(&notified);
        store.subscribe(listener(move |_new_state| *count.borrow_mut() += 1));

        // Same values, independent of key order: no notification.
        store.set_state(state([("a", 1)]));
        store.set_state(state([("b", 2), ("a", 1)]));

        assert_eq!(*notified.borrow(), 0);
        assert_eq!(store.state(), state([("a", 1), ("b", 2)]));
    }

    #[test]
    fn test_change_detection_uses_strict_float_equality() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initial_state(|| state([("sum", 0.3)]))
            .build()
            .unwrap();
        let store = Store::new(&prototype, &[]).unwrap();

        let notified = Rc::new(RefCell::new(0));
        let count = Rc::clone(&notified);
        store.subscribe(listener(move |_new_state| *count.borrow_mut() += 1));

        store.set_state(state([("sum", 0.1 + 0.2)]));

        assert_eq!(*notified.borrow(), 1);
        assert_eq!(store.get("sum"), Some(Value::Float(0.1 + 0.2)));
    }

    #[test]
    fn test_new_key_counts_as_change() {
        let dispatcher = Dispatcher::new();
        let store = Store::new(&minimal_prototype(&dispatcher), &[]).unwrap();

        let notified = Rc::new(RefCell::new(0));
        let count = Rc::clone(&notified);
        store.subscribe(listener(move |_new_state| *count.borrow_mut() += 1));

        store.set_state(state([("fresh", 1)]));

        assert_eq!(*notified.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe_removes_all_occurrences() {
        let dispatcher = Dispatcher::new();
        let store = Store::new(&minimal_prototype(&dispatcher), &[]).unwrap();

        let notified = Rc::new(RefCell::new(0));
        let count = Rc::clone(&notified);
        let subscriber = listener(move |_new_state| *count.borrow_mut() += 1);

        // Subscribed twice: two notifications per change.
        store.subscribe(Rc::clone(&subscriber));
        store.subscribe(Rc::clone(&subscriber));
        store.set_state(state([("a", 1)]));
        assert_eq!(*notified.borrow(), 2);

        store.unsubscribe(&subscriber);
        store.set_state(state([("a", 2)]));
        assert_eq!(*notified.borrow(), 2);
    }

    #[test]
    fn test_unsubscribe_keeps_other_listeners() {
        let dispatcher = Dispatcher::new();
        let store = Store::new(&minimal_prototype(&dispatcher), &[]).unwrap();

        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(0));
        let first_count = Rc::clone(&first);
        let second_count = Rc::clone(&second);
        let first_listener = listener(move |_new_state| *first_count.borrow_mut() += 1);
        let second_listener = listener(move |_new_state| *second_count.borrow_mut() += 1);
        store.subscribe(Rc::clone(&first_listener));
        store.subscribe(second_listener);

        store.unsubscribe(&first_listener);
        store.set_state(state([("a", 1)]));

        assert_eq!(*first.borrow(), 0);
        assert_eq!(*second.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe_during_notification_does_not_skip() {
        let dispatcher = Dispatcher::new();
        let store = Store::new(&minimal_prototype(&dispatcher), &[]).unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        let self_removing_store = store.clone();
        let removing_order = Rc::clone(&order);
        let trailing_order = Rc::clone(&order);

        let self_removing: Rc<RefCell<Option<ChangeListener>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&self_removing);
        let subscriber = listener(move |_new_state| {
            removing_order.borrow_mut().push("remover");
            if let Some(me) = slot.borrow().as_ref() {
                self_removing_store.unsubscribe(me);
            }
        });
        *self_removing.borrow_mut() = Some(Rc::clone(&subscriber));

        store.subscribe(subscriber);
        store.subscribe(listener(move |_new_state| {
            trailing_order.borrow_mut().push("trailing");
        }));

        // The snapshot taken before notification still includes everyone.
        store.set_state(state([("a", 1)]));
        assert_eq!(order.borrow().as_slice(), &["remover", "trailing"]);

        // The remover is gone for the next change.
        store.set_state(state([("a", 2)]));
        assert_eq!(order.borrow().as_slice(), &["remover", "trailing", "trailing"]);
    }

    #[test]
    fn test_instances_from_one_prototype_are_isolated() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .initial_state(|| state([("a", 0)]))
            .build()
            .unwrap();

        let first = Store::new(&prototype, &[]).unwrap();
        let second = Store::new(&prototype, &[]).unwrap();

        first.set_state(state([("a", 1)]));

        assert_eq!(first.get("a"), Some(Value::Int(1)));
        assert_eq!(second.get("a"), Some(Value::Int(0)));

        // Both instances were registered independently.
        assert_eq!(dispatcher.registered_for("foo"), vec![first, second]);
    }

    #[test]
    fn test_handles_reports_declared_handlers() {
        let dispatcher = Dispatcher::new();
        let prototype = StorePrototype::builder()
            .action_set(actions(&dispatcher, &["foo"]))
            .handler("foo", |_store, _args| HandlerResult::Sync)
            .build()
            .unwrap();
        let store = Store::new(&prototype, &[]).unwrap();

        assert!(store.handles("foo"));
        assert!(!store.handles("bar"));
    }
}
