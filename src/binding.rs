//! Store-to-observer binding.
//!
//! [`StoreBinding`] is the glue a UI component (or any observer) consumes to
//! follow a store without holding the logic that mutates it. It packs store
//! resolution with the three lifecycle hooks a component-tree framework
//! invokes per mount cycle: [`StoreBinding::initial_state`] (first-render
//! state seed), [`StoreBinding::mount`] (post-mount) and
//! [`StoreBinding::unmount`] (pre-unmount), in that order, once each.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{FluxError, FluxResult};
use crate::store::{ChangeListener, Store};
use crate::value::StateMap;

enum StoreSource {
    Handle(Store),
    Retriever(Box<dyn Fn() -> Option<Store>>),
}

/// Binds one observer to one store through its change-listener lifecycle.
pub struct StoreBinding {
    source: StoreSource,
    change_listener: RefCell<Option<ChangeListener>>,
}

impl StoreBinding {
    /// Binds to an already-resolved store.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            source: StoreSource::Handle(store),
            change_listener: RefCell::new(None),
        }
    }

    /// Binds through a retriever, resolved on every access. Useful when the
    /// store is constructed after the binding.
    #[must_use]
    pub fn with_retriever(retriever: impl Fn() -> Option<Store> + 'static) -> Self {
        Self {
            source: StoreSource::Retriever(Box::new(retriever)),
            change_listener: RefCell::new(None),
        }
    }

    /// Resolves and returns the bound store.
    ///
    /// # Errors
    ///
    /// [`FluxError::MissingStore`] if the retriever yields nothing.
    pub fn store(&self) -> FluxResult<Store> {
        match &self.source {
            StoreSource::Handle(store) => Ok(store.clone()),
            StoreSource::Retriever(retriever) => retriever().ok_or(FluxError::MissingStore),
        }
    }

    /// First-render hook: captures `on_change` as the bound change listener
    /// (so [`Self::unmount`] can remove it by reference later) and returns the
    /// store's current state for adoption by the observer.
    ///
    /// # Errors
    ///
    /// [`FluxError::MissingStore`] if the store cannot be resolved.
    pub fn initial_state(&self, on_change: impl Fn(&StateMap) + 'static) -> FluxResult<StateMap> {
        let store = self.store()?;
        *self.change_listener.borrow_mut() = Some(Rc::new(on_change));
        Ok(store.state())
    }

    /// Post-mount hook: subscribes the captured listener to the store. No-op
    /// when [`Self::initial_state`] has not run in this mount cycle.
    ///
    /// # Errors
    ///
    /// [`FluxError::MissingStore`] if the store cannot be resolved.
    pub fn mount(&self) -> FluxResult<()> {
        let store = self.store()?;
        if let Some(subscriber) = self.change_listener.borrow().clone() {
            store.subscribe(subscriber);
        }
        Ok(())
    }

    /// Pre-unmount hook: unsubscribes the captured listener and discards it,
    /// ending the mount cycle.
    ///
    /// # Errors
    ///
    /// [`FluxError::MissingStore`] if the store cannot be resolved.
    pub fn unmount(&self) -> FluxResult<()> {
        let store = self.store()?;
        if let Some(subscriber) = self.change_listener.borrow_mut().take() {
            store.unsubscribe(&subscriber);
        }
        Ok(())
    }
}

impl fmt::Debug for StoreBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            StoreSource::Handle(_) => "handle",
            StoreSource::Retriever(_) => "retriever",
        };
        f.debug_struct("StoreBinding")
            .field("source", &source)
            .field("listening", &self.change_listener.borrow().is_some())
            .finish()
    }
}
