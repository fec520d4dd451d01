//! Action registries.
//!
//! An [`ActionRegistry`] binds an ordered set of action names to one
//! dispatcher and hands out callable [`ActionTrigger`]s for them. Registries
//! are immutable; [`ActionRegistry::only`] and [`ActionRegistry::drop_actions`]
//! derive filtered registries sharing the same dispatcher.

use crate::dispatcher::Dispatcher;
use crate::error::{FluxError, FluxResult};
use crate::value::Value;

/// An ordered, de-duplicated set of action names bound to a dispatcher.
///
/// Stores declare registries at construction to self-register their handlers;
/// callers use them to obtain dispatch triggers without holding the logic
/// that reacts to them.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    dispatcher: Dispatcher,
    names: Vec<String>,
}

/// A callable dispatch trigger for a single action name.
#[derive(Debug, Clone)]
pub struct ActionTrigger {
    dispatcher: Dispatcher,
    name: String,
}

impl ActionRegistry {
    /// Creates a registry over `names`, bound to `dispatcher`.
    ///
    /// Names are de-duplicated preserving first occurrence. An empty or
    /// all-whitespace name fails with [`FluxError::InvalidActionList`].
    pub fn new<I, S>(dispatcher: &Dispatcher, names: I) -> FluxResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registered = Vec::new();
        for (index, name) in names.into_iter().enumerate() {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(FluxError::invalid_action_list(format!(
                    "empty action name at index {index}"
                )));
            }
            if !registered.contains(&name) {
                registered.push(name);
            }
        }
        Ok(Self {
            dispatcher: dispatcher.clone(),
            names: registered,
        })
    }

    /// The action names this registry represents, in declaration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The dispatcher this registry is bound to.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns true if `name` is one of this registry's actions.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|registered| registered == name)
    }

    /// A dispatch trigger for `name`, or `None` if the registry does not
    /// carry that action.
    #[must_use]
    pub fn trigger(&self, name: &str) -> Option<ActionTrigger> {
        self.contains(name).then(|| ActionTrigger {
            dispatcher: self.dispatcher.clone(),
            name: name.to_string(),
        })
    }

    /// Triggers for every action in the registry, in declaration order.
    pub fn triggers(&self) -> impl Iterator<Item = ActionTrigger> + '_ {
        self.names.iter().map(|name| ActionTrigger {
            dispatcher: self.dispatcher.clone(),
            name: name.clone(),
        })
    }

    /// A new registry restricted to `subset`, preserving this registry's
    /// order. Called with an empty subset, returns the original unchanged.
    #[must_use]
    pub fn only(&self, subset: &[&str]) -> Self {
        if subset.is_empty() {
            return self.clone();
        }
        Self {
            dispatcher: self.dispatcher.clone(),
            names: self
                .names
                .iter()
                .filter(|name| subset.contains(&name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// A new registry excluding `subset`. Called with an empty subset,
    /// returns the original unchanged.
    #[must_use]
    pub fn drop_actions(&self, subset: &[&str]) -> Self {
        if subset.is_empty() {
            return self.clone();
        }
        Self {
            dispatcher: self.dispatcher.clone(),
            names: self
                .names
                .iter()
                .filter(|name| !subset.contains(&name.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl PartialEq for ActionRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.dispatcher == other.dispatcher && self.names == other.names
    }
}

impl ActionTrigger {
    /// The action name this trigger dispatches.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatches the action with `args` through the bound dispatcher.
    pub fn emit(&self, args: &[Value]) {
        self.dispatcher.dispatch(&self.name, args);
    }
}
