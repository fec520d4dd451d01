//! Error types for fluxgate.
//!
//! All errors are strongly typed using thiserror and raised synchronously at
//! the call that violates a precondition. Nothing is retried or recovered
//! internally; the documented fan-out no-ops are not errors.

use thiserror::Error;

/// Precondition failures raised by fluxgate entry points.
///
/// Several preconditions of the original Flux contract (a non-dispatcher
/// passed to the action factory, a non-object passed to `setState`) are
/// unrepresentable in the typed API and therefore have no variant here.
#[derive(Debug, Error)]
pub enum FluxError {
    /// An action-name list contained an unusable entry.
    #[error("Invalid actions array: {reason}")]
    InvalidActionList {
        /// Why the list was rejected.
        reason: String,
    },

    /// A store prototype was malformed.
    #[error("Invalid store prototype: {reason}")]
    InvalidStorePrototype {
        /// Why the prototype was rejected.
        reason: String,
    },

    /// A store was constructed without a non-empty action set.
    #[error("Stores must define a non-empty actions array")]
    EmptyActionsArray,

    /// A store binding could not resolve its store.
    #[error("Missing store")]
    MissingStore,
}

impl FluxError {
    /// Creates an `InvalidActionList` error.
    #[must_use]
    pub fn invalid_action_list(reason: impl Into<String>) -> Self {
        Self::InvalidActionList {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidStorePrototype` error.
    #[must_use]
    pub fn invalid_store_prototype(reason: impl Into<String>) -> Self {
        Self::InvalidStorePrototype {
            reason: reason.into(),
        }
    }

    /// Returns true if this is an action-list validation error.
    #[must_use]
    pub const fn is_invalid_action_list(&self) -> bool {
        matches!(self, Self::InvalidActionList { .. })
    }

    /// Returns true if this is a store-prototype validation error.
    #[must_use]
    pub const fn is_invalid_store_prototype(&self) -> bool {
        matches!(self, Self::InvalidStorePrototype { .. })
    }

    /// Returns true if this is the missing-actions construction error.
    #[must_use]
    pub const fn is_empty_actions_array(&self) -> bool {
        matches!(self, Self::EmptyActionsArray)
    }

    /// Returns true if this is a store-resolution error.
    #[must_use]
    pub const fn is_missing_store(&self) -> bool {
        matches!(self, Self::MissingStore)
    }
}

/// Result type alias for fluxgate operations.
pub type FluxResult<T> = Result<T, FluxError>;
