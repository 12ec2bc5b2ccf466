//! # Statecraft Runtime
//!
//! Runtime for the Statecraft effect-driven state container.
//!
//! This crate provides the [`Store`] that coordinates reducer execution and
//! effect interpretation, the scoping layer that derives child views onto a
//! parent store's state, and the serialize/hydrate boundary for
//! server-to-client handoff.
//!
//! ## Core Components
//!
//! - **Store**: owns state, drains the action queue, interprets effects
//! - **Scoping**: [`scope_to_destination`]/[`scope_to_optional`] derive
//!   [`ScopedStore`] views with automatic action rewrapping
//! - **Hydration**: [`serialize_state`]/[`hydrate_store`] move state across
//!   the transport boundary
//!
//! ## Example
//!
//! ```ignore
//! use statecraft_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

/// Serialize/hydrate boundary for server-to-client handoff
pub mod hydrate;
/// Scoped child views onto a parent store's state
pub mod scope;
/// The Store runtime: action queue, drain loop, effect interpreter
pub mod store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// Typically means the store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;
pub use hydrate::{HydrationError, hydrate_store, serialize_state};
pub use scope::{ScopedStore, scope_to_destination, scope_to_optional};
pub use store::{StateSubscription, Store, StoreConfig};
