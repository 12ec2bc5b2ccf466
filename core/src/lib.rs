//! # Statecraft Core
//!
//! Core types for the Statecraft effect-driven state container.
//!
//! This crate provides the vocabulary the runtime and test harness are built
//! against. It contains no execution logic of its own.
//!
//! ## Core Concepts
//!
//! - **State**: application-defined value owned by exactly one store; replaced,
//!   never edited, on every accepted action
//! - **Action**: a closed, tagged union of pure data inputs
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effect)`
//! - **Effect**: an inert description of deferred work (no hidden I/O)
//! - **Environment**: injected dependencies the effects of a reducer may call
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (described, never performed, by reducers)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```
//! use statecraft_core::{Effect, Reducer};
//!
//! #[derive(Clone, Debug, Default)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> Effect<CounterAction> {
//!         match action {
//!             CounterAction::Increment => {
//!                 state.count += 1;
//!                 Effect::none()
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Case-path matching over the serialized form of actions
pub mod case_path;
/// Effect algebra - inert descriptions of deferred work
pub mod effect;
/// Declarative macros for ergonomic effect construction
pub mod effect_macros;
/// Presentation envelope carrying child actions through a parent action type
pub mod presentation;

/// Reducer module - the core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effect)`.
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use crate::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Purity
    ///
    /// `reduce` must be total and synchronous: it never suspends, never
    /// performs I/O directly, and describes all deferred work through the
    /// returned [`Effect`]. A reducer that panics is a bug; the runtime lets
    /// the panic propagate rather than continue with ambiguous state.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for InboxReducer {
    ///     type State = InboxState;
    ///     type Action = InboxAction;
    ///     type Environment = InboxEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut InboxState,
    ///         action: InboxAction,
    ///         env: &InboxEnvironment,
    ///     ) -> Effect<InboxAction> {
    ///         match action {
    ///             InboxAction::LoadTapped => {
    ///                 state.loading = true;
    ///                 Effect::run(|dispatch| async move {
    ///                     dispatch.send(InboxAction::LoadCompleted(vec![])).await;
    ///                 })
    ///             }
    ///             _ => Effect::none(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into a state change and an effect
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns a description of deferred work for the runtime
        ///
        /// Multiple units of deferred work are expressed with
        /// [`Effect::batch`](crate::effect::Effect::batch).
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effect<Self::Action>;
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected via
/// the Environment parameter, supplied once at store construction. The
/// container itself never mutates the environment.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// struct SystemClock;
    /// impl Clock for SystemClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         Utc::now()
    ///     }
    /// }
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }
}

pub use case_path::PathMatcher;
pub use effect::{Dispatcher, Effect, SubscriptionError, SubscriptionId, Teardown};
pub use presentation::PresentationAction;
pub use reducer::Reducer;
