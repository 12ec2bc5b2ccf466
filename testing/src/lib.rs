//! # Statecraft Testing
//!
//! Testing utilities for the Statecraft architecture.
//!
//! This crate provides:
//! - [`TestStore`]: a deterministic scenario harness that executes effects
//!   eagerly, intercepts their dispatches into a pending queue, and drives
//!   delayed work with a fake clock
//! - Mock implementations of environment traits ([`FixedClock`])
//!
//! ## Example
//!
//! ```ignore
//! use statecraft_testing::TestStore;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn load_flow() {
//!     let mut store = TestStore::new(InboxState::default(), InboxReducer, test_env());
//!
//!     let state = store.send(InboxAction::LoadTapped).await;
//!     assert!(state.loading);
//!
//!     let state = store.receive(json!({ "type": "loadCompleted" })).await;
//!     assert_eq!(state.messages.len(), 2);
//!
//!     store.assert_no_pending_actions();
//! }
//! ```

use chrono::{DateTime, Utc};
use statecraft_core::environment::Clock;

/// The deterministic reducer harness
pub mod test_store;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use statecraft_testing::mocks::FixedClock;
    /// use statecraft_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use test_store::{Exhaustivity, TestStore};
