//! # Inbox Demo
//!
//! A worked parent/child feature built on Statecraft.
//!
//! This demo showcases:
//! - A parent reducer owning a destination (`compose` window or `help` panel)
//! - Child action delegation with [`Effect::map`] rewrapping
//! - Parent observation of a child action (`saveButtonTapped` commits the
//!   draft and closes the window)
//! - A long-lived autosave subscription, cancelled on save and dismiss
//! - A delayed effect clearing the save confirmation banner
//! - Scoped stores, case-path observation, and hydration (see `main.rs`)
//!
//! ## Example
//!
//! ```no_run
//! use inbox::{InboxAction, InboxEnvironment, InboxReducer, InboxState, SystemClock};
//! use statecraft_runtime::Store;
//!
//! # async fn example() {
//! let env = InboxEnvironment::new(SystemClock);
//! let store = Store::new(InboxState::default(), InboxReducer::new(), env);
//!
//! let _ = store.send(InboxAction::LoadTapped).await;
//! let loading = store.state(|s| s.loading).await;
//! assert!(loading);
//! # }
//! ```
//!
//! [`Effect::map`]: statecraft_core::Effect::map

use chrono::{DateTime, Utc};
use statecraft_core::environment::Clock;

/// Reducers and environment for the inbox feature
pub mod reducer;
/// State and action types
pub mod types;

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub use reducer::{AUTOSAVE_SUBSCRIPTION, ComposeReducer, InboxEnvironment, InboxReducer};
pub use types::{ComposeAction, ComposeState, Destination, HelpState, InboxAction, InboxState};
