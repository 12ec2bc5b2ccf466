//! Presentation envelope for parent/child action routing
//!
//! A parent feature that presents a child (a sheet, a dialog, a destination)
//! carries the child's actions through its own action type wrapped in
//! [`PresentationAction`]: either a child action to forward, or a request to
//! remove the child.

use serde::{Deserialize, Serialize};

/// The two-case envelope a parent uses to carry a child's action
///
/// Serialized with adjacent tagging so the wire form is
/// `{"type":"presented","action":…}` / `{"type":"dismiss"}` — the shape the
/// case-path matcher walks.
///
/// # Example
///
/// ```
/// use statecraft_core::PresentationAction;
///
/// let presented = PresentationAction::Presented("saveButtonTapped");
/// assert_eq!(presented.presented(), Some(&"saveButtonTapped"));
///
/// let dismiss: PresentationAction<&str> = PresentationAction::Dismiss;
/// assert!(dismiss.is_dismiss());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "action", rename_all = "camelCase")]
pub enum PresentationAction<A> {
    /// A child action to forward to the presented feature
    Presented(A),

    /// A request to remove the presented child
    Dismiss,
}

impl<A> PresentationAction<A> {
    /// The wrapped child action, if this is the `presented` case
    #[must_use]
    pub const fn presented(&self) -> Option<&A> {
        match self {
            Self::Presented(action) => Some(action),
            Self::Dismiss => None,
        }
    }

    /// Whether this is the `dismiss` case
    #[must_use]
    pub const fn is_dismiss(&self) -> bool {
        matches!(self, Self::Dismiss)
    }

    /// Map the wrapped child action, preserving the `dismiss` case
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> PresentationAction<B> {
        match self {
            Self::Presented(action) => PresentationAction::Presented(f(action)),
            Self::Dismiss => PresentationAction::Dismiss,
        }
    }
}
