//! Case-path matching over the serialized form of actions
//!
//! A case path is a dot-separated string locating a nested child action
//! inside successive presentation envelopes, e.g. `"destination.saveButtonTapped"`.
//! Matching operates on the `serde_json` value form of an action — the same
//! adjacent-tagged encoding the transport boundary uses — so parents can
//! observe deeply nested child actions without knowing the child's types.
//!
//! The grammar has no escape mechanism: a literal `.` inside a segment is
//! unsupported. Action-type identifiers never contain `.`, so such a path
//! simply never matches; it is not an error.
//!
//! Malformed input of any kind (wrong discriminant, missing `action` field,
//! a `dismiss` envelope, non-object values including null and primitives)
//! yields no match, never an error — mismatches are routine control flow,
//! not faults.

use serde::Serialize;
use serde_json::Value;

/// Walk `path` into the value form of an action, returning the innermost
/// child action on a full match.
///
/// Each segment must match the `type` discriminant at the current level; all
/// segments but the last must then unwrap a `{"type":"presented","action":…}`
/// envelope. Any shape violation returns `None`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use statecraft_core::case_path::match_presentation_action;
///
/// let action = json!({
///     "type": "destination",
///     "action": {
///         "type": "presented",
///         "action": { "type": "saveButtonTapped" }
///     }
/// });
///
/// let matched = match_presentation_action(&action, "destination.saveButtonTapped");
/// assert_eq!(matched, Some(json!({ "type": "saveButtonTapped" })));
///
/// assert_eq!(match_presentation_action(&action, "destination.cancelButtonTapped"), None);
/// ```
#[must_use]
pub fn match_presentation_action<A: Serialize>(action: &A, path: &str) -> Option<Value> {
    let value = serde_json::to_value(action).ok()?;
    match_in_value(&value, path).cloned()
}

/// Boolean form of [`match_presentation_action`]
#[must_use]
pub fn is_action_at_path<A: Serialize>(action: &A, path: &str) -> bool {
    let Ok(value) = serde_json::to_value(action) else {
        return false;
    };
    match_in_value(&value, path).is_some()
}

/// Boolean form applying a predicate to the matched child action
#[must_use]
pub fn is_action_at_path_matching<A, F>(action: &A, path: &str, predicate: F) -> bool
where
    A: Serialize,
    F: Fn(&Value) -> bool,
{
    let Ok(value) = serde_json::to_value(action) else {
        return false;
    };
    match_in_value(&value, path).is_some_and(predicate)
}

/// Ordered `path -> handler` registrations with first-match-wins semantics
///
/// Handlers are tried in insertion order and the first non-`None` result is
/// returned, mirroring the fall-through design of destination case types.
/// Registration order is therefore semantically significant.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use statecraft_core::PathMatcher;
///
/// let matcher = PathMatcher::new()
///     .on("destination.saveButtonTapped", |_| Some("save"))
///     .on("destination.setDraft", |_| Some("edit"));
///
/// let action = json!({
///     "type": "destination",
///     "action": { "type": "presented", "action": { "type": "setDraft", "action": "hi" } }
/// });
/// assert_eq!(matcher.matches(&action), Some("edit"));
/// ```
pub struct PathMatcher<'h, T> {
    handlers: Vec<(String, Handler<'h, T>)>,
}

type Handler<'h, T> = Box<dyn Fn(&Value) -> Option<T> + 'h>;

impl<'h, T> PathMatcher<'h, T> {
    /// Create an empty matcher
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler for a case path
    ///
    /// The handler receives the matched innermost child action and may still
    /// decline by returning `None`, in which case later entries are tried.
    #[must_use]
    pub fn on<F>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Option<T> + 'h,
    {
        self.handlers.push((path.into(), Box::new(handler)));
        self
    }

    /// Try each registration in insertion order; first match wins
    #[must_use]
    pub fn matches<A: Serialize>(&self, action: &A) -> Option<T> {
        let value = serde_json::to_value(action).ok()?;
        for (path, handler) in &self.handlers {
            if let Some(matched) = match_in_value(&value, path) {
                if let Some(result) = handler(matched) {
                    return Some(result);
                }
            }
        }
        None
    }
}

impl<T> Default for PathMatcher<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared walking logic over a borrowed value
fn match_in_value<'a>(action: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = action;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let object = current.as_object()?;
        if object.get("type")?.as_str()? != segment {
            return None;
        }
        if segments.peek().is_none() {
            return Some(current);
        }

        let envelope = object.get("action")?.as_object()?;
        if envelope.get("type")?.as_str()? != "presented" {
            return None;
        }
        current = envelope.get("action")?;
    }

    None
}
