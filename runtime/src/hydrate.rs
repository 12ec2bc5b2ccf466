//! Serialize/hydrate boundary for server-to-client handoff
//!
//! A store's state is encoded as a transport-safe JSON string on one host and
//! a live store is reconstructed from that snapshot on another. Hydrated
//! stores behave exactly like freshly constructed ones: effects run
//! immediately, nothing is deferred.
//!
//! Boundary failures are programmer-contract violations, so they surface as
//! typed errors with stable message prefixes (`serialize:` / `hydrate:`) that
//! callers can branch on.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use statecraft_core::reducer::Reducer;

use crate::store::Store;

/// Errors at the serialize/hydrate boundary
#[derive(Debug, Error)]
pub enum HydrationError {
    /// The state cannot be represented as JSON
    #[error("serialize: state is not JSON-representable: {0}")]
    UnsupportedState(String),

    /// The snapshot input was empty or whitespace
    #[error("hydrate: empty snapshot")]
    EmptySnapshot,

    /// The snapshot input was not a valid encoding of the state type
    #[error("hydrate: malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// Encode a state value as a transport-safe snapshot string
///
/// # Errors
///
/// Returns [`HydrationError::UnsupportedState`] when the value cannot be
/// encoded as JSON (for example, a map with non-string keys).
pub fn serialize_state<S: Serialize>(state: &S) -> Result<String, HydrationError> {
    serde_json::to_string(state)
        .map_err(|error| HydrationError::UnsupportedState(error.to_string()))
}

/// Reconstruct a live store from a snapshot produced by [`serialize_state`]
///
/// On success the store's initial state deep-equals the state that was
/// serialized, and its effects interpret immediately.
///
/// # Errors
///
/// - [`HydrationError::EmptySnapshot`] for empty or whitespace input
/// - [`HydrationError::MalformedSnapshot`] for input that does not decode to
///   the state type
pub fn hydrate_store<S, A, E, R>(
    snapshot: &str,
    reducer: R,
    environment: E,
) -> Result<Store<S, A, E, R>, HydrationError>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: DeserializeOwned + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    if snapshot.trim().is_empty() {
        return Err(HydrationError::EmptySnapshot);
    }

    let state: S = serde_json::from_str(snapshot)
        .map_err(|error| HydrationError::MalformedSnapshot(error.to_string()))?;

    tracing::debug!("Hydrated store from snapshot");
    Ok(Store::new(state, reducer, environment))
}
