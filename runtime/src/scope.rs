//! Scoped child views onto a parent store's state
//!
//! A parent feature that presents a child exposes that child as a
//! [`ScopedStore`]: a read/write view holding no state of its own. The view's
//! `state` is derived from the parent's current state at derivation time, and
//! its `send`/`dismiss` rewrap child actions into the parent's action type
//! through an embed closure.
//!
//! Derivation is pure and cheap; callers are expected to re-derive on every
//! observed parent update rather than caching a view across updates.

use std::sync::Arc;

use statecraft_core::effect::EffectFuture;
use statecraft_core::presentation::PresentationAction;
use statecraft_core::reducer::Reducer;

use crate::store::Store;

/// Erased forwarding closure that embeds a presentation action into the
/// parent's action type and sends it
type ParentForward<CA> =
    Arc<dyn Fn(PresentationAction<CA>) -> EffectFuture + Send + Sync + 'static>;

/// A derived read/write view over a presented child feature
///
/// `state` is `None` when the child is not currently presented (the
/// destination is absent, or holds a different case than the one scoped to).
/// The view owns no state and no lifetime: discard and re-derive freely.
pub struct ScopedStore<ChildState, ChildAction> {
    state: Option<ChildState>,
    forward: ParentForward<ChildAction>,
}

impl<ChildState, ChildAction> ScopedStore<ChildState, ChildAction> {
    /// The child state snapshot taken at derivation, if presented
    #[must_use]
    pub const fn state(&self) -> Option<&ChildState> {
        self.state.as_ref()
    }

    /// Whether the child was presented at derivation time
    #[must_use]
    pub const fn is_presented(&self) -> bool {
        self.state.is_some()
    }

    /// Send a child action to the parent store
    ///
    /// The action is rewrapped as `embed(PresentationAction::Presented(action))`
    /// and forwarded through the parent's queue.
    pub async fn send(&self, action: ChildAction) {
        (self.forward)(PresentationAction::Presented(action)).await;
    }

    /// Ask the parent to remove the presented child
    ///
    /// Forwards `embed(PresentationAction::Dismiss)`.
    pub async fn dismiss(&self) {
        (self.forward)(PresentationAction::Dismiss).await;
    }
}

impl<ChildState: std::fmt::Debug, ChildAction> std::fmt::Debug
    for ScopedStore<ChildState, ChildAction>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Derive a scoped store for a case-typed destination child
///
/// `destination` walks the parent state to the destination slot; `case`
/// extracts the child payload only when the slot holds the scoped case, so
/// the view's `state` is `None` whenever the destination is absent or holds a
/// different case. `embed` rebuilds the parent action that carries the
/// child's presentation envelope.
///
/// # Example
///
/// ```ignore
/// let compose = scope_to_destination(
///     &store,
///     |s: &InboxState| s.destination.as_ref(),
///     |d| match d {
///         Destination::Compose(child) => Some(child),
///     },
///     InboxAction::Destination,
/// )
/// .await;
///
/// if let Some(child) = compose.state() {
///     println!("draft: {}", child.draft);
/// }
/// compose.send(ComposeAction::SaveButtonTapped).await;
/// ```
pub async fn scope_to_destination<S, A, E, R, D, ChildState, ChildAction>(
    store: &Store<S, A, E, R>,
    destination: impl Fn(&S) -> Option<&D>,
    case: impl Fn(&D) -> Option<&ChildState>,
    embed: impl Fn(PresentationAction<ChildAction>) -> A + Send + Sync + 'static,
) -> ScopedStore<ChildState, ChildAction>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    ChildState: Clone,
    ChildAction: Send + 'static,
{
    let state = store
        .state(|s| destination(s).and_then(|d| case(d)).cloned())
        .await;

    ScopedStore {
        state,
        forward: forwarder(store, embed),
    }
}

/// Derive a scoped store for an optional child (no case filtering)
///
/// `state` is simply the value at the child slot; non-`None` means presented.
pub async fn scope_to_optional<S, A, E, R, ChildState, ChildAction>(
    store: &Store<S, A, E, R>,
    child: impl Fn(&S) -> Option<&ChildState>,
    embed: impl Fn(PresentationAction<ChildAction>) -> A + Send + Sync + 'static,
) -> ScopedStore<ChildState, ChildAction>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    ChildState: Clone,
    ChildAction: Send + 'static,
{
    let state = store.state(|s| child(s).cloned()).await;

    ScopedStore {
        state,
        forward: forwarder(store, embed),
    }
}

fn forwarder<S, A, E, R, ChildAction>(
    store: &Store<S, A, E, R>,
    embed: impl Fn(PresentationAction<ChildAction>) -> A + Send + Sync + 'static,
) -> ParentForward<ChildAction>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    ChildAction: Send + 'static,
{
    let store = store.clone();
    Arc::new(move |presentation| {
        let store = store.clone();
        let action = embed(presentation);
        Box::pin(async move {
            if let Err(error) = store.send(action).await {
                tracing::debug!(error = %error, "Scoped store dropped action");
            }
        })
    })
}
