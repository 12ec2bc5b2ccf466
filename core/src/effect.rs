//! Effect algebra - inert, replayable descriptions of deferred work
//!
//! Effects are NOT executed when constructed. They are values describing what
//! should happen, returned from reducers and interpreted by the store runtime
//! (or executed eagerly by the test harness). The interpreter is a single
//! exhaustive match over the variants; there is no dynamic dispatch.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

/// Boxed future produced by effect work
pub type EffectFuture = BoxFuture<'static, ()>;

/// A unit of asynchronous effect work
///
/// The work receives a [`Dispatcher`] and may send zero or more actions
/// through it before completing.
pub type EffectWork<A> = Box<dyn FnOnce(Dispatcher<A>) -> EffectFuture + Send + 'static>;

/// Teardown callback returned by a subscription's setup
///
/// Invoked exactly once: when the subscription is cancelled, superseded by a
/// new registration under the same id, or the owning store shuts down.
pub type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Synchronous setup for a long-lived subscription effect
///
/// Runs on the store's drain loop. Returns the teardown on success; a failure
/// must not crash the interpreter, so it is reported as a value (setup may
/// additionally dispatch an error action before returning).
pub type SubscriptionSetup<A> =
    Box<dyn FnOnce(Dispatcher<A>) -> Result<Teardown, SubscriptionError> + Send + 'static>;

/// Stable identifier for a long-lived subscription effect
///
/// Subscription ids are single-owner: registering a new subscription under an
/// already-active id tears the prior one down first.
///
/// # Example
///
/// ```
/// use statecraft_core::SubscriptionId;
///
/// let id = SubscriptionId::new("draft-autosave");
/// assert_eq!(id.as_str(), "draft-autosave");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Create a subscription id from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Error reported by a subscription setup that failed synchronously
///
/// The interpreter logs the failure and treats the subscription as never
/// registered; it does not crash, retry, or tear anything down.
#[derive(Debug, Clone, Error)]
#[error("subscription setup failed: {0}")]
pub struct SubscriptionError(String);

impl SubscriptionError {
    /// Create a setup error with the given message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Dispatch capability handed to effect work
///
/// Where dispatched actions go depends on who interprets the effect:
///
/// - a live store hands out a **sink** that routes actions back into its own
///   queue (so they drain in arrival order, never reentrantly)
/// - the test harness hands out a **queued** dispatcher that collects actions
///   into a pending queue for assertion
/// - fire-and-forget work receives a **null** dispatcher that discards
///   everything
pub struct Dispatcher<A> {
    kind: DispatcherKind<A>,
}

enum DispatcherKind<A> {
    /// Route actions into a store's queue (production)
    Sink(Arc<dyn Fn(A) -> EffectFuture + Send + Sync + 'static>),

    /// Collect actions for manual processing (test harness)
    Queued(Arc<Mutex<VecDeque<A>>>),

    /// Discard actions (fire-and-forget work)
    Null,
}

impl<A> Dispatcher<A> {
    /// Create a dispatcher that routes each action through the given closure
    #[must_use]
    pub fn sink<F>(route: F) -> Self
    where
        F: Fn(A) -> EffectFuture + Send + Sync + 'static,
    {
        Self {
            kind: DispatcherKind::Sink(Arc::new(route)),
        }
    }

    /// Create a dispatcher that pushes actions onto the given queue
    #[must_use]
    pub fn queued(queue: Arc<Mutex<VecDeque<A>>>) -> Self {
        Self {
            kind: DispatcherKind::Queued(queue),
        }
    }

    /// Create a dispatcher that discards every action
    #[must_use]
    pub const fn null() -> Self {
        Self {
            kind: DispatcherKind::Null,
        }
    }

    /// Send an action to whatever interprets this dispatcher
    ///
    /// May be called zero or more times by a single unit of effect work.
    pub async fn send(&self, action: A) {
        match &self.kind {
            DispatcherKind::Sink(route) => route(action).await,
            DispatcherKind::Queued(queue) => {
                queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(action);
            },
            DispatcherKind::Null => {
                tracing::trace!("Discarding action dispatched by fire-and-forget work");
                drop(action);
            },
        }
    }

    /// Adapt this dispatcher to accept child actions
    ///
    /// Every action sent through the returned dispatcher is mapped with
    /// `embed` before being forwarded here. This is how child effects are
    /// rewrapped into a parent's action type (see [`Effect::map`]).
    #[must_use]
    pub fn contramap<B>(self, embed: impl Fn(B) -> A + Send + Sync + 'static) -> Dispatcher<B>
    where
        A: Send + 'static,
        B: 'static,
    {
        Dispatcher::sink(move |action| {
            let parent = self.clone();
            let mapped = embed(action);
            Box::pin(async move { parent.send(mapped).await })
        })
    }
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            DispatcherKind::Sink(route) => DispatcherKind::Sink(Arc::clone(route)),
            DispatcherKind::Queued(queue) => DispatcherKind::Queued(Arc::clone(queue)),
            DispatcherKind::Null => DispatcherKind::Null,
        };
        Self { kind }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DispatcherKind::Sink(_) => write!(f, "Dispatcher::Sink"),
            DispatcherKind::Queued(_) => write!(f, "Dispatcher::Queued"),
            DispatcherKind::Null => write!(f, "Dispatcher::Null"),
        }
    }
}

/// Effect type - describes deferred work to be interpreted by a store
///
/// An `Effect` is immutable once constructed and is interpreted at most
/// according to its variant's cardinality: `None` dispatches nothing, ever;
/// work payloads are `FnOnce` so they cannot run twice.
///
/// # Type Parameters
///
/// - `A`: The action type effects can feed back into their store
pub enum Effect<A> {
    /// True no-op; the interpreter never invokes dispatch for it
    None,

    /// Asynchronous work that may dispatch any number of actions
    Run(EffectWork<A>),

    /// Asynchronous work whose completion and dispatches are discarded
    FireAndForget(EffectWork<A>),

    /// Independent child effects, started concurrently with no ordering
    /// between them
    Batch(Vec<Effect<A>>),

    /// Work that must not start before `duration` has elapsed on the host
    /// clock
    AfterDelay {
        /// How long to wait before starting the work
        duration: Duration,
        /// The work to run once the delay elapses
        work: EffectWork<A>,
    },

    /// Long-lived work registered under a stable id; `setup` returns the
    /// teardown invoked on cancel, supersede, or shutdown
    Subscription {
        /// Single-owner key for the subscription
        id: SubscriptionId,
        /// Synchronous registration returning the teardown
        setup: SubscriptionSetup<A>,
    },

    /// Tear down the subscription registered under `id`, if any
    Cancel(SubscriptionId),
}

impl<A> Effect<A> {
    /// An effect that does nothing
    #[must_use]
    pub const fn none() -> Self {
        Effect::None
    }

    /// Asynchronous work that may dispatch actions back into the store
    ///
    /// # Example
    ///
    /// ```ignore
    /// Effect::run(|dispatch| async move {
    ///     let items = env.client.fetch().await;
    ///     dispatch.send(Action::LoadCompleted(items)).await;
    /// })
    /// ```
    pub fn run<F, Fut>(work: F) -> Self
    where
        F: FnOnce(Dispatcher<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Effect::Run(Box::new(move |dispatcher| Box::pin(work(dispatcher))))
    }

    /// Asynchronous work whose outcome the store ignores
    ///
    /// The work receives a discarding dispatcher; anything it sends, and any
    /// failure inside it, is dropped. Intended for analytics-style side
    /// effects.
    pub fn fire_and_forget<F, Fut>(work: F) -> Self
    where
        F: FnOnce(Dispatcher<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Effect::FireAndForget(Box::new(move |dispatcher| Box::pin(work(dispatcher))))
    }

    /// Run all child effects independently and concurrently
    ///
    /// No ordering is imposed between children; each child's own internal
    /// dispatch order is preserved.
    #[must_use]
    pub fn batch(effects: Vec<Effect<A>>) -> Self {
        Effect::Batch(effects)
    }

    /// Schedule work after a delay on the host clock
    ///
    /// The production interpreter uses tokio time; the test harness drives a
    /// fake clock, so the work fires under `advance_time` without waiting.
    pub fn after_delay<F, Fut>(duration: Duration, work: F) -> Self
    where
        F: FnOnce(Dispatcher<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Effect::AfterDelay {
            duration,
            work: Box::new(move |dispatcher| Box::pin(work(dispatcher))),
        }
    }

    /// Register long-lived work under a stable id
    ///
    /// Registering under an already-active id invokes the prior teardown
    /// exactly once before `setup` runs. A setup failure is reported as a
    /// value and must not crash the interpreter.
    pub fn subscription<I, F>(id: I, setup: F) -> Self
    where
        I: Into<SubscriptionId>,
        F: FnOnce(Dispatcher<A>) -> Result<Teardown, SubscriptionError> + Send + 'static,
    {
        Effect::Subscription {
            id: id.into(),
            setup: Box::new(setup),
        }
    }

    /// Tear down the subscription registered under `id`
    ///
    /// A no-op when no subscription is active under the id; calling it twice
    /// has no observable effect the second time.
    pub fn cancel<I: Into<SubscriptionId>>(id: I) -> Self {
        Effect::Cancel(id.into())
    }

    /// Whether this effect is the no-op
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }
}

impl<A: Send + 'static> Effect<A> {
    /// Convenience for work that dispatches exactly one action
    pub fn send(action: A) -> Self {
        Effect::run(move |dispatch| async move { dispatch.send(action).await })
    }

    /// Rewrap every action this effect dispatches into another action type
    ///
    /// Structure is preserved: batches stay batches, delays keep their
    /// duration, subscriptions keep their id. This is how a parent reducer
    /// embeds a child reducer's effect into its own action space.
    #[must_use]
    pub fn map<B, F>(self, embed: F) -> Effect<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + Clone + 'static,
    {
        match self {
            Effect::None => Effect::None,
            Effect::Run(work) => {
                Effect::Run(Box::new(move |dispatcher: Dispatcher<B>| {
                    work(dispatcher.contramap(embed))
                }))
            },
            Effect::FireAndForget(work) => {
                Effect::FireAndForget(Box::new(move |dispatcher: Dispatcher<B>| {
                    work(dispatcher.contramap(embed))
                }))
            },
            Effect::Batch(effects) => Effect::Batch(
                effects
                    .into_iter()
                    .map(|effect| effect.map(embed.clone()))
                    .collect(),
            ),
            Effect::AfterDelay { duration, work } => Effect::AfterDelay {
                duration,
                work: Box::new(move |dispatcher: Dispatcher<B>| {
                    work(dispatcher.contramap(embed))
                }),
            },
            Effect::Subscription { id, setup } => Effect::Subscription {
                id,
                setup: Box::new(move |dispatcher: Dispatcher<B>| {
                    setup(dispatcher.contramap(embed))
                }),
            },
            Effect::Cancel(id) => Effect::Cancel(id),
        }
    }
}

// Manual Debug implementation since work payloads don't implement Debug
impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Run(_) => write!(f, "Effect::Run(<work>)"),
            Effect::FireAndForget(_) => write!(f, "Effect::FireAndForget(<work>)"),
            Effect::Batch(effects) => f.debug_tuple("Effect::Batch").field(effects).finish(),
            Effect::AfterDelay { duration, .. } => f
                .debug_struct("Effect::AfterDelay")
                .field("duration", duration)
                .finish_non_exhaustive(),
            Effect::Subscription { id, .. } => f
                .debug_struct("Effect::Subscription")
                .field("id", id)
                .finish_non_exhaustive(),
            Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
        }
    }
}
