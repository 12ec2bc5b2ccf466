//! The Store - runtime coordinator for a reducer
//!
//! The store manages the action queue, state commits, listener notification
//! and effect interpretation. Its discipline is single-consumer: exactly one
//! drain loop applies the reducer at a time, and any dispatch that arrives
//! while a drain is in progress enqueues instead of re-entering the reducer.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use statecraft_core::effect::{
    Dispatcher, Effect, SubscriptionId, SubscriptionSetup, Teardown,
};
use statecraft_core::reducer::Reducer;
use tokio::sync::{RwLock, broadcast};

use crate::error::StoreError;

/// Listener invoked after every committed state change
type Listener<S> = Arc<dyn Fn(&S) + Send + Sync + 'static>;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(60));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel (actions buffered per
    /// observer before lagging)
    pub broadcast_capacity: usize,
    /// Timeout used by [`Store::shutdown`]
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            shutdown_timeout,
        }
    }

    /// Set the action broadcast channel capacity
    ///
    /// Increase when many slow observers are attached.
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the timeout used by [`Store::shutdown`]
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// RAII guard counting an in-flight effect; decrements on drop so the count
/// stays accurate even when effect work panics
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle returned by [`Store::subscribe`]
///
/// Unsubscribing is idempotent: calling [`unsubscribe`](Self::unsubscribe)
/// twice, or after the store is gone, is a no-op.
pub struct StateSubscription<S> {
    id: u64,
    listeners: Arc<Mutex<Vec<(u64, Listener<S>)>>>,
}

impl<S> StateSubscription<S> {
    /// Remove the listener this subscription registered
    pub fn unsubscribe(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}

impl<S> std::fmt::Debug for StateSubscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (behind `RwLock`, written only by the drain loop)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies, never mutated by the store)
/// 4. Effect interpretation (with feedback loop through the action queue)
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
///
/// # Dispatch discipline
///
/// `send` is a two-phase operation: the action is enqueued into the mailbox,
/// then a drain loop (one per store at a time) pops actions FIFO, applies the
/// reducer under the state write lock, commits, notifies listeners, and hands
/// the returned effect to the interpreter. An effect that dispatches while a
/// drain is active enqueues and returns; the active drainer picks the action
/// up. Reducer application is therefore never reentrant.
///
/// # Failure semantics
///
/// Reducers must not panic; a panicking reducer propagates uncaught (fail
/// loud) because continuing with a half-applied commit would be ambiguous.
/// Effect work runs in spawned tasks, so its panics are isolated from the
/// store.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    config: StoreConfig,
    mailbox: Arc<Mutex<VecDeque<A>>>,
    draining: Arc<AtomicBool>,
    listeners: Arc<Mutex<Vec<(u64, Listener<S>)>>>,
    listener_seq: Arc<AtomicU64>,
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, Teardown>>>,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Broadcast of actions produced by effects, for observers (request
    /// completion waiters, streaming surfaces). Actions sent directly via
    /// `send` are not broadcast.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// Uses the default [`StoreConfig`].
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_config(initial_state, reducer, environment, StoreConfig::default())
    }

    /// Create a new store with custom configuration
    #[must_use]
    pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
        let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            config,
            mailbox: Arc::new(Mutex::new(VecDeque::new())),
            draining: Arc::new(AtomicBool::new(false)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            listener_seq: Arc::new(AtomicU64::new(0)),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Send an action to the store
    ///
    /// Looks synchronous to the caller but is internally two-phase: the
    /// action is enqueued, then drained in FIFO order by whichever caller
    /// currently owns the drain loop. When this call returns, the action has
    /// either been applied or handed to an active drainer that will apply it
    /// before going idle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions.total").increment(1);
        self.lock_mailbox().push_back(action);
        self.drain().await;
        Ok(())
    }

    /// Read current state via a closure
    ///
    /// Access state through a closure to ensure the lock is released
    /// promptly:
    ///
    /// ```ignore
    /// let message_count = store.state(|s| s.messages.len()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Register a listener invoked after every committed state change
    ///
    /// Returns a [`StateSubscription`] whose `unsubscribe` is idempotent.
    pub fn subscribe<F>(&self, listener: F) -> StateSubscription<S>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = self.listener_seq.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        StateSubscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    /// Subscribe to actions produced by effects
    ///
    /// Returns a receiver that gets a clone of every action an effect
    /// dispatches back into this store. Actions sent directly via
    /// [`send`](Self::send) are not broadcast. A lagging receiver skips old
    /// actions.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Send an action and wait for a matching effect-produced action
    ///
    /// Designed for request/response flows: subscribes to the action
    /// broadcast before sending (no race), then returns the first
    /// effect-produced action matching `predicate`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: no matching action within `timeout`
    /// - [`StoreError::ChannelClosed`]: broadcast closed (store going away)
    /// - [`StoreError::ShutdownInProgress`]: store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        // Subscribe BEFORE sending to avoid missing a fast reply
        let mut rx = self.action_broadcast.subscribe();

        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Keep waiting; if the terminal action was dropped
                        // the timeout catches it.
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Initiate graceful shutdown with the configured timeout
    ///
    /// 1. Sets the shutdown flag (new actions are rejected)
    /// 2. Tears down all live subscriptions
    /// 3. Waits for in-flight effects to complete
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.shutdown_within(self.config.shutdown_timeout).await
    }

    /// Initiate graceful shutdown with an explicit timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown_within(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        metrics::counter!("store.shutdown.initiated").increment(1);

        self.shutdown.store(true, Ordering::Release);

        // Stop long-lived work first so pending effects can actually drain
        self.teardown_all_subscriptions();

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(100);

        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);

            if pending == 0 {
                tracing::info!("All effects completed, shutdown successful");
                metrics::counter!("store.shutdown.completed").increment(1);
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(
                    pending_effects = pending,
                    "Shutdown timeout: {} effects still running",
                    pending
                );
                metrics::counter!("store.shutdown.timeout").increment(1);
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tracing::debug!(
                pending_effects = pending,
                elapsed_ms = start.elapsed().as_millis(),
                "Waiting for effects to complete"
            );

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Drain the mailbox as the single consumer
    ///
    /// At most one drain loop runs per store. A caller that fails to acquire
    /// the drain flag returns immediately; its enqueued action is processed
    /// by the active drainer. After releasing the flag the mailbox is
    /// re-checked so an action enqueued during release is not stranded.
    async fn drain(&self) {
        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // Another caller owns the drain loop
                return;
            }

            loop {
                // The mailbox guard must not be held across the awaits
                // below, so pop in its own statement.
                let Some(action) = self.lock_mailbox().pop_front() else {
                    break;
                };

                let effect = {
                    let mut state = self.state.write().await;
                    let span = tracing::debug_span!("reducer_execution");
                    let _enter = span.enter();

                    let start = std::time::Instant::now();
                    let effect = self.reducer.reduce(&mut state, action, &self.environment);
                    metrics::histogram!("store.reducer.duration_seconds")
                        .record(start.elapsed().as_secs_f64());
                    effect
                };

                self.notify_listeners().await;
                self.interpret(effect);
            }

            self.draining.store(false, Ordering::Release);

            if self.lock_mailbox().is_empty() {
                return;
            }
            // An action arrived between the last pop and the flag release;
            // loop to try to re-acquire the drain.
        }
    }

    /// Invoke every registered listener with the freshly committed state
    async fn notify_listeners(&self) {
        let listeners: Vec<Listener<S>> = {
            let guard = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            guard.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        if listeners.is_empty() {
            return;
        }

        let state = self.state.read().await;
        for listener in listeners {
            listener(&state);
        }
    }

    /// Execute an effect description
    ///
    /// Runs on the drain loop. Asynchronous variants (`Run`,
    /// `FireAndForget`, `AfterDelay`) are spawned with a [`PendingGuard`] so
    /// the in-flight count survives panics; `Subscription` and `Cancel` are
    /// handled inline so teardown ordering guarantees hold; `Batch` fans out
    /// with no ordering between children.
    fn interpret(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {
                tracing::trace!("Executing Effect::None (no-op)");
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Run(work) => {
                tracing::trace!("Executing Effect::Run");
                metrics::counter!("store.effects.executed", "type" => "run").increment(1);

                let guard = PendingGuard::acquire(&self.pending_effects);
                let dispatcher = self.effect_dispatcher();

                tokio::spawn(async move {
                    let _guard = guard;
                    work(dispatcher).await;
                });
            },
            Effect::FireAndForget(work) => {
                tracing::trace!("Executing Effect::FireAndForget");
                metrics::counter!("store.effects.executed", "type" => "fire_and_forget")
                    .increment(1);

                let guard = PendingGuard::acquire(&self.pending_effects);

                // Dispatches are discarded and failures drop with the task
                tokio::spawn(async move {
                    let _guard = guard;
                    work(Dispatcher::null()).await;
                });
            },
            Effect::Batch(effects) => {
                tracing::trace!("Executing Effect::Batch with {} effects", effects.len());
                metrics::counter!("store.effects.executed", "type" => "batch").increment(1);

                for effect in effects {
                    self.interpret(effect);
                }
            },
            Effect::AfterDelay { duration, work } => {
                tracing::trace!("Executing Effect::AfterDelay (duration: {:?})", duration);
                metrics::counter!("store.effects.executed", "type" => "after_delay").increment(1);

                let guard = PendingGuard::acquire(&self.pending_effects);
                let dispatcher = self.effect_dispatcher();

                tokio::spawn(async move {
                    let _guard = guard;
                    tokio::time::sleep(duration).await;
                    work(dispatcher).await;
                });
            },
            Effect::Subscription { id, setup } => self.register_subscription(id, setup),
            Effect::Cancel(id) => self.cancel_subscription(&id),
        }
    }

    /// Register a subscription, superseding any active owner of the id
    ///
    /// The prior teardown runs exactly once, before the new setup. A setup
    /// failure leaves the id unregistered and the store running.
    fn register_subscription(&self, id: SubscriptionId, setup: SubscriptionSetup<A>) {
        metrics::counter!("store.effects.executed", "type" => "subscription").increment(1);

        let prior = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(teardown) = prior {
            tracing::debug!(subscription = %id, "Superseding active subscription");
            teardown();
        }

        match setup(self.effect_dispatcher()) {
            Ok(teardown) => {
                self.subscriptions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id, teardown);
            },
            Err(error) => {
                tracing::warn!(subscription = %id, error = %error, "Subscription setup failed");
                metrics::counter!("store.subscriptions.setup_failed").increment(1);
            },
        }
    }

    /// Tear down the subscription under `id`; a no-op when none is active
    fn cancel_subscription(&self, id: &SubscriptionId) {
        metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);

        let teardown = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match teardown {
            Some(teardown) => {
                tracing::debug!(subscription = %id, "Tearing down subscription");
                teardown();
            },
            None => {
                tracing::trace!(subscription = %id, "Cancel on inactive id is a no-op");
            },
        }
    }

    /// Tear down every live subscription (shutdown path)
    fn teardown_all_subscriptions(&self) {
        let teardowns: Vec<(SubscriptionId, Teardown)> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (id, teardown) in teardowns {
            tracing::debug!(subscription = %id, "Tearing down subscription at shutdown");
            teardown();
        }
    }

    /// Build the dispatcher handed to effect work
    ///
    /// Dispatched actions are broadcast to observers and re-enter the queue
    /// through `send`, so they can never re-enter an in-progress reducer
    /// application.
    fn effect_dispatcher(&self) -> Dispatcher<A> {
        let store = self.clone();
        Dispatcher::sink(move |action: A| {
            let store = store.clone();
            Box::pin(async move {
                let _ = store.action_broadcast.send(action.clone());
                if let Err(error) = store.send(action).await {
                    tracing::debug!(error = %error, "Dropped effect-produced action");
                }
            })
        })
    }

    fn lock_mailbox(&self) -> std::sync::MutexGuard<'_, VecDeque<A>> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            config: self.config.clone(),
            mailbox: Arc::clone(&self.mailbox),
            draining: Arc::clone(&self.draining),
            listeners: Arc::clone(&self.listeners),
            listener_seq: Arc::clone(&self.listener_seq),
            subscriptions: Arc::clone(&self.subscriptions),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use statecraft_core::effect::SubscriptionError;

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        log: Vec<i32>,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Record(i32),
        Kickoff,
        DelayedIncrement,
        ParallelIncrements,
        AnalyticsPing,
        SlowEffect,
        StartTicker,
        BrokenTicker,
        StopTicker,
        LoadTapped,
        LoadCompleted(i32),
    }

    #[derive(Clone, Default)]
    struct TestEnv {
        teardowns: Arc<AtomicUsize>,
    }

    #[derive(Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effect<Self::Action> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    Effect::none()
                },
                TestAction::Record(n) => {
                    state.log.push(n);
                    Effect::none()
                },
                TestAction::Kickoff => Effect::run(|dispatch| async move {
                    dispatch.send(TestAction::Record(1)).await;
                    dispatch.send(TestAction::Record(2)).await;
                    dispatch.send(TestAction::Record(3)).await;
                }),
                TestAction::DelayedIncrement => {
                    Effect::after_delay(Duration::from_millis(10), |dispatch| async move {
                        dispatch.send(TestAction::Increment).await;
                    })
                },
                TestAction::ParallelIncrements => Effect::batch(vec![
                    Effect::send(TestAction::Increment),
                    Effect::send(TestAction::Increment),
                    Effect::send(TestAction::Increment),
                ]),
                TestAction::AnalyticsPing => Effect::fire_and_forget(|dispatch| async move {
                    // Discarded by contract
                    dispatch.send(TestAction::Increment).await;
                }),
                TestAction::SlowEffect => Effect::run(|_dispatch| async move {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }),
                TestAction::StartTicker => {
                    let teardowns = Arc::clone(&env.teardowns);
                    Effect::subscription("ticker", move |_dispatch| {
                        let teardown: Teardown = Box::new(move || {
                            teardowns.fetch_add(1, Ordering::SeqCst);
                        });
                        Ok(teardown)
                    })
                },
                TestAction::BrokenTicker => Effect::subscription("ticker", |_dispatch| {
                    Err(SubscriptionError::new("boom"))
                }),
                TestAction::StopTicker => Effect::cancel("ticker"),
                TestAction::LoadTapped => Effect::run(|dispatch| async move {
                    dispatch.send(TestAction::LoadCompleted(42)).await;
                }),
                TestAction::LoadCompleted(n) => {
                    state.value = n;
                    Effect::none()
                },
            }
        }
    }

    fn test_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv::default())
    }

    #[tokio::test]
    async fn store_creation_exposes_initial_state() {
        let store = test_store();
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn send_applies_action_before_returning() {
        let store = test_store();
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn actions_drain_in_fifo_order() {
        let store = test_store();
        store.send(TestAction::Kickoff).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.state(|s| s.log.clone()).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn effect_none_dispatches_nothing() {
        let store = test_store();
        let mut rx = store.subscribe_actions();

        store.send(TestAction::Record(9)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(store.state(|s| s.log.clone()).await, vec![9]);
    }

    #[tokio::test]
    async fn delayed_effect_does_not_fire_early() {
        let store = test_store();
        store.send(TestAction::DelayedIncrement).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn batch_starts_all_children() {
        let store = test_store();
        store.send(TestAction::ParallelIncrements).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.state(|s| s.value).await, 3);
    }

    #[tokio::test]
    async fn fire_and_forget_dispatches_are_discarded() {
        let store = test_store();
        store.send(TestAction::AnalyticsPing).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn concurrent_sends_all_apply() {
        let store = test_store();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.send(TestAction::Increment).await.unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        // Every send either drained its own action or handed it to the
        // active drainer; give the tail a moment to settle.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.state(|s| s.value).await, 10);
    }

    #[tokio::test]
    async fn listeners_run_after_every_commit() {
        let store = test_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);

        let subscription = store.subscribe(move |_state: &TestState| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        subscription.unsubscribe();
        subscription.unsubscribe(); // double-unsubscribe is a no-op

        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscription_supersede_tears_down_prior_owner() {
        let store = test_store();
        let env_teardowns = store.environment.teardowns.clone();

        store.send(TestAction::StartTicker).await.unwrap();
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 0);

        // Re-registering under the same id tears down the first owner
        store.send(TestAction::StartTicker).await.unwrap();
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 1);

        store.send(TestAction::StopTicker).await.unwrap();
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let store = test_store();
        let env_teardowns = store.environment.teardowns.clone();

        // Cancel on a never-active id
        store.send(TestAction::StopTicker).await.unwrap();
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 0);

        store.send(TestAction::StartTicker).await.unwrap();
        store.send(TestAction::StopTicker).await.unwrap();
        store.send(TestAction::StopTicker).await.unwrap();
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_subscription_setup_does_not_crash_the_store() {
        let store = test_store();
        let env_teardowns = store.environment.teardowns.clone();

        store.send(TestAction::BrokenTicker).await.unwrap();

        // Store still processes actions, and no teardown was registered
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);

        store.send(TestAction::StopTicker).await.unwrap();
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broken_setup_supersedes_previous_owner() {
        let store = test_store();
        let env_teardowns = store.environment.teardowns.clone();

        store.send(TestAction::StartTicker).await.unwrap();
        store.send(TestAction::BrokenTicker).await.unwrap();

        // The healthy owner was torn down exactly once before the failing
        // setup ran
        assert_eq!(env_teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_and_wait_for_resolves_on_effect_action() {
        let store = test_store();

        let result = store
            .send_and_wait_for(
                TestAction::LoadTapped,
                |a| matches!(a, TestAction::LoadCompleted(_)),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert!(matches!(result, TestAction::LoadCompleted(42)));
        assert_eq!(store.state(|s| s.value).await, 42);
    }

    #[tokio::test]
    async fn send_and_wait_for_times_out_without_match() {
        let store = test_store();

        let result = store
            .send_and_wait_for(
                TestAction::Increment,
                |a| matches!(a, TestAction::LoadCompleted(_)),
                Duration::from_millis(50),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions_and_tears_down_subscriptions() {
        let store = test_store();
        let env_teardowns = store.environment.teardowns.clone();

        store.send(TestAction::StartTicker).await.unwrap();
        store.shutdown().await.unwrap();

        assert_eq!(env_teardowns.load(Ordering::SeqCst), 1);
        assert!(matches!(
            store.send(TestAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }

    #[tokio::test]
    async fn shutdown_times_out_with_slow_effects() {
        let store = test_store();

        store.send(TestAction::SlowEffect).await.unwrap();
        let result = store.shutdown_within(Duration::from_millis(50)).await;

        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
    }

    #[tokio::test]
    async fn store_clone_shares_state() {
        let store1 = test_store();
        let store2 = store1.clone();

        store1.send(TestAction::Increment).await.unwrap();
        assert_eq!(store2.state(|s| s.value).await, 1);

        store2.send(TestAction::Increment).await.unwrap();
        assert_eq!(store1.state(|s| s.value).await, 2);
    }
}
