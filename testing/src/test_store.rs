//! Deterministic scenario harness for effect-driven reducers
//!
//! [`TestStore`] wraps a reducer - not a live store - and replays a feature's
//! behavior without a real event loop: effects execute eagerly on the calling
//! task, actions they dispatch are intercepted into a pending queue instead
//! of being auto-applied, and delayed work is driven by a fake clock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use statecraft_core::effect::{Dispatcher, Effect, EffectWork, SubscriptionId, Teardown};
use statecraft_core::reducer::Reducer;

/// Controls whether unconsumed effect-dispatched actions fail a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exhaustivity {
    /// Leftover pending actions are an error (the default)
    #[default]
    On,
    /// [`TestStore::assert_no_pending_actions`] is inert
    Off,
}

/// A delayed unit of work registered on the fake clock
struct Timer<A> {
    due: Duration,
    seq: u64,
    work: EffectWork<A>,
}

/// Deterministic test harness wrapping a reducer
///
/// # Example
///
/// ```ignore
/// let mut store = TestStore::new(InboxState::default(), InboxReducer, env);
///
/// let state = store.send(InboxAction::LoadTapped).await;
/// assert!(state.loading);
///
/// let state = store.receive(json!({ "type": "loadCompleted" })).await;
/// assert_eq!(state.messages.len(), 2);
///
/// store.assert_no_pending_actions();
/// ```
pub struct TestStore<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: S,
    reducer: R,
    environment: E,
    pending: Arc<Mutex<VecDeque<A>>>,
    timers: Vec<Timer<A>>,
    timer_seq: u64,
    now: Duration,
    subscriptions: HashMap<SubscriptionId, Teardown>,
    history: Vec<A>,
    exhaustivity: Exhaustivity,
}

impl<S, A, E, R> TestStore<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    A: Clone + std::fmt::Debug,
{
    /// Create a harness around an initial state, reducer, and environment
    ///
    /// The fake clock starts at zero and exhaustivity is on.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self {
            state: initial_state,
            reducer,
            environment,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            timers: Vec::new(),
            timer_seq: 0,
            now: Duration::ZERO,
            subscriptions: HashMap::new(),
            history: Vec::new(),
            exhaustivity: Exhaustivity::On,
        }
    }

    /// Change the exhaustivity mode
    pub const fn set_exhaustivity(&mut self, mode: Exhaustivity) {
        self.exhaustivity = mode;
    }

    /// Apply an action and execute its effect eagerly
    ///
    /// The reducer runs exactly once and its state commit is observable in
    /// the returned reference before any effect-dispatched action is applied:
    /// everything the effect dispatches lands in the pending queue, waiting
    /// for [`receive`](Self::receive).
    pub async fn send(&mut self, action: A) -> &S {
        self.apply(action).await;
        &self.state
    }

    /// Pop the next pending action, match it partially, and apply it
    ///
    /// Only fields present in `pattern` are compared against the serialized
    /// form of the action; unspecified fields are ignored. On a match the
    /// action's reducer transition is applied (and its effects execute
    /// eagerly, possibly queueing more actions).
    ///
    /// # Panics
    ///
    /// Panics with "no actions pending" when the queue is empty, and with
    /// "wrong action received" when the head does not match the pattern.
    #[allow(clippy::panic)] // Test harness failures are panics
    pub async fn receive(&mut self, pattern: Value) -> &S
    where
        A: Serialize,
    {
        let head = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let Some(action) = head else {
            panic!("receive: no actions pending (expected {pattern})");
        };

        let actual = serde_json::to_value(&action).unwrap_or(Value::Null);
        assert!(
            matches_partially(&pattern, &actual),
            "receive: wrong action received: expected {pattern}, got {actual}"
        );

        self.apply(action).await;
        &self.state
    }

    /// Advance the fake clock, firing every delayed effect due in the window
    ///
    /// Timers fire in due-time order (registration order on ties); their
    /// dispatches land in the pending queue. No real waiting happens.
    pub async fn advance_time(&mut self, duration: Duration) {
        let deadline = self.now + duration;

        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, timer)| timer.due <= deadline)
                .min_by_key(|(_, timer)| (timer.due, timer.seq))
                .map(|(index, _)| index);

            let Some(index) = next else {
                break;
            };

            let timer = self.timers.remove(index);
            self.now = timer.due.max(self.now);
            (timer.work)(self.queued_dispatcher()).await;
        }

        self.now = deadline;
    }

    /// Fail the test if effect-dispatched actions were never received
    ///
    /// Inert when exhaustivity is [`Exhaustivity::Off`].
    ///
    /// # Panics
    ///
    /// Panics with "leftover actions" when the pending queue is non-empty
    /// and exhaustivity is on.
    #[allow(clippy::panic)] // Test harness failures are panics
    pub fn assert_no_pending_actions(&self) {
        if self.exhaustivity == Exhaustivity::Off {
            return;
        }

        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        assert!(
            pending.is_empty(),
            "leftover actions: {} effect-dispatched action(s) were never received: {:?}",
            pending.len(),
            pending
        );
    }

    /// Read-only view of the current state
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// All actions applied so far, in application order
    #[must_use]
    pub fn history(&self) -> &[A] {
        &self.history
    }

    /// The fake clock's current reading
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Apply one action: reduce, commit, execute the returned effect
    async fn apply(&mut self, action: A) {
        self.history.push(action.clone());
        let effect = self
            .reducer
            .reduce(&mut self.state, action, &self.environment);
        self.execute(effect).await;
    }

    /// Execute an effect eagerly on the calling task
    ///
    /// Mirrors the production interpreter's semantics with test plumbing:
    /// dispatches are queued instead of fed back, delays become fake-clock
    /// timers, and the subscription registry keeps its single-owner rules.
    async fn execute(&mut self, effect: Effect<A>) {
        match effect {
            Effect::None => {},
            Effect::Run(work) => work(self.queued_dispatcher()).await,
            Effect::FireAndForget(work) => {
                // Dispatches are discarded by contract
                work(Dispatcher::null()).await;
            },
            Effect::Batch(effects) => {
                for effect in effects {
                    Box::pin(self.execute(effect)).await;
                }
            },
            Effect::AfterDelay { duration, work } => {
                self.timer_seq += 1;
                self.timers.push(Timer {
                    due: self.now + duration,
                    seq: self.timer_seq,
                    work,
                });
            },
            Effect::Subscription { id, setup } => {
                if let Some(teardown) = self.subscriptions.remove(&id) {
                    teardown();
                }
                match setup(self.queued_dispatcher()) {
                    Ok(teardown) => {
                        self.subscriptions.insert(id, teardown);
                    },
                    Err(error) => {
                        tracing::warn!(subscription = %id, error = %error, "Subscription setup failed");
                    },
                }
            },
            Effect::Cancel(id) => {
                if let Some(teardown) = self.subscriptions.remove(&id) {
                    teardown();
                }
            },
        }
    }

    fn queued_dispatcher(&self) -> Dispatcher<A> {
        Dispatcher::queued(Arc::clone(&self.pending))
    }
}

/// Partial structural matching: every field present in `pattern` must match
/// the corresponding field of `actual`; fields absent from the pattern are
/// ignored. Arrays compare element-wise with the same rule.
fn matches_partially(pattern: &Value, actual: &Value) -> bool {
    match (pattern, actual) {
        (Value::Object(pattern), Value::Object(actual)) => pattern.iter().all(|(key, expected)| {
            actual
                .get(key)
                .is_some_and(|found| matches_partially(expected, found))
        }),
        (Value::Array(pattern), Value::Array(actual)) => {
            pattern.len() == actual.len()
                && pattern
                    .iter()
                    .zip(actual)
                    .all(|(expected, found)| matches_partially(expected, found))
        },
        _ => pattern == actual,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use statecraft_core::effect::SubscriptionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    struct TestState {
        count: i64,
        ticks: u32,
        loading: bool,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(tag = "type", content = "action", rename_all = "camelCase")]
    enum TestAction {
        Increment,
        NoOp,
        LoadTapped,
        LoadCompleted { value: i64, source: String },
        ScheduleTick,
        ScheduleTwoTicks,
        Ticked,
        StartTicker,
        BrokenTicker,
        StopTicker,
        AnalyticsPing,
    }

    #[derive(Clone, Default)]
    struct TestEnv {
        teardowns: Arc<AtomicUsize>,
    }

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
                    state.count += 1;
                    Effect::none()
                },
                TestAction::NoOp => Effect::none(),
                TestAction::LoadTapped => {
                    state.loading = true;
                    Effect::run(|dispatch| async move {
                        dispatch
                            .send(TestAction::LoadCompleted {
                                value: 42,
                                source: "network".into(),
                            })
                            .await;
                    })
                },
                TestAction::LoadCompleted { value, .. } => {
                    state.loading = false;
                    state.count = value;
                    Effect::none()
                },
                TestAction::ScheduleTick => {
                    Effect::after_delay(Duration::from_secs(2), |dispatch| async move {
                        dispatch.send(TestAction::Ticked).await;
                    })
                },
                TestAction::ScheduleTwoTicks => Effect::batch(vec![
                    Effect::after_delay(Duration::from_secs(3), |dispatch| async move {
                        dispatch.send(TestAction::Increment).await;
                    }),
                    Effect::after_delay(Duration::from_secs(1), |dispatch| async move {
                        dispatch.send(TestAction::Ticked).await;
                    }),
                ]),
                TestAction::Ticked => {
                    state.ticks += 1;
                    Effect::none()
                },
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
                TestAction::AnalyticsPing => Effect::fire_and_forget(|dispatch| async move {
                    dispatch.send(TestAction::Increment).await;
                }),
            }
        }
    }

    fn harness() -> TestStore<TestState, TestAction, TestEnv, TestReducer> {
        TestStore::new(TestState::default(), TestReducer, TestEnv::default())
    }

    #[tokio::test]
    async fn send_commits_synchronously() {
        let mut store = harness();

        store.send(TestAction::Increment).await;
        let state = store.send(TestAction::Increment).await;

        assert_eq!(state.count, 2);
        store.assert_no_pending_actions();
    }

    #[tokio::test]
    async fn effect_dispatches_queue_instead_of_auto_applying() {
        let mut store = harness();

        let state = store.send(TestAction::LoadTapped).await;
        assert!(state.loading);
        assert_eq!(state.count, 0); // not applied yet

        let state = store.receive(json!({ "type": "loadCompleted" })).await;
        assert_eq!(state.count, 42);
        assert!(!state.loading);

        store.assert_no_pending_actions();
    }

    #[tokio::test]
    #[should_panic(expected = "no actions pending")]
    async fn receive_with_empty_queue_panics() {
        let mut store = harness();

        store.send(TestAction::LoadTapped).await;
        store.receive(json!({ "type": "loadCompleted" })).await;
        // Nothing pending anymore
        store.receive(json!({ "type": "loadCompleted" })).await;
    }

    #[tokio::test]
    #[should_panic(expected = "wrong action received")]
    async fn receive_with_mismatched_head_panics() {
        let mut store = harness();

        store.send(TestAction::LoadTapped).await;
        store.receive(json!({ "type": "ticked" })).await;
    }

    #[tokio::test]
    async fn receive_matches_partially_on_present_fields_only() {
        let mut store = harness();

        store.send(TestAction::LoadTapped).await;
        let state = store
            .receive(json!({
                "type": "loadCompleted",
                "action": { "value": 42 }
            }))
            .await;

        assert_eq!(state.count, 42);
    }

    #[tokio::test]
    #[should_panic(expected = "wrong action received")]
    async fn receive_rejects_mismatched_payload_field() {
        let mut store = harness();

        store.send(TestAction::LoadTapped).await;
        store
            .receive(json!({
                "type": "loadCompleted",
                "action": { "value": 7 }
            }))
            .await;
    }

    #[tokio::test]
    async fn none_effect_queues_nothing() {
        let mut store = harness();

        store.send(TestAction::NoOp).await;
        store.assert_no_pending_actions();
    }

    #[tokio::test]
    async fn advance_time_fires_only_due_timers() {
        let mut store = harness();

        store.send(TestAction::ScheduleTick).await;

        store.advance_time(Duration::from_secs(1)).await;
        store.assert_no_pending_actions(); // not due yet

        store.advance_time(Duration::from_secs(1)).await;
        let state = store.receive(json!({ "type": "ticked" })).await;
        assert_eq!(state.ticks, 1);

        store.assert_no_pending_actions();
    }

    #[tokio::test]
    async fn timers_fire_in_due_time_order() {
        let mut store = harness();

        store.send(TestAction::ScheduleTwoTicks).await;
        store.advance_time(Duration::from_secs(5)).await;

        // The 1s timer fires before the 3s timer even though it was
        // registered second
        store.receive(json!({ "type": "ticked" })).await;
        let state = store.receive(json!({ "type": "increment" })).await;

        assert_eq!(state.ticks, 1);
        assert_eq!(state.count, 1);
    }

    #[tokio::test]
    #[should_panic(expected = "leftover actions")]
    async fn leftover_actions_fail_under_exhaustive_mode() {
        let mut store = harness();

        store.send(TestAction::LoadTapped).await;
        store.assert_no_pending_actions();
    }

    #[tokio::test]
    async fn exhaustivity_off_tolerates_leftovers() {
        let mut store = harness();
        store.set_exhaustivity(Exhaustivity::Off);

        store.send(TestAction::LoadTapped).await;
        store.assert_no_pending_actions(); // inert
    }

    #[tokio::test]
    async fn fire_and_forget_dispatches_are_discarded() {
        let mut store = harness();

        let state = store.send(TestAction::AnalyticsPing).await;
        assert_eq!(state.count, 0);
        store.assert_no_pending_actions();
    }

    #[tokio::test]
    async fn subscription_registry_keeps_single_owner_semantics() {
        let mut store = harness();
        let teardowns = Arc::clone(&store.environment.teardowns);

        store.send(TestAction::StartTicker).await;
        assert_eq!(teardowns.load(Ordering::SeqCst), 0);

        store.send(TestAction::StartTicker).await;
        assert_eq!(teardowns.load(Ordering::SeqCst), 1); // superseded

        store.send(TestAction::StopTicker).await;
        assert_eq!(teardowns.load(Ordering::SeqCst), 2);

        store.send(TestAction::StopTicker).await; // idempotent
        assert_eq!(teardowns.load(Ordering::SeqCst), 2);

        store.assert_no_pending_actions();
    }

    #[tokio::test]
    async fn failed_subscription_setup_is_survivable() {
        let mut store = harness();
        let teardowns = Arc::clone(&store.environment.teardowns);

        store.send(TestAction::StartTicker).await;
        store.send(TestAction::BrokenTicker).await;
        assert_eq!(teardowns.load(Ordering::SeqCst), 1); // prior owner torn down

        // Failed setup registered nothing, so cancel is a no-op
        store.send(TestAction::StopTicker).await;
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_records_every_applied_action() {
        let mut store = harness();

        store.send(TestAction::LoadTapped).await;
        store.receive(json!({ "type": "loadCompleted" })).await;

        let history = store.history();
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], TestAction::LoadTapped));
        assert!(matches!(history[1], TestAction::LoadCompleted { value: 42, .. }));
    }

    #[test]
    fn partial_matching_rules() {
        assert!(matches_partially(&json!({}), &json!({ "a": 1 })));
        assert!(matches_partially(
            &json!({ "a": 1 }),
            &json!({ "a": 1, "b": 2 })
        ));
        assert!(!matches_partially(&json!({ "a": 2 }), &json!({ "a": 1 })));
        assert!(!matches_partially(&json!({ "c": 1 }), &json!({ "a": 1 })));
        assert!(matches_partially(&json!([1, 2]), &json!([1, 2])));
        assert!(!matches_partially(&json!([1]), &json!([1, 2])));
        assert!(matches_partially(&json!("x"), &json!("x")));
    }
}
