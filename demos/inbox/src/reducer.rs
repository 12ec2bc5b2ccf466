//! Reducers for the inbox feature and its compose child

use std::marker::PhantomData;
use std::time::Duration;

use statecraft_core::effect::{Effect, Teardown};
use statecraft_core::environment::Clock;
use statecraft_core::reducer::Reducer;
use statecraft_core::{PresentationAction, after_delay, run_effect};

use crate::types::{ComposeAction, ComposeState, Destination, HelpState, InboxAction, InboxState};

/// Subscription id for the compose autosave ticker
pub const AUTOSAVE_SUBSCRIPTION: &str = "compose-autosave";

/// How often the autosave ticker fires while composing
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// How long the save confirmation banner stays up
const SAVE_CONFIRMATION_TTL: Duration = Duration::from_secs(5);

/// Inbox environment
///
/// The clock stamps the welcome message on load; richer deployments would
/// carry a message client here as well.
#[derive(Debug, Clone)]
pub struct InboxEnvironment<C: Clock> {
    /// Clock for time-based operations
    pub clock: C,
}

impl<C: Clock> InboxEnvironment<C> {
    /// Create a new inbox environment with the given clock
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }
}

/// Reducer for the compose window
///
/// Generic over the clock type so it shares the parent's environment.
#[derive(Debug, Clone, Copy)]
pub struct ComposeReducer<C> {
    _phantom: PhantomData<C>,
}

impl<C> ComposeReducer<C> {
    /// Create a new compose reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<C> Default for ComposeReducer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Reducer for ComposeReducer<C> {
    type State = ComposeState;
    type Action = ComposeAction;
    type Environment = InboxEnvironment<C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> Effect<Self::Action> {
        match action {
            ComposeAction::SetDraft(draft) => {
                state.draft = draft;
                Effect::none()
            },
            ComposeAction::AutosaveTicked => {
                state.autosave_count += 1;
                Effect::none()
            },
            // The parent intercepts the save; the child has nothing to do
            ComposeAction::SaveButtonTapped => Effect::none(),
        }
    }
}

/// Reducer for the inbox feature
///
/// Owns the destination lifecycle: presenting the compose window starts the
/// autosave subscription, saving or dismissing cancels it. Child actions that
/// the parent does not intercept are delegated to [`ComposeReducer`] and the
/// child's effects are rewrapped with [`Effect::map`].
#[derive(Debug, Clone, Copy)]
pub struct InboxReducer<C> {
    compose: ComposeReducer<C>,
}

impl<C> InboxReducer<C> {
    /// Create a new inbox reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            compose: ComposeReducer::new(),
        }
    }
}

impl<C> Default for InboxReducer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Reducer for InboxReducer<C> {
    type State = InboxState;
    type Action = InboxAction;
    type Environment = InboxEnvironment<C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effect<Self::Action> {
        match action {
            InboxAction::LoadTapped => {
                state.loading = true;
                let loaded_at = env.clock.now();
                run_effect!(|dispatch| {
                    let messages = vec![
                        format!("Welcome back ({loaded_at})"),
                        "Tip: tap compose to write a message".to_string(),
                    ];
                    dispatch.send(InboxAction::LoadCompleted { messages }).await;
                })
            },
            InboxAction::LoadCompleted { messages } => {
                state.loading = false;
                state.messages = messages;
                Effect::none()
            },
            InboxAction::ComposeButtonTapped => {
                state.destination = Some(Destination::Compose(ComposeState::default()));
                Effect::subscription(AUTOSAVE_SUBSCRIPTION, |dispatch| {
                    let task = tokio::spawn(async move {
                        let mut ticks = tokio::time::interval(AUTOSAVE_INTERVAL);
                        // The first tick resolves immediately; skip it
                        ticks.tick().await;
                        loop {
                            ticks.tick().await;
                            dispatch
                                .send(InboxAction::Compose(PresentationAction::Presented(
                                    ComposeAction::AutosaveTicked,
                                )))
                                .await;
                        }
                    });
                    let teardown: Teardown = Box::new(move || task.abort());
                    Ok(teardown)
                })
            },
            InboxAction::HelpButtonTapped => {
                state.destination = Some(Destination::Help(HelpState {
                    topic: "getting-started".to_string(),
                }));
                Effect::none()
            },
            InboxAction::SaveConfirmationExpired => {
                state.last_saved = None;
                Effect::none()
            },
            InboxAction::Compose(PresentationAction::Presented(
                ComposeAction::SaveButtonTapped,
            )) => {
                // Parent observation: commit the draft and close the window
                let presented = state
                    .destination
                    .take_if(|d| matches!(d, Destination::Compose(_)));
                if let Some(Destination::Compose(compose)) = presented {
                    state.messages.push(compose.draft.clone());
                    state.last_saved = Some(compose.draft);
                }
                Effect::batch(vec![
                    Effect::cancel(AUTOSAVE_SUBSCRIPTION),
                    after_delay! {
                        duration: SAVE_CONFIRMATION_TTL,
                        |dispatch| {
                            dispatch.send(InboxAction::SaveConfirmationExpired).await;
                        }
                    },
                    Effect::fire_and_forget(|_dispatch| async move {
                        tracing::debug!("analytics: compose.saved");
                    }),
                ])
            },
            InboxAction::Compose(PresentationAction::Presented(child_action)) => {
                let Some(Destination::Compose(compose)) = &mut state.destination else {
                    // The window is gone; late child actions are routine
                    return Effect::none();
                };

                self.compose
                    .reduce(compose, child_action, env)
                    .map(|action| InboxAction::Compose(PresentationAction::Presented(action)))
            },
            InboxAction::Compose(PresentationAction::Dismiss) => {
                state.destination = None;
                Effect::cancel(AUTOSAVE_SUBSCRIPTION)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use statecraft_testing::{FixedClock, test_clock};

    fn env() -> InboxEnvironment<FixedClock> {
        InboxEnvironment::new(test_clock())
    }

    #[test]
    fn load_tapped_sets_loading_and_returns_work() {
        let mut state = InboxState::default();
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(&mut state, InboxAction::LoadTapped, &env());

        assert!(state.loading);
        assert!(matches!(effect, Effect::Run(_)));
    }

    #[test]
    fn load_completed_replaces_messages() {
        let mut state = InboxState {
            loading: true,
            ..InboxState::default()
        };
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(
            &mut state,
            InboxAction::LoadCompleted {
                messages: vec!["a".into(), "b".into()],
            },
            &env(),
        );

        assert!(!state.loading);
        assert_eq!(state.messages, vec!["a".to_string(), "b".to_string()]);
        assert!(effect.is_none());
    }

    #[test]
    fn compose_button_presents_the_compose_destination() {
        let mut state = InboxState::default();
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(&mut state, InboxAction::ComposeButtonTapped, &env());

        assert_eq!(
            state.destination,
            Some(Destination::Compose(ComposeState::default()))
        );
        assert!(matches!(effect, Effect::Subscription { ref id, .. }
            if id.as_str() == AUTOSAVE_SUBSCRIPTION));
    }

    #[test]
    fn set_draft_is_delegated_to_the_child() {
        let mut state = InboxState {
            destination: Some(Destination::Compose(ComposeState::default())),
            ..InboxState::default()
        };
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(
            &mut state,
            InboxAction::Compose(PresentationAction::Presented(ComposeAction::SetDraft(
                "hello".into(),
            ))),
            &env(),
        );

        assert!(effect.is_none());
        assert_eq!(
            state.destination,
            Some(Destination::Compose(ComposeState {
                draft: "hello".into(),
                autosave_count: 0,
            }))
        );
    }

    #[test]
    fn child_actions_without_a_presented_window_are_ignored() {
        let mut state = InboxState::default();
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(
            &mut state,
            InboxAction::Compose(PresentationAction::Presented(ComposeAction::SetDraft(
                "late".into(),
            ))),
            &env(),
        );

        assert!(effect.is_none());
        assert_eq!(state, InboxState::default());
    }

    #[test]
    fn save_commits_the_draft_and_closes_the_window() {
        let mut state = InboxState {
            destination: Some(Destination::Compose(ComposeState {
                draft: "ship it".into(),
                autosave_count: 1,
            })),
            ..InboxState::default()
        };
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(
            &mut state,
            InboxAction::Compose(PresentationAction::Presented(
                ComposeAction::SaveButtonTapped,
            )),
            &env(),
        );

        assert_eq!(state.messages, vec!["ship it".to_string()]);
        assert_eq!(state.last_saved.as_deref(), Some("ship it"));
        assert!(state.destination.is_none());
        assert!(matches!(effect, Effect::Batch(_)));
    }

    #[test]
    fn dismiss_closes_the_window_and_cancels_autosave() {
        let mut state = InboxState {
            destination: Some(Destination::Compose(ComposeState::default())),
            ..InboxState::default()
        };
        let reducer = InboxReducer::new();

        let effect = reducer.reduce(
            &mut state,
            InboxAction::Compose(PresentationAction::Dismiss),
            &env(),
        );

        assert!(state.destination.is_none());
        assert!(matches!(effect, Effect::Cancel(ref id)
            if id.as_str() == AUTOSAVE_SUBSCRIPTION));
    }

    #[test]
    fn autosave_tick_increments_the_child_counter() {
        let mut state = ComposeState::default();
        let reducer: ComposeReducer<FixedClock> = ComposeReducer::new();

        let effect = reducer.reduce(&mut state, ComposeAction::AutosaveTicked, &env());

        assert_eq!(state.autosave_count, 1);
        assert!(effect.is_none());
    }
}
