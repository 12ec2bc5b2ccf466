//! State and action types for the inbox feature

use serde::{Deserialize, Serialize};
use statecraft_core::PresentationAction;

/// Messages shown in the inbox list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InboxState {
    /// Loaded messages, newest last
    pub messages: Vec<String>,
    /// Whether a load is in flight
    pub loading: bool,
    /// Draft text of the most recently saved message, shown as a transient
    /// confirmation banner
    pub last_saved: Option<String>,
    /// Which child feature, if any, is currently presented
    pub destination: Option<Destination>,
}

/// The child features the inbox can present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "camelCase")]
pub enum Destination {
    /// The compose window
    Compose(ComposeState),
    /// The help panel
    Help(HelpState),
}

/// State of the compose window
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComposeState {
    /// Current draft text
    pub draft: String,
    /// How many times the draft has been autosaved
    pub autosave_count: u32,
}

/// State of the help panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpState {
    /// Topic the panel opened on
    pub topic: String,
}

/// Inbox actions
///
/// Serialized with adjacent tagging so nested compose actions are observable
/// through case paths like `"compose.saveButtonTapped"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "action", rename_all = "camelCase")]
pub enum InboxAction {
    /// User asked to load the inbox
    LoadTapped,
    /// Messages arrived from the loader effect
    LoadCompleted {
        /// The loaded messages
        messages: Vec<String>,
    },
    /// User opened the compose window
    ComposeButtonTapped,
    /// User opened the help panel
    HelpButtonTapped,
    /// The save confirmation banner timed out
    SaveConfirmationExpired,
    /// Envelope carrying the compose child's actions (or its dismissal)
    Compose(PresentationAction<ComposeAction>),
}

/// Compose window actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "action", rename_all = "camelCase")]
pub enum ComposeAction {
    /// Draft text changed
    SetDraft(String),
    /// The autosave ticker fired
    AutosaveTicked,
    /// User tapped save; the parent intercepts this to commit the draft
    SaveButtonTapped,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compose_actions_serialize_to_case_path_shape() {
        let action = InboxAction::Compose(PresentationAction::Presented(
            ComposeAction::SaveButtonTapped,
        ));

        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "compose",
                "action": {
                    "type": "presented",
                    "action": { "type": "saveButtonTapped" }
                }
            })
        );
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = InboxState {
            messages: vec!["hello".into()],
            loading: false,
            last_saved: Some("draft".into()),
            destination: Some(Destination::Compose(ComposeState {
                draft: "wip".into(),
                autosave_count: 2,
            })),
        };

        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: InboxState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }
}
