//! Inbox demo binary
//!
//! Walks the feature end to end: load, compose through a scoped store,
//! observe the save through a case path, then hand the state off through the
//! serialize/hydrate boundary.

use std::time::Duration;

use inbox::{
    ComposeAction, Destination, InboxAction, InboxEnvironment, InboxReducer, InboxState,
    SystemClock,
};
use statecraft_core::case_path::is_action_at_path;
use statecraft_core::{PathMatcher, PresentationAction};
use statecraft_runtime::{Store, hydrate_store, scope_to_destination, serialize_state};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inbox=debug,statecraft_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Inbox Demo: Statecraft ===\n");

    let env = InboxEnvironment::new(SystemClock);
    let store = Store::new(InboxState::default(), InboxReducer::new(), env);

    // Observe every commit
    let subscription = store.subscribe(|state: &InboxState| {
        tracing::debug!(
            messages = state.messages.len(),
            presented = state.destination.is_some(),
            "state committed"
        );
    });

    // Load the inbox
    println!(">>> Sending: LoadTapped");
    let _ = store.send(InboxAction::LoadTapped).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let messages = store.state(|s| s.messages.clone()).await;
    println!("Loaded {} message(s):", messages.len());
    for message in &messages {
        println!("  - {message}");
    }

    // Open the compose window and drive it through a scoped store
    println!("\n>>> Sending: ComposeButtonTapped");
    let _ = store.send(InboxAction::ComposeButtonTapped).await;

    let compose = scope_to_destination(
        &store,
        |s: &InboxState| s.destination.as_ref(),
        |d| match d {
            Destination::Compose(child) => Some(child),
            Destination::Help(_) => None,
        },
        InboxAction::Compose,
    )
    .await;
    println!("Compose presented: {}", compose.is_presented());

    compose
        .send(ComposeAction::SetDraft("Ship the demo".into()))
        .await;

    // Observe the save through a case path before sending it
    let save = InboxAction::Compose(PresentationAction::Presented(
        ComposeAction::SaveButtonTapped,
    ));
    if is_action_at_path(&save, "compose.saveButtonTapped") {
        println!("\n>>> Case path matched: compose.saveButtonTapped");
    }

    let matcher = PathMatcher::new()
        .on("compose.setDraft", |_| Some("draft edited"))
        .on("compose.saveButtonTapped", |_| Some("draft saved"));
    if let Some(event) = matcher.matches(&save) {
        println!(">>> PathMatcher routed: {event}");
    }

    let _ = store.send(save).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (messages, last_saved) = store
        .state(|s| (s.messages.clone(), s.last_saved.clone()))
        .await;
    println!("\nMessages after save ({}):", messages.len());
    for message in &messages {
        println!("  - {message}");
    }
    println!("Confirmation banner: {last_saved:?}");

    // Hand the state off through the serialize/hydrate boundary
    let snapshot = match serialize_state(&store.state(Clone::clone).await) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            eprintln!("serialize failed: {error}");
            return;
        },
    };
    println!("\nSnapshot ({} bytes) ready for handoff", snapshot.len());

    let hydrated = match hydrate_store(
        &snapshot,
        InboxReducer::new(),
        InboxEnvironment::new(SystemClock),
    ) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("hydrate failed: {error}");
            return;
        },
    };
    let hydrated_count = hydrated.state(|s: &InboxState| s.messages.len()).await;
    println!("Hydrated store sees {hydrated_count} message(s)");

    subscription.unsubscribe();
    println!("\nShutting down (waits for the banner-expiry effect)...");
    if let Err(error) = store.shutdown_within(Duration::from_secs(10)).await {
        eprintln!("shutdown: {error}");
    }

    println!("\n=== Demo complete ===");
    println!("\nKey concepts demonstrated:");
    println!("  • Store: queue + drain loop coordinating the reducer");
    println!("  • Effects: run, subscription, cancel, after-delay, fire-and-forget");
    println!("  • Scoped store: child view with automatic action rewrapping");
    println!("  • Case paths: observing nested child actions by string path");
    println!("  • Hydration: serialize on one host, reconstruct on another");
}
