//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants from
//! inside reducers, where the `move |dispatch| async move { … }` dance is
//! otherwise repeated everywhere.

/// Create an [`Effect::Run`](crate::effect::Effect::Run) from a dispatcher
/// binding and a body
///
/// # Example
///
/// ```rust,ignore
/// use statecraft_core::run_effect;
///
/// run_effect!(|dispatch| {
///     let messages = client.fetch_messages().await;
///     dispatch.send(InboxAction::LoadCompleted(messages)).await;
/// })
/// ```
#[macro_export]
macro_rules! run_effect {
    (|$dispatch:ident| $body:block) => {
        $crate::effect::Effect::run(move |$dispatch| async move { $body })
    };
}

/// Create an [`Effect::AfterDelay`](crate::effect::Effect::AfterDelay) for
/// scheduling work on the host clock
///
/// # Example
///
/// ```rust,ignore
/// use statecraft_core::after_delay;
/// use std::time::Duration;
///
/// after_delay! {
///     duration: Duration::from_secs(2),
///     |dispatch| {
///         dispatch.send(ComposeAction::AutosaveTicked).await;
///     }
/// }
/// ```
#[macro_export]
macro_rules! after_delay {
    (
        duration: $duration:expr,
        |$dispatch:ident| $body:block
    ) => {
        $crate::effect::Effect::after_delay($duration, move |$dispatch| async move { $body })
    };
}
