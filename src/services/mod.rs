//! Handlers operating on a [`crate::state::RoomSession`] and the async runtime driving them.

/// Player-code gate and authentication result handling.
pub mod auth_gate;
/// Room chat: outbound messages and transcript.
pub mod chat_relay;
/// Command and inbound event routing.
pub mod dispatch;
/// Snapshot reconciliation and local clock ticks.
pub mod reconciler;
/// Reload-based room reset.
pub mod reset;
/// Async event loop and connection supervision.
pub mod runtime;
/// Answer submission.
pub mod submission;
