//! Connection lifecycle expressed as explicit states and triggers.

use std::time::Duration;

use serde::Serialize;

/// Fixed backoff before retrying a failed connection attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Link status, also surfaced in the view as a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No transport session and no attempt in flight.
    #[default]
    Disconnected,
    /// One attempt is in flight.
    Connecting,
    /// A transport session is established.
    Connected,
}

/// Inputs of the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTrigger {
    /// Initial connection at startup.
    ConnectRequested,
    /// An attempt could not establish a session.
    AttemptFailed,
    /// An attempt produced a session.
    Established,
    /// The established session went away.
    Lost,
    /// The scheduled backoff elapsed.
    RetryElapsed,
    /// The client came back to the foreground.
    VisibilityRegained,
}

/// What the runtime must do after a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Nothing to do.
    Wait,
    /// Start an attempt immediately, cancelling any pending retry.
    ConnectNow,
    /// Arm the single retry timer.
    ScheduleRetry(Duration),
    /// Install the freshly established session.
    Adopt,
    /// A session is already installed; drop the late one.
    Discard,
}

/// Connection manager: retries forever with a fixed delay, reconnects eagerly on wake-up.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    status: ConnectionStatus,
    retry_delay: Duration,
    retry_pending: bool,
    attempts: u32,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl ConnectionManager {
    /// Create a disconnected manager using `retry_delay` as backoff.
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            retry_delay,
            retry_pending: false,
            attempts: 0,
        }
    }

    /// Current link status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Attempts made since the last established session.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether a retry timer is armed.
    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    /// Feed a trigger and get the action the runtime has to perform.
    pub fn handle(&mut self, trigger: ConnectionTrigger) -> ConnectionAction {
        use ConnectionStatus::{Connected, Connecting, Disconnected};

        match (self.status, trigger) {
            (Disconnected, ConnectionTrigger::ConnectRequested)
            | (Disconnected, ConnectionTrigger::VisibilityRegained) => self.begin_attempt(),
            (Disconnected, ConnectionTrigger::RetryElapsed) if self.retry_pending => {
                self.begin_attempt()
            }
            (Connecting, ConnectionTrigger::AttemptFailed)
            | (Connected, ConnectionTrigger::Lost) => {
                self.status = Disconnected;
                self.retry_pending = true;
                ConnectionAction::ScheduleRetry(self.retry_delay)
            }
            (Connected, ConnectionTrigger::Established) => ConnectionAction::Discard,
            (_, ConnectionTrigger::Established) => {
                self.status = Connected;
                self.retry_pending = false;
                self.attempts = 0;
                ConnectionAction::Adopt
            }
            _ => ConnectionAction::Wait,
        }
    }

    fn begin_attempt(&mut self) -> ConnectionAction {
        self.status = ConnectionStatus::Connecting;
        self.retry_pending = false;
        self.attempts += 1;
        ConnectionAction::ConnectNow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_schedules_exactly_one_retry() {
        let mut manager = ConnectionManager::default();
        assert_eq!(
            manager.handle(ConnectionTrigger::ConnectRequested),
            ConnectionAction::ConnectNow
        );
        assert_eq!(
            manager.handle(ConnectionTrigger::AttemptFailed),
            ConnectionAction::ScheduleRetry(DEFAULT_RETRY_DELAY)
        );
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(manager.retry_pending());

        // A duplicate failure report does not arm a second timer.
        assert_eq!(
            manager.handle(ConnectionTrigger::AttemptFailed),
            ConnectionAction::Wait
        );
    }

    #[test]
    fn retries_indefinitely() {
        let mut manager = ConnectionManager::new(Duration::from_millis(10));
        manager.handle(ConnectionTrigger::ConnectRequested);
        for attempt in 2..=50 {
            manager.handle(ConnectionTrigger::AttemptFailed);
            assert_eq!(
                manager.handle(ConnectionTrigger::RetryElapsed),
                ConnectionAction::ConnectNow
            );
            assert_eq!(manager.attempts(), attempt);
        }
    }

    #[test]
    fn visibility_bypasses_backoff_only_when_disconnected() {
        let mut manager = ConnectionManager::default();
        manager.handle(ConnectionTrigger::ConnectRequested);
        assert_eq!(
            manager.handle(ConnectionTrigger::VisibilityRegained),
            ConnectionAction::Wait
        );

        manager.handle(ConnectionTrigger::AttemptFailed);
        assert_eq!(
            manager.handle(ConnectionTrigger::VisibilityRegained),
            ConnectionAction::ConnectNow
        );
        assert!(!manager.retry_pending());
        // The cancelled retry firing late is ignored.
        assert_eq!(
            manager.handle(ConnectionTrigger::RetryElapsed),
            ConnectionAction::Wait
        );
    }

    #[test]
    fn loss_after_establishment_retries() {
        let mut manager = ConnectionManager::default();
        manager.handle(ConnectionTrigger::ConnectRequested);
        assert_eq!(
            manager.handle(ConnectionTrigger::Established),
            ConnectionAction::Adopt
        );
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert_eq!(
            manager.handle(ConnectionTrigger::Established),
            ConnectionAction::Discard
        );
        assert_eq!(
            manager.handle(ConnectionTrigger::Lost),
            ConnectionAction::ScheduleRetry(DEFAULT_RETRY_DELAY)
        );
    }
}
