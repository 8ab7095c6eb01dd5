//! Room configuration and lifecycle status.

use std::time::Duration;

use orbarena_tick::TickConfig;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Tick and broadcast rates.
    pub tick: TickConfig,

    /// Capacity of the room's command mailbox. Inputs are dropped when it
    /// is full; joins and leaves wait.
    pub mailbox_capacity: usize,

    /// Per-client queue of encoded messages awaiting delivery. A client
    /// whose queue is full at broadcast time is evicted.
    pub outbox_capacity: usize,

    /// Longest a single delivery to one client may take before that
    /// client's connection is terminated.
    pub delivery_timeout: Duration,

    /// How long a room may sit with no clients after it is created before
    /// the manager reaps it.
    pub unjoined_grace: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            mailbox_capacity: 256,
            outbox_capacity: 16,
            delivery_timeout: Duration::from_millis(250),
            unjoined_grace: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a room.
///
/// ```text
/// Running → Stopped
/// ```
///
/// `Stopped` is terminal: a stopped room never runs again, and its code
/// may be reused by a brand-new room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Running,
    Stopped,
}

impl RoomStatus {
    /// Returns the only valid successor, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Running => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
