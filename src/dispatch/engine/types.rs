use std::time::{Duration, Instant};

use crate::dispatch::domain::DeepLinkAddress;

/// Identifies one open attempt. Monotonic per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Opened,
    NotInstalled,
    Cancelled,
}

impl AttemptStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::Pending)
    }
}

/// What to do with an `open` that arrives while another attempt is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentryPolicy {
    /// Report "already opening" and share the in-flight outcome.
    #[default]
    JoinInFlight,
    /// Silently cancel the in-flight attempt and start a new one.
    Supersede,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub timeout: Duration,
    pub go_to_store_on_not_installed: bool,
    pub reentry: ReentryPolicy,
}

impl DispatchPolicy {
    /// Long enough for a cold native start on mid-range devices.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            go_to_store_on_not_installed: false,
            reentry: ReentryPolicy::default(),
        }
    }
}

/// Everything the competing signals reported during one scheduler turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub visibility_lost: bool,
    pub deadline_elapsed: bool,
}

impl Signals {
    pub const VISIBILITY_LOST: Self = Self {
        visibility_lost: true,
        deadline_elapsed: false,
    };
    pub const DEADLINE: Self = Self {
        visibility_lost: false,
        deadline_elapsed: true,
    };
}

#[derive(Debug, Clone)]
pub enum AttemptEvent {
    OpenRequested {
        address: DeepLinkAddress,
        now: Instant,
    },
    Signalled {
        id: AttemptId,
        signals: Signals,
    },
    Cancel {
        id: AttemptId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptCommand {
    /// Hand the URI to the native-handoff mechanism.
    Navigate { id: AttemptId, uri: String },
    /// Start watching visibility and the deadline.
    Arm { id: AttemptId, deadline: Instant },
    /// Stop both signals for this attempt.
    Disarm { id: AttemptId },
    /// Attempt reached a terminal status.
    Resolve { id: AttemptId, status: AttemptStatus },
    /// An `open` joined the pending attempt instead of starting one.
    AlreadyOpening { id: AttemptId },
    /// Fallback navigation after `NotInstalled`.
    RedirectToStore { id: AttemptId, uri: String },
}
