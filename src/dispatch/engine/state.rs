use std::time::Instant;

use crate::dispatch::engine::types::{AttemptId, AttemptStatus, DispatchPolicy};

/// One dispatch in progress.
#[derive(Debug, Clone)]
pub struct OpenAttempt {
    pub id: AttemptId,
    pub target_uri: String,
    pub fallback_uri: String,
    pub started_at: Instant,
    pub deadline: Instant,
    pub status: AttemptStatus,
}

#[derive(Debug)]
pub struct EngineState {
    pub policy: DispatchPolicy,

    /// At most one attempt is tracked; it is dropped once terminal.
    pub current: Option<OpenAttempt>,

    pub next_id: u64,
}

impl EngineState {
    pub fn pending(&self) -> Option<&OpenAttempt> {
        self.current
            .as_ref()
            .filter(|a| a.status == AttemptStatus::Pending)
    }
}
