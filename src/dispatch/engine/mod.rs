//! Open-attempt decision engine.
//!
//! This module implements the **Functional Core** of the app handoff logic.
//! It acts as a pure state machine:
//! - **Input**: `AttemptEvent` (open requests, observed signals, cancellation).
//! - **Output**: `Vec<AttemptCommand>` (side effects to be executed by the dispatcher).
//!
//! # Architecture guarantees
//! * **No IO**: This module never touches the host page. It only says what to do.
//! * **No Async**: Timers and subscriptions live in the runtime; the engine sees
//!   their observations as plain events.
//! * **Deterministic**: Given the same initial state and sequence of events, the output is always identical.
//!
//! # Lifecycle
//! `Pending` is the only non-terminal status. An attempt leaves it exactly
//! once, to `Opened`, `NotInstalled` or `Cancelled`, and is then forgotten.
//! Signals carrying the id of a forgotten attempt are ignored.

pub mod state;
mod logic;
pub mod types;


pub use crate::dispatch::engine::types::{
    AttemptCommand, AttemptEvent, AttemptId, AttemptStatus, DispatchPolicy, ReentryPolicy, Signals,
};

use crate::dispatch::engine::state::{EngineState, OpenAttempt};

/// The handoff "Brain".
#[derive(Debug)]
pub struct AttemptEngine {
    state: EngineState,
}

impl AttemptEngine {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self {
            state: EngineState {
                policy,
                current: None,
                next_id: 0,
            },
        }
    }

    /// The main event handler.
    ///
    /// Consumes an event and returns the commands the dispatcher must execute,
    /// in order.
    pub fn handle_event(&mut self, event: AttemptEvent) -> Vec<AttemptCommand> {
        match event {
            AttemptEvent::OpenRequested { address, now } => {
                logic::on_open_requested(&mut self.state, address, now)
            }
            AttemptEvent::Signalled { id, signals } => {
                logic::on_signalled(&mut self.state, id, signals)
            }
            AttemptEvent::Cancel { id } => logic::on_cancel(&mut self.state, id),
        }
    }

    /// `true` while an attempt is `Pending`.
    pub fn is_opening(&self) -> bool {
        self.state.pending().is_some()
    }

    pub fn pending(&self) -> Option<&OpenAttempt> {
        self.state.pending()
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.state.policy
    }
}
