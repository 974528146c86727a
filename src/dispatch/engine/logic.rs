use std::time::Instant;

use crate::dispatch::domain::DeepLinkAddress;
use crate::dispatch::engine::state::{EngineState, OpenAttempt};
use crate::dispatch::engine::types::{
    AttemptCommand, AttemptId, AttemptStatus, ReentryPolicy, Signals,
};

pub fn on_open_requested(
    state: &mut EngineState,
    address: DeepLinkAddress,
    now: Instant,
) -> Vec<AttemptCommand> {
    let mut cmds = Vec::new();

    if let Some(in_flight) = state.pending().map(|a| a.id) {
        match state.policy.reentry {
            ReentryPolicy::JoinInFlight => {
                log::debug!("[ENGINE] open while {:?} pending, joining", in_flight);
                return vec![AttemptCommand::AlreadyOpening { id: in_flight }];
            }
            ReentryPolicy::Supersede => {
                log::debug!("[ENGINE] open while {:?} pending, superseding", in_flight);
                cmds.extend(on_cancel(state, in_flight));
            }
        }
    }

    state.next_id += 1;
    let id = AttemptId(state.next_id);
    let deadline = now + state.policy.timeout;

    log::info!(
        "[ENGINE] {:?} pending: {} (deadline in {:?})",
        id,
        address.primary_uri,
        state.policy.timeout
    );

    state.current = Some(OpenAttempt {
        id,
        target_uri: address.primary_uri.clone(),
        fallback_uri: address.store_uri,
        started_at: now,
        deadline,
        status: AttemptStatus::Pending,
    });

    cmds.push(AttemptCommand::Navigate {
        id,
        uri: address.primary_uri,
    });
    cmds.push(AttemptCommand::Arm { id, deadline });

    cmds
}

pub fn on_signalled(state: &mut EngineState, id: AttemptId, signals: Signals) -> Vec<AttemptCommand> {
    if state.pending().map(|a| a.id) != Some(id) {
        log::trace!("[ENGINE] ignoring {:?} for stale {:?}", signals, id);
        return Vec::new();
    }

    // Visibility loss beats the deadline when both landed in the same turn.
    let status = if signals.visibility_lost {
        AttemptStatus::Opened
    } else if signals.deadline_elapsed {
        AttemptStatus::NotInstalled
    } else {
        return Vec::new();
    };

    let Some(attempt) = state.current.take() else {
        return Vec::new();
    };

    log::info!("[ENGINE] {:?} resolved {:?} ({})", id, status, attempt.target_uri);

    let mut cmds = vec![
        AttemptCommand::Disarm { id },
        AttemptCommand::Resolve { id, status },
    ];

    if status == AttemptStatus::NotInstalled && state.policy.go_to_store_on_not_installed {
        cmds.push(AttemptCommand::RedirectToStore {
            id,
            uri: attempt.fallback_uri,
        });
    }

    cmds
}

pub fn on_cancel(state: &mut EngineState, id: AttemptId) -> Vec<AttemptCommand> {
    if state.pending().map(|a| a.id) != Some(id) {
        return Vec::new();
    }
    state.current = None;

    log::debug!("[ENGINE] {:?} cancelled", id);

    vec![
        AttemptCommand::Disarm { id },
        AttemptCommand::Resolve {
            id,
            status: AttemptStatus::Cancelled,
        },
    ]
}
