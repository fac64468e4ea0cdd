//! Application state and the pure reducer over [`Action`]

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::target::TargetId;

/// Dwell fraction at which a gaze commits a selection
pub const COMMIT_FRACTION: f64 = 1.0;

/// Immutable snapshot of the selection state
///
/// Every accepted action produces a new value; nothing mutates a snapshot
/// once it has been handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// XR session running and overlay shown
    pub session_active: bool,
    /// Scene animation running
    pub playing: bool,
    /// Target currently being dwelled on (not yet selected)
    pub gazed_target: Option<TargetId>,
    /// Committed selection
    pub selected_target: Option<TargetId>,
}

impl AppState {
    pub fn new(session_active: bool, playing: bool) -> Self {
        Self {
            session_active,
            playing,
            ..Self::default()
        }
    }

    pub fn is_selected(&self, target: &TargetId) -> bool {
        self.selected_target.as_ref() == Some(target)
    }
}

/// Next state for `action` applied to `state`
///
/// The gazed target is cleared before every transition and only `Gazing` sets
/// it again, so it always reflects the latest gaze reading.
pub fn reduce(state: &AppState, action: &Action) -> AppState {
    let mut next = AppState {
        gazed_target: None,
        ..state.clone()
    };

    match action {
        Action::AppInit => {
            next.session_active = true;
            next.playing = true;
        }
        Action::AppExit => next.session_active = false,
        Action::Play => next.playing = true,
        Action::Pause => next.playing = false,
        Action::Gazing { target, fraction } => {
            if *target == state.selected_target {
                return next;
            }
            // A gaze at nothing never commits, and NaN stays below the bar.
            if *fraction >= COMMIT_FRACTION && target.is_some() {
                next.selected_target = target.clone();
            } else {
                next.gazed_target = target.clone();
            }
        }
        Action::Selection { target } => next.selected_target = target.clone(),
    }

    next
}
