use std::sync::Arc;

use async_trait::async_trait;
use gaze_select::state::COMMIT_FRACTION;
use gaze_select::{Action, AppState, EffectError, SideEffects, TargetId};
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Dwell,
    Menu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRecord {
    pub target: Option<TargetId>,
    pub source: SelectionSource,
}

/// Side effect keeping a log of committed selections
#[derive(Debug, Clone, Default)]
pub struct SelectionAudit {
    records: Arc<Mutex<Vec<SelectionRecord>>>,
}

impl SelectionAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SelectionRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl SideEffects for SelectionAudit {
    async fn apply(&self, action: &Action, state: AppState) -> Result<AppState, EffectError> {
        let source = match action {
            Action::Gazing {
                target: Some(target),
                fraction,
            } if *fraction >= COMMIT_FRACTION && state.is_selected(target) => SelectionSource::Dwell,
            Action::Selection { .. } => SelectionSource::Menu,
            _ => return Ok(state),
        };

        let mut records = self.records.lock();
        // Dwelling on the selected body keeps completing; record it once.
        let repeated = records.last().map(|r| &r.target) == Some(&state.selected_target);
        if source == SelectionSource::Dwell && repeated {
            return Ok(state);
        }

        info!(selected = ?state.selected_target, ?source, "selection committed");
        records.push(SelectionRecord {
            target: state.selected_target.clone(),
            source,
        });
        drop(records);
        Ok(state)
    }
}
