//! Asynchronous side-effect hook run after each transition

use async_trait::async_trait;

use crate::action::Action;
use crate::error::EffectError;
use crate::state::AppState;

/// Work triggered by a transition but not needed before it becomes visible
///
/// `apply` receives the state as it is when the queued phase starts (which
/// may already include later transitions) and returns the state to publish.
/// An error leaves the current state untouched.
#[async_trait]
pub trait SideEffects: Send + Sync + 'static {
    async fn apply(&self, action: &Action, state: AppState) -> Result<AppState, EffectError>;
}

/// Identity effects: every phase publishes the state unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffects;

#[async_trait]
impl SideEffects for NoEffects {
    async fn apply(&self, _action: &Action, state: AppState) -> Result<AppState, EffectError> {
        Ok(state)
    }
}
