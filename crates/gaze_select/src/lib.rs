//! Gaze-driven dwell selection
//!
//! Per frame, a [`DwellPicker`] resolves what the viewer is looking at and how
//! long they have looked at it. Its reading becomes a `Gazing` [`Action`] for
//! the [`SelectionStateMachine`], which publishes immutable [`AppState`]
//! snapshots to subscribers and runs side effects one at a time on an
//! [`AsyncTaskQueue`]. [`HudView`] and [`CursorAnimator`] turn snapshots into
//! what the overlay and the dwell cursor show.

pub mod action;
pub mod cursor;
pub mod dwell;
pub mod effects;
pub mod error;
pub mod hud;
pub mod machine;
pub mod state;
pub mod target;
pub mod task_queue;

pub use action::Action;
pub use cursor::{CursorAnimator, CursorConfig, CursorFrame};
pub use dwell::{DwellConfig, DwellPicker, DwellReading, DwellSample, DwellState};
pub use effects::{NoEffects, SideEffects};
pub use error::{EffectError, QueueError, SelectError, TaskError};
pub use hud::{HudView, UiEvent};
pub use machine::{SelectionStateMachine, SubscriptionId};
pub use state::{reduce, AppState};
pub use target::{pick_nearest, PickTarget, Pickable, TargetId};
pub use task_queue::{AsyncTaskQueue, QueueStats};
