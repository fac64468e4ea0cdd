//! Overlay HUD derived from the application state
//!
//! The HUD holds no state of its own: every published [`AppState`] maps to
//! exactly one [`HudView`], and user input on the HUD maps back to actions.

use serde::Serialize;

use crate::action::Action;
use crate::state::AppState;
use crate::target::TargetId;

/// Pause button label while the scene plays
pub const PLAYING_GLYPH: &str = "□";
/// Pause button label while the scene is paused
pub const PAUSED_GLYPH: &str = "▷";
/// Dropdown value meaning "nothing selected"
pub const NO_SELECTION: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HudView {
    pub overlay_visible: bool,
    pub pause_glyph: &'static str,
    pub selection_value: String,
    /// Target whose info box is shown
    pub info_box: Option<TargetId>,
    /// The XR session should be ended by the host
    pub end_session: bool,
}

impl HudView {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            overlay_visible: state.session_active,
            pause_glyph: if state.playing { PLAYING_GLYPH } else { PAUSED_GLYPH },
            selection_value: state
                .selected_target
                .as_ref()
                .map_or_else(|| NO_SELECTION.to_string(), |t| t.to_string()),
            info_box: state.selected_target.clone(),
            end_session: !state.session_active,
        }
    }

    pub fn info_box_visible(&self, target: &TargetId) -> bool {
        self.info_box.as_ref() == Some(target)
    }
}

/// Input coming from the HUD widgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ExitClicked,
    PauseToggled,
    SelectionChanged(String),
}

impl UiEvent {
    /// Action for this event given what the HUD currently shows
    pub fn to_action(&self, view: &HudView) -> Action {
        match self {
            UiEvent::ExitClicked => Action::AppExit,
            UiEvent::PauseToggled if view.pause_glyph == PLAYING_GLYPH => Action::Pause,
            UiEvent::PauseToggled => Action::Play,
            UiEvent::SelectionChanged(value) if value == NO_SELECTION => Action::Selection { target: None },
            UiEvent::SelectionChanged(value) => Action::select(value.as_str()),
        }
    }
}
