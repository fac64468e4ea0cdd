//! Input events consumed by the selection reducer
//!
//! UI layers may post actions as JSON envelopes of the form
//! `{"type": "...", "payload": {...}}`. The type names are the ones the HUD
//! and render loop have always used (`"app init"`, `"Gazing"`, ...); payload
//! keys accept `planet` as an alias of `target`.

use serde::Deserialize;

use crate::error::SelectError;
use crate::target::TargetId;

/// Everything that can change the application state
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Session started: the overlay becomes active and the scene plays.
    AppInit,
    /// Exit button pressed.
    AppExit,
    Play,
    Pause,
    /// Per-frame dwell reading from the picker. `target` is `None` when the
    /// gaze ray hits nothing.
    Gazing {
        target: Option<TargetId>,
        fraction: f64,
    },
    /// Explicit choice from the selection dropdown, `None` for "none".
    Selection { target: Option<TargetId> },
}

impl Action {
    pub fn gazing(target: Option<TargetId>, fraction: f64) -> Self {
        Self::Gazing { target, fraction }
    }

    pub fn select(target: impl Into<TargetId>) -> Self {
        Self::Selection {
            target: Some(target.into()),
        }
    }

    /// Wire name of the action type
    pub fn kind(&self) -> &'static str {
        match self {
            Action::AppInit => "app init",
            Action::AppExit => "app exit",
            Action::Play => "play",
            Action::Pause => "pause",
            Action::Gazing { .. } => "Gazing",
            Action::Selection { .. } => "selection",
        }
    }

    /// Decode a JSON action envelope
    pub fn from_json(text: &str) -> Result<Self, SelectError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        envelope.into_action()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GazingPayload {
    #[serde(default, alias = "planet")]
    target: Option<TargetId>,
    #[serde(default)]
    fraction: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SelectionPayload {
    #[serde(default, alias = "planet")]
    target: Option<TargetId>,
}

impl Envelope {
    fn into_action(self) -> Result<Action, SelectError> {
        let action = match self.kind.as_str() {
            "app init" => Action::AppInit,
            "app exit" => Action::AppExit,
            "play" => Action::Play,
            "pause" => Action::Pause,
            "Gazing" => {
                let payload: GazingPayload = self.payload_as()?;
                Action::Gazing {
                    target: payload.target,
                    fraction: payload.fraction.unwrap_or(0.0),
                }
            }
            "selection" => {
                let payload: SelectionPayload = self.payload_as()?;
                Action::Selection {
                    target: payload.target.filter(|t| t.as_str() != crate::hud::NO_SELECTION),
                }
            }
            _ => return Err(SelectError::UnknownAction(self.kind)),
        };
        Ok(action)
    }

    fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, SelectError> {
        let payload = if self.payload.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            self.payload.clone()
        };
        serde_json::from_value(payload).map_err(|source| SelectError::MalformedAction {
            kind: self.kind.clone(),
            source,
        })
    }
}
