//! Dwell-time picking under the screen-center ray
//!
//! Every frame the host hands the picker the gaze ray, the selectable
//! candidates and the frame timestamp. The picker resolves the closest
//! candidate and accumulates how long the gaze has stayed on it:
//!
//! - a different target (including "nothing") restarts the timer at 0
//! - the same target adds the time elapsed since the previous frame
//! - once the timer reaches the threshold the reading reports a completed
//!   dwell (fraction 1.0) and the timer restarts at 0 on the same target
//!
//! Accumulation is time-based, so the selection speed does not depend on the
//! frame rate.

use math_util::Ray;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;
use crate::target::{pick_nearest, Pickable, TargetId};

/// Dwell time needed to commit a selection
pub const DEFAULT_DWELL_THRESHOLD_MS: f64 = 750.0;

/// Lower bound applied to configured thresholds
pub const MIN_DWELL_THRESHOLD_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellConfig {
    /// Milliseconds of steady gaze required to select a target
    pub threshold_ms: f64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            threshold_ms: DEFAULT_DWELL_THRESHOLD_MS,
        }
    }
}

/// Resolved hit for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DwellSample {
    pub target: Option<TargetId>,
    pub timestamp_ms: f64,
}

/// Timer state owned by the picker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DwellState {
    pub current_target: Option<TargetId>,
    pub accumulated_ms: f64,
    /// `None` until the first sample
    pub last_timestamp_ms: Option<f64>,
}

/// Picker output for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DwellReading {
    pub target: Option<TargetId>,
    /// Dwell progress in `[0, 1]`
    pub fraction: f64,
    /// Time accumulated on `target` up to and including this frame
    pub accumulated_ms: f64,
    /// The threshold was reached on this frame
    pub completed: bool,
}

impl DwellReading {
    /// `Gazing` action carrying this reading
    pub fn to_action(&self) -> Action {
        Action::Gazing {
            target: self.target.clone(),
            fraction: self.fraction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DwellPicker {
    threshold_ms: f64,
    state: DwellState,
}

impl DwellPicker {
    pub fn new(threshold_ms: f64) -> Self {
        Self::with_config(DwellConfig { threshold_ms })
    }

    pub fn with_config(config: DwellConfig) -> Self {
        let threshold_ms = if config.threshold_ms.is_finite() {
            config.threshold_ms.max(MIN_DWELL_THRESHOLD_MS)
        } else {
            DEFAULT_DWELL_THRESHOLD_MS
        };
        Self {
            threshold_ms,
            state: DwellState::default(),
        }
    }

    pub fn threshold_ms(&self) -> f64 {
        self.threshold_ms
    }

    pub fn state(&self) -> &DwellState {
        &self.state
    }

    /// Forget the current target and timer
    pub fn reset(&mut self) {
        self.state = DwellState::default();
    }

    /// Resolve the closest candidate under `ray` and update the dwell timer
    pub fn sample<P: Pickable>(&mut self, ray: &Ray, candidates: &[P], timestamp_ms: f64) -> DwellReading {
        let target = pick_nearest(ray, candidates).map(|hit| hit.target_id().clone());
        self.observe(DwellSample {
            target,
            timestamp_ms,
        })
    }

    /// Update the dwell timer with an already resolved hit
    pub fn observe(&mut self, sample: DwellSample) -> DwellReading {
        let elapsed_ms = match self.state.last_timestamp_ms {
            Some(last) if sample.timestamp_ms.is_finite() => (sample.timestamp_ms - last).max(0.0),
            _ => 0.0,
        };
        if sample.timestamp_ms.is_finite() {
            self.state.last_timestamp_ms = Some(sample.timestamp_ms);
        }

        let same_target = sample.target.is_some() && sample.target == self.state.current_target;
        if same_target {
            self.state.accumulated_ms += elapsed_ms;
        } else {
            if sample.target != self.state.current_target {
                debug!(
                    from = ?self.state.current_target,
                    to = ?sample.target,
                    "gaze target changed"
                );
            }
            self.state.current_target = sample.target.clone();
            self.state.accumulated_ms = 0.0;
        }

        let accumulated_ms = self.state.accumulated_ms;
        let completed = same_target && accumulated_ms >= self.threshold_ms;
        let fraction = if completed {
            1.0
        } else {
            (accumulated_ms / self.threshold_ms).clamp(0.0, 1.0)
        };

        if completed {
            debug!(
                body = ?sample.target,
                dwell_ms = accumulated_ms,
                "dwell completed"
            );
            self.state.accumulated_ms = 0.0;
        }

        DwellReading {
            target: sample.target,
            fraction,
            accumulated_ms,
            completed,
        }
    }
}

impl Default for DwellPicker {
    fn default() -> Self {
        Self::with_config(DwellConfig::default())
    }
}
