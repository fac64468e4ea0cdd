//! Spinning dwell cursor
//!
//! The cursor texture is shifted by an offset that sweeps `[-0.5, 0.5)` once
//! per dwell period, so one full turn of the spinner matches the time needed
//! to commit a selection.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::dwell::DEFAULT_DWELL_THRESHOLD_MS;
use crate::state::AppState;
use crate::target::Pickable;

/// Remap `x` from `[a1, a2]` to `[b1, b2]`
pub fn map_linear(x: f64, a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorConfig {
    /// Cursor radius used when the target has no bounds
    pub radius: f32,
    /// Cursor size relative to the gazed target
    pub scale_factor: f32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            scale_factor: 1.2,
        }
    }
}

/// What the renderer needs to draw the cursor this frame
#[derive(Debug, Clone, PartialEq)]
pub struct CursorFrame {
    pub visible: bool,
    pub anchor: Option<Vec3>,
    pub scale: f32,
    pub offset: f32,
}

impl CursorFrame {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            anchor: None,
            scale: 0.0,
            offset: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CursorAnimator {
    config: CursorConfig,
    period_ms: f64,
}

impl CursorAnimator {
    /// `period_ms` is normally the dwell threshold
    pub fn new(config: CursorConfig, period_ms: f64) -> Self {
        let period_ms = if period_ms.is_finite() && period_ms > 0.0 {
            period_ms
        } else {
            DEFAULT_DWELL_THRESHOLD_MS
        };
        Self { config, period_ms }
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    /// Spin offset at `timestamp_ms`
    pub fn offset(&self, timestamp_ms: f64) -> f32 {
        if !timestamp_ms.is_finite() {
            return -0.5;
        }
        let phase = timestamp_ms.rem_euclid(self.period_ms);
        map_linear(phase, 0.0, self.period_ms, -0.5, 0.5) as f32
    }

    /// Cursor placement for `state`; hidden unless a target is being gazed
    pub fn frame<P: Pickable>(&self, state: &AppState, targets: &[P], timestamp_ms: f64) -> CursorFrame {
        let Some(gazed) = state.gazed_target.as_ref() else {
            return CursorFrame::hidden();
        };
        let Some(target) = targets.iter().find(|t| t.target_id() == gazed) else {
            return CursorFrame::hidden();
        };

        let radius = target.bounding_radius().unwrap_or(self.config.radius);
        CursorFrame {
            visible: true,
            anchor: target.anchor(),
            scale: radius * self.config.scale_factor,
            offset: self.offset(timestamp_ms),
        }
    }
}

impl Default for CursorAnimator {
    fn default() -> Self {
        Self::new(CursorConfig::default(), DEFAULT_DWELL_THRESHOLD_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::PickTarget;
    use math_util::Sphere;

    fn earth() -> PickTarget {
        PickTarget::new("earth", Sphere::new(Vec3::new(2.0, 0.0, -5.0), 0.5))
    }

    #[test]
    fn test_map_linear() {
        assert_eq!(map_linear(5.0, 0.0, 10.0, -1.0, 1.0), 0.0);
        assert_eq!(map_linear(0.0, 0.0, 10.0, -0.5, 0.5), -0.5);
    }

    #[test]
    fn test_offset_sweeps_once_per_period() {
        let animator = CursorAnimator::new(CursorConfig::default(), 1000.0);
        assert_eq!(animator.offset(0.0), -0.5);
        assert_eq!(animator.offset(500.0), 0.0);
        assert_eq!(animator.offset(1000.0), -0.5);
        assert_eq!(animator.offset(1250.0), -0.25);
    }

    #[test]
    fn test_offset_stays_in_range() {
        let animator = CursorAnimator::default();
        for t in [-1234.5, 0.0, 1.0, 749.9, 750.0, 99_999.0] {
            let offset = animator.offset(t);
            assert!((-0.5..=0.5).contains(&offset), "offset {offset} at {t}");
        }
    }

    #[test]
    fn test_hidden_without_gaze() {
        let animator = CursorAnimator::default();
        let state = AppState::new(true, true);
        assert_eq!(animator.frame(&state, &[earth()], 100.0), CursorFrame::hidden());
    }

    #[test]
    fn test_follows_gazed_target() {
        let animator = CursorAnimator::default();
        let state = AppState {
            gazed_target: Some("earth".into()),
            ..AppState::new(true, true)
        };

        let frame = animator.frame(&state, &[earth()], 375.0);
        assert!(frame.visible);
        assert_eq!(frame.anchor, Some(Vec3::new(2.0, 0.0, -5.0)));
        assert!((frame.scale - 0.6).abs() < 1e-6);
        assert_eq!(frame.offset, 0.0);
    }

    #[test]
    fn test_hidden_when_gazed_target_left_the_scene() {
        let animator = CursorAnimator::default();
        let state = AppState {
            gazed_target: Some("pluto".into()),
            ..AppState::new(true, true)
        };
        assert!(!animator.frame(&state, &[earth()], 0.0).visible);
    }

    #[test]
    fn test_bad_period_falls_back_to_default() {
        let animator = CursorAnimator::new(CursorConfig::default(), 0.0);
        assert_eq!(animator.period_ms(), DEFAULT_DWELL_THRESHOLD_MS);
    }
}
