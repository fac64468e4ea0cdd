//! Viewer head pose and the scripted gaze path used by the headless run
//!
//! The gaze ray always leaves through the center of the view, so it is simply
//! the head's forward direction.

use glam::Vec3;
use math_util::Ray;

use crate::config::{GazeStep, HeadConfig};

/// Pitch limit, just short of straight up/down
const MAX_PITCH: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct HeadPose {
    pub position: Vec3,
    /// Rotation around +Y, 0 looks down -Z
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for HeadPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl HeadPose {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Unit forward vector from yaw/pitch
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            -self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    /// Screen-center gaze ray
    pub fn gaze_ray(&self) -> Ray {
        Ray::new(self.position, self.forward())
    }

    /// Turn the head towards `target`
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize() else {
            return;
        };
        self.pitch = dir.y.asin().clamp(-MAX_PITCH, MAX_PITCH);
        self.yaw = (-dir.x).atan2(-dir.z);
    }
}

/// Cycles through [`GazeStep`]s, holding each for its duration
#[derive(Debug, Clone)]
pub struct GazeScript {
    steps: Vec<GazeStep>,
    cycle_ms: f64,
}

impl GazeScript {
    pub fn new(steps: Vec<GazeStep>) -> Self {
        let cycle_ms = steps.iter().map(|s| s.hold_ms.max(0.0)).sum();
        Self { steps, cycle_ms }
    }

    pub fn from_config(config: &HeadConfig) -> Self {
        Self::new(config.gaze_script.clone())
    }

    /// Body the viewer looks at `timestamp_ms` into the run
    pub fn body_at(&self, timestamp_ms: f64) -> Option<&str> {
        if !(self.cycle_ms > 0.0) {
            return None;
        }

        let mut t = timestamp_ms.max(0.0).rem_euclid(self.cycle_ms);
        for step in &self.steps {
            if t < step.hold_ms {
                return step.body.as_deref();
            }
            t -= step.hold_ms.max(0.0);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_default_looks_down_negative_z() {
        assert_close(HeadPose::default().forward(), Vec3::NEG_Z);
    }

    #[test]
    fn test_look_at() {
        let mut head = HeadPose::new(Vec3::ZERO);
        for target in [Vec3::new(2.0, 0.0, -2.0), Vec3::new(-1.0, 1.0, -3.0), Vec3::new(0.0, 0.0, 4.0)] {
            head.look_at(target);
            assert_close(head.forward(), target.normalize());
        }
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut head = HeadPose::default();
        head.look_at(Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(head.pitch, MAX_PITCH);
        assert!((head.gaze_ray().direction.length() - 1.0).abs() < 1e-5);

        head.look_at(Vec3::new(0.0, -5.0, 0.0));
        assert_eq!(head.pitch, -MAX_PITCH);
    }

    #[test]
    fn test_script_cycles() {
        let script = GazeScript::new(vec![
            GazeStep { body: Some("sun".into()), hold_ms: 100.0 },
            GazeStep { body: None, hold_ms: 50.0 },
            GazeStep { body: Some("moon".into()), hold_ms: 100.0 },
        ]);
        assert_eq!(script.body_at(0.0), Some("sun"));
        assert_eq!(script.body_at(120.0), None);
        assert_eq!(script.body_at(150.0), Some("moon"));
        assert_eq!(script.body_at(260.0), Some("sun"));
    }

    #[test]
    fn test_empty_script_looks_at_nothing() {
        assert_eq!(GazeScript::new(Vec::new()).body_at(10.0), None);
    }
}
