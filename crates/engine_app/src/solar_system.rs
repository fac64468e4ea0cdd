//! Sun, earth and moon on circular orbits
//!
//! The earth circles the sun and the moon circles the earth, both in the
//! horizontal plane. Orbit angles only move when the engine advances the
//! scene, so pausing freezes every body in place.

use engine_core::Scene;
use gaze_select::PickTarget;
use glam::{Quat, Vec3};
use math_util::Sphere;

use crate::config::SceneConfig;

pub const SUN: &str = "sun";
pub const EARTH: &str = "earth";
pub const MOON: &str = "moon";

const SUN_RADIUS: f32 = 0.5;
const EARTH_RADIUS: f32 = 0.2;
const MOON_RADIUS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Star,
    Planet,
    Moon,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub name: &'static str,
    pub kind: BodyKind,
    pub radius: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
pub struct SolarSystem {
    config: SceneConfig,
    earth_angle: f32,
    moon_angle: f32,
    elapsed_ms: f64,
}

impl SolarSystem {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            earth_angle: 0.0,
            moon_angle: 0.0,
            elapsed_ms: 0.0,
        }
    }

    /// Scene time accumulated while playing
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn bodies(&self) -> [Body; 3] {
        let sun = Vec3::from(self.config.center);
        let earth = sun + Quat::from_rotation_y(self.earth_angle) * Vec3::new(self.config.earth_distance, 0.0, 0.0);
        let moon = earth + Quat::from_rotation_y(self.moon_angle) * Vec3::new(self.config.moon_distance, 0.0, 0.0);

        [
            Body {
                name: SUN,
                kind: BodyKind::Star,
                radius: SUN_RADIUS,
                position: sun,
            },
            Body {
                name: EARTH,
                kind: BodyKind::Planet,
                radius: EARTH_RADIUS,
                position: earth,
            },
            Body {
                name: MOON,
                kind: BodyKind::Moon,
                radius: MOON_RADIUS,
                position: moon,
            },
        ]
    }

    pub fn body(&self, name: &str) -> Option<Body> {
        self.bodies().into_iter().find(|b| b.name == name)
    }
}

impl Scene for SolarSystem {
    fn advance(&mut self, dt_ms: f64) {
        let dt_s = (dt_ms / 1000.0) as f32;
        self.earth_angle = (self.earth_angle + self.config.earth_orbit_rate * dt_s) % std::f32::consts::TAU;
        self.moon_angle = (self.moon_angle + self.config.moon_orbit_rate * dt_s) % std::f32::consts::TAU;
        self.elapsed_ms += dt_ms;
    }

    fn pick_targets(&self) -> Vec<PickTarget> {
        // Moon first: it sits in front of the earth more often than not.
        let [sun, earth, moon] = self.bodies();
        [moon, earth, sun]
            .into_iter()
            .map(|b| PickTarget::new(b.name, Sphere::new(b.position, b.radius)))
            .collect()
    }
}
