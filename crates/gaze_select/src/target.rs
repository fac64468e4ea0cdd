//! Selectable targets and closest-hit resolution under the gaze ray

use std::fmt;

use glam::Vec3;
use math_util::{Ray, Sphere};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a selectable body (e.g. `"earth"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Anything the gaze ray can land on
pub trait Pickable {
    fn target_id(&self) -> &TargetId;

    /// Distance along `ray` to the first hit, `None` on a miss
    fn ray_distance(&self, ray: &Ray) -> Option<f32>;

    /// Radius used to size the dwell cursor around the target
    fn bounding_radius(&self) -> Option<f32> {
        None
    }

    /// World position the dwell cursor attaches to
    fn anchor(&self) -> Option<Vec3> {
        None
    }
}

/// A target bounded by a sphere, the shape of every body in the solar system scene
#[derive(Debug, Clone, PartialEq)]
pub struct PickTarget {
    pub id: TargetId,
    pub bounds: Sphere,
}

impl PickTarget {
    pub fn new(id: impl Into<TargetId>, bounds: Sphere) -> Self {
        Self {
            id: id.into(),
            bounds,
        }
    }
}

impl Pickable for PickTarget {
    fn target_id(&self) -> &TargetId {
        &self.id
    }

    fn ray_distance(&self, ray: &Ray) -> Option<f32> {
        self.bounds.ray_distance(ray)
    }

    fn bounding_radius(&self) -> Option<f32> {
        Some(self.bounds.radius)
    }

    fn anchor(&self) -> Option<Vec3> {
        Some(self.bounds.center)
    }
}

/// Closest candidate intersected by `ray`
///
/// Candidates at exactly the same distance resolve to the one that comes
/// first in `candidates`.
pub fn pick_nearest<'a, P: Pickable>(ray: &Ray, candidates: &'a [P]) -> Option<&'a P> {
    let mut best: Option<(&'a P, f32)> = None;

    for candidate in candidates {
        let Some(distance) = candidate.ray_distance(ray) else {
            continue;
        };
        if !distance.is_finite() {
            continue;
        }

        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }

    best.map(|(candidate, _)| candidate)
}
