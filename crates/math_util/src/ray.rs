//! Ray casting against bounding spheres
//!
//! Provides the screen-center gaze ray and the ray/sphere test used to
//! resolve which selectable body sits under it. Distances are measured along
//! the (normalized) ray direction, so results from different spheres can be
//! compared directly to find the closest hit.

use glam::Vec3;

/// A half-line starting at `origin` and extending along `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point (viewer position)
    pub origin: Vec3,
    /// Unit-length direction
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction
    ///
    /// A degenerate (zero or non-finite) direction falls back to `-Z`, the
    /// default forward axis of a camera.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }

    /// Ray from `origin` towards `target`
    pub fn towards(origin: Vec3, target: Vec3) -> Self {
        Self::new(origin, target - origin)
    }

    /// Point at distance `t` along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Bounding sphere of a selectable body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Distance along `ray` to the first intersection with the sphere
    ///
    /// Returns `Some(0.0)` when the ray starts inside the sphere and `None`
    /// when the sphere is missed or lies entirely behind the origin.
    pub fn ray_distance(&self, ray: &Ray) -> Option<f32> {
        if self.radius.is_nan() || self.radius <= 0.0 {
            return None;
        }

        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        // Origin inside the sphere
        if c <= 0.0 {
            return Some(0.0);
        }

        // Origin outside and pointing away
        if b > 0.0 {
            return None;
        }

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        Some(-b - discriminant.sqrt())
    }
}
