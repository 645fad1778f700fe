use crate::Vec3;

/// A ray in 3D space.
///
/// The reciprocal of the direction is computed once at construction so the
/// slab test in [`crate::Aabb::hit`] is three multiplies per axis. The fields
/// are private to keep the two in sync; use [`Ray::with_direction`] to aim a
/// ray somewhere else.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction does not need to be normalized.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            // Zero components become ±inf, which the slab test relies on.
            inv_direction: direction.recip(),
        }
    }

    /// Same origin, new direction.
    #[inline]
    pub fn with_direction(&self, direction: Vec3) -> Self {
        Self::new(self.origin, direction)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Componentwise `1 / direction`.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
