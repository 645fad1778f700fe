//! Sphere primitive for ray tracing.

use crate::{
    hittable::{HitRecord, Hittable, RAY_EPSILON},
    sampling::{random_to_sphere, Onb},
    Material,
};
use rand::RngCore;
use std::f32::consts::PI;
use umbra_math::{Aabb, Interval, Ray, Vec3};

/// A sphere primitive.
pub struct Sphere<M: Material> {
    center: Vec3,
    radius: f32,
    material: M,
    bbox: Aabb,
}

impl<M: Material> Sphere<M> {
    /// Create a new sphere. Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32, material: M) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            material,
            bbox,
        }
    }

    /// UV coordinates for a point on the unit sphere centered at the origin.
    fn sphere_uv(p: Vec3) -> (f32, f32) {
        // theta: angle down from +Y, phi: angle around Y from +X
        let theta = (-p.y).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }

    /// Cosine of the half-angle of the cone the sphere subtends from a point
    /// at squared distance `distance_squared`. Zero when the point is inside.
    fn cos_theta_max(&self, distance_squared: f32) -> f32 {
        (1.0 - self.radius * self.radius / distance_squared).max(0.0).sqrt()
    }
}

impl<M: Material + 'static> Hittable for Sphere<M> {
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(HitRecord::new(
            ray,
            root,
            outward_normal,
            Self::sphere_uv(outward_normal),
            &self.material,
        ))
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(self.bbox)
    }

    fn center(&self) -> Option<Vec3> {
        Some(self.center)
    }

    /// Uniform density over the cone of directions that reach the sphere.
    fn pdf_value(&self, origin: Vec3, direction: Vec3) -> f32 {
        let to_center = self.center - origin;
        let distance_squared = to_center.length_squared();
        let cos_theta_max = self.cos_theta_max(distance_squared);

        if cos_theta_max == 0.0 {
            // Inside the sphere: samples cover the hemisphere facing the center.
            return if direction.dot(to_center) >= 0.0 {
                1.0 / (2.0 * PI)
            } else {
                0.0
            };
        }

        let ray = Ray::new(origin, direction);
        if self
            .hit(&ray, Interval::new(RAY_EPSILON, f32::INFINITY))
            .is_none()
        {
            return 0.0;
        }
        let solid_angle = 2.0 * PI * (1.0 - cos_theta_max);
        1.0 / solid_angle
    }

    fn random_toward(&self, origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let direction = self.center - origin;
        let distance_squared = direction.length_squared();
        let uvw = Onb::from_w(direction);
        uvw.local(random_to_sphere(rng, self.radius, distance_squared))
    }
}
