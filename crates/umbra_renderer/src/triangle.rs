//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::{
    hittable::{HitRecord, Hittable, RAY_EPSILON},
    sampling::gen_f32,
    Material,
};
use rand::RngCore;
use umbra_math::{Aabb, Interval, Ray, Vec3};

/// Determinants below this are treated as a ray parallel to the triangle.
const PARALLEL_EPSILON: f32 = 1e-8;

/// A triangle primitive.
pub struct Triangle<M: Material> {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// Pre-computed face normal (unit length)
    normal: Vec3,
    area: f32,
    material: M,
    bbox: Aabb,
}

impl<M: Material> Triangle<M> {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: M) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let cross = edge1.cross(edge2);

        // Flat in at least one axis; Aabb pads thin dimensions.
        let bbox = Aabb::surrounding(&Aabb::from_points(v0, v1), &Aabb::from_points(v0, v2));

        Self {
            v0,
            edge1,
            edge2,
            normal: cross.normalize_or_zero(),
            area: 0.5 * cross.length(),
            material,
            bbox,
        }
    }
}

impl<M: Material + 'static> Hittable for Triangle<M> {
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>> {
        let h = ray.direction().cross(self.edge2);
        let a = self.edge1.dot(h);

        if a.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(HitRecord::new(ray, t, self.normal, (u, v), &self.material))
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(self.bbox)
    }

    fn center(&self) -> Option<Vec3> {
        Some(self.v0 + (self.edge1 + self.edge2) / 3.0)
    }

    /// Area-light density converted to solid angle.
    fn pdf_value(&self, origin: Vec3, direction: Vec3) -> f32 {
        let ray = Ray::new(origin, direction);
        let Some(rec) = self.hit(&ray, Interval::new(RAY_EPSILON, f32::INFINITY)) else {
            return 0.0;
        };

        let length = direction.length();
        let distance_squared = (rec.t * length).powi(2);
        let cosine = (direction.dot(self.normal) / length).abs();
        if cosine < 1e-6 || self.area <= 0.0 {
            return 0.0;
        }
        distance_squared / (cosine * self.area)
    }

    fn random_toward(&self, origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        // Uniform barycentric sample.
        let r1 = gen_f32(rng).sqrt();
        let r2 = gen_f32(rng);
        let point = self.v0 + r1 * (1.0 - r2) * self.edge1 + r1 * r2 * self.edge2;
        point - origin
    }
}
