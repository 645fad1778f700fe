//! Hittable trait, HitRecord, and the scene's primitive arena.

use crate::sampling::gen_range_usize;
use crate::Material;
use rand::RngCore;
use umbra_math::{Aabb, Interval, Ray, Vec3};

/// Lower bound of the ray interval used for every scene query, to skip
/// self-intersections at the ray origin.
pub const RAY_EPSILON: f32 = 0.001;

/// Handle to a primitive stored in a [`HittableList`].
///
/// The BVH, light lists and first-hit cache only ever hold these; the list
/// owns the primitives themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimId(pub u32);

impl PrimId {
    /// Placeholder used by primitives that do not know their own id.
    /// Every query that goes through a list or a BVH overwrites it.
    pub const UNASSIGNED: PrimId = PrimId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Record of a ray-object intersection.
#[derive(Clone, Copy)]
pub struct HitRecord<'a> {
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Material at the intersection point
    pub material: &'a dyn Material,
    /// Primitive that was hit
    pub prim: PrimId,
    /// UV texture coordinates
    pub u: f32,
    pub v: f32,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl<'a> HitRecord<'a> {
    /// Build a record with the normal oriented against `ray`.
    pub fn new(
        ray: &Ray,
        t: f32,
        outward_normal: Vec3,
        (u, v): (f32, f32),
        material: &'a dyn Material,
    ) -> Self {
        let mut rec = Self {
            p: ray.at(t),
            normal: outward_normal,
            material,
            prim: PrimId::UNASSIGNED,
            u,
            v,
            t,
            front_face: true,
        };
        rec.set_face_normal(ray, outward_normal);
        rec
    }

    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

impl std::fmt::Debug for HitRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HitRecord")
            .field("p", &self.p)
            .field("normal", &self.normal)
            .field("prim", &self.prim)
            .field("t", &self.t)
            .field("front_face", &self.front_face)
            .finish_non_exhaustive()
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Nearest intersection with this object strictly inside `ray_t`.
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>>;

    /// Bounding box, or `None` for unbounded geometry.
    ///
    /// The BVH refuses to build over primitives that return `None`.
    fn bounding_box(&self) -> Option<Aabb>;

    /// Representative point used by the SAH builder to partition primitives.
    fn center(&self) -> Option<Vec3> {
        self.bounding_box().map(|b| b.centroid())
    }

    /// Solid-angle density of [`Hittable::random_toward`] for a direction
    /// leaving `origin`.
    ///
    /// The default treats the object as a flat emitter spread over its
    /// (slightly shrunken) bounding box. Shapes with a closed form override it.
    fn pdf_value(&self, origin: Vec3, direction: Vec3) -> f32 {
        let Some(bbox) = self.bounding_box() else {
            return 0.0;
        };
        let ray = Ray::new(origin, direction);
        let Some(rec) = self.hit(&ray, Interval::new(RAY_EPSILON, f32::INFINITY)) else {
            return 0.0;
        };

        let length = direction.length();
        let distance_squared = (rec.t * length).powi(2);
        let cosine = (direction.dot(rec.normal) / length).abs();
        let area = 0.5 * light_box(&bbox).surface_area();
        if cosine < 1e-6 || area <= 0.0 {
            return 0.0;
        }
        distance_squared / (cosine * area)
    }

    /// Direction from `origin` toward a random point on (or near) this object.
    fn random_toward(&self, origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        match self.bounding_box() {
            Some(bbox) => light_box(&bbox).random_point(rng) - origin,
            None => crate::sampling::random_unit_vector(rng),
        }
    }
}

/// Box used for approximate light sampling: shrunk so samples are aimed at
/// the interior of an emitter rather than its silhouette.
fn light_box(bbox: &Aabb) -> Aabb {
    bbox.scaled(0.9)
}

/// Arena of scene primitives, addressed by [`PrimId`].
///
/// Also serves as the brute-force reference intersector.
pub struct HittableList {
    objects: Vec<Box<dyn Hittable>>,
    bbox: Aabb,
}

impl HittableList {
    /// Create a new empty hittable list.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            bbox: Aabb::EMPTY,
        }
    }

    /// Add an object to the list and return its handle.
    pub fn add(&mut self, object: Box<dyn Hittable>) -> PrimId {
        if let Some(b) = object.bounding_box() {
            self.bbox = Aabb::surrounding(&self.bbox, &b);
        }
        let id = PrimId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    #[inline]
    pub fn get(&self, id: PrimId) -> &dyn Hittable {
        self.objects[id.index()].as_ref()
    }

    /// Iterate over `(id, primitive)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PrimId, &dyn Hittable)> + '_ {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (PrimId(i as u32), o.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Union of all bounded objects' boxes.
    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    /// Nearest hit among the given subset of primitives.
    pub fn hit_subset<'a>(
        &'a self,
        ids: &[PrimId],
        ray: &Ray,
        ray_t: Interval,
    ) -> Option<HitRecord<'a>> {
        let mut closest: Option<HitRecord<'a>> = None;
        for &id in ids {
            let interval = closest.map_or(ray_t, |c| ray_t.with_max(c.t));
            if let Some(mut rec) = self.get(id).hit(ray, interval) {
                rec.prim = id;
                closest = Some(rec);
            }
        }
        closest
    }

    /// Mean of the member densities; the matching sampler picks a member
    /// uniformly and aims at it.
    pub fn pdf_value_subset(&self, ids: &[PrimId], origin: Vec3, direction: Vec3) -> f32 {
        if ids.is_empty() {
            return 0.0;
        }
        let weight = 1.0 / ids.len() as f32;
        ids.iter()
            .map(|&id| weight * self.get(id).pdf_value(origin, direction))
            .sum()
    }

    /// Direction toward a uniformly chosen member of `ids`.
    pub fn random_toward_subset(&self, ids: &[PrimId], origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let pick = ids[gen_range_usize(rng, ids.len())];
        self.get(pick).random_toward(origin, rng)
    }
}

impl Default for HittableList {
    fn default() -> Self {
        Self::new()
    }
}

impl Hittable for HittableList {
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>> {
        let mut closest: Option<HitRecord<'a>> = None;
        for (id, object) in self.iter() {
            let interval = closest.map_or(ray_t, |c| ray_t.with_max(c.t));
            if let Some(mut rec) = object.hit(ray, interval) {
                rec.prim = id;
                closest = Some(rec);
            }
        }
        closest
    }

    fn bounding_box(&self) -> Option<Aabb> {
        (!self.is_empty()).then_some(self.bbox)
    }
}
