//! Static scene: primitive arena, light list and acceleration structure.

use crate::bvh::{Bvh, BvhBuilder};
use crate::config::LightSampling;
use crate::error::BvhError;
use crate::hittable::{HitRecord, Hittable, HittableList, PrimId};
use rand::RngCore;
use umbra_math::{Interval, Ray};

/// Collects primitives before the BVH is built.
#[derive(Default)]
pub struct SceneBuilder {
    primitives: HittableList,
    lights: Vec<PrimId>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: impl Hittable + 'static) -> PrimId {
        self.primitives.add(Box::new(object))
    }

    /// Add an emissive primitive that direct-light sampling should aim at.
    pub fn add_light(&mut self, object: impl Hittable + 'static) -> PrimId {
        let id = self.add(object);
        self.lights.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Freeze the scene and build its BVH.
    ///
    /// A scene with no primitives is valid; every ray simply misses.
    pub fn build(self, builder: BvhBuilder, rng: &mut dyn RngCore) -> Result<Scene, BvhError> {
        let bvh = if self.primitives.is_empty() {
            log::warn!("Scene has no primitives; every ray will see the background");
            None
        } else {
            Some(Bvh::build(&self.primitives, builder, rng)?)
        };

        Ok(Scene {
            primitives: self.primitives,
            lights: self.lights,
            bvh,
        })
    }
}

/// Read-only scene shared by every render worker.
pub struct Scene {
    primitives: HittableList,
    lights: Vec<PrimId>,
    bvh: Option<Bvh>,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::new()
    }

    /// Nearest hit through the BVH.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        self.bvh.as_ref()?.hit(&self.primitives, ray, ray_t)
    }

    pub fn primitives(&self) -> &HittableList {
        &self.primitives
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn lights(&self) -> &[PrimId] {
        &self.lights
    }

    /// Lights that direct-light sampling draws from under `mode`.
    pub fn sampled_lights(&self, mode: LightSampling) -> &[PrimId] {
        match mode {
            LightSampling::First => &self.lights[..self.lights.len().min(1)],
            LightSampling::Uniform => &self.lights,
        }
    }
}
