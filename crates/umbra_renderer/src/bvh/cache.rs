//! Per-pixel first-hit cache.
//!
//! Early samples of a pixel trace the camera ray through the full tree and
//! remember which primitives they hit. From the cutoff sample on, the camera
//! ray is tested only against those remembered primitives. This is a biased
//! shortcut: geometry first seen after the cutoff is missed. It is opt-in and
//! only ever applies to the first bounce.

use super::Bvh;
use crate::hittable::{HitRecord, HittableList, PrimId};
use umbra_math::{Interval, Ray};

pub const FIRST_HIT_CACHE_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
pub struct FirstHitCache {
    prims: [PrimId; FIRST_HIT_CACHE_CAPACITY],
    len: usize,
    cutoff: u32,
}

impl FirstHitCache {
    /// Cache that switches over at `floor(samples_per_pixel * fraction)`.
    ///
    /// The cutoff is at least 1 so the first sample always fills the cache
    /// from the full tree.
    pub fn new(samples_per_pixel: u32, fraction: f32) -> Self {
        let cutoff = (samples_per_pixel as f32 * fraction.clamp(0.0, 1.0)).floor() as u32;
        let cutoff = cutoff.max(1);
        Self {
            prims: [PrimId::UNASSIGNED; FIRST_HIT_CACHE_CAPACITY],
            len: 0,
            cutoff,
        }
    }

    /// Forget everything; called at the start of each pixel.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn cutoff(&self) -> u32 {
        self.cutoff
    }

    pub fn cached(&self) -> &[PrimId] {
        &self.prims[..self.len]
    }

    pub fn contains(&self, id: PrimId) -> bool {
        self.cached().contains(&id)
    }

    /// Remember `id`. Once full, further primitives are dropped.
    pub fn insert(&mut self, id: PrimId) {
        if self.len < FIRST_HIT_CACHE_CAPACITY && !self.contains(id) {
            self.prims[self.len] = id;
            self.len += 1;
        }
    }

    /// First-bounce intersection for sample number `sample` of this pixel.
    pub fn hit<'a>(
        &mut self,
        sample: u32,
        bvh: &Bvh,
        primitives: &'a HittableList,
        ray: &Ray,
        ray_t: Interval,
    ) -> Option<HitRecord<'a>> {
        if sample >= self.cutoff {
            return primitives.hit_subset(self.cached(), ray, ray_t);
        }

        let rec = bvh.hit(primitives, ray, ray_t)?;
        self.insert(rec.prim);
        Some(rec)
    }
}
