//! Importance-sampling distributions over directions.
//!
//! A [`Pdf`] draws a direction and reports the solid-angle density of any
//! direction under the same distribution. The integrator mixes a material's
//! distribution with one aimed at the scene's lights.

use crate::hittable::{HittableList, PrimId};
use crate::material::distribution_ggx;
use crate::sampling::{gen_f32, random_cosine_direction, random_unit_vector, Onb};
use rand::RngCore;
use std::f32::consts::PI;
use umbra_math::Vec3;

pub trait Pdf {
    /// Density of `direction` (need not be normalized).
    fn value(&self, direction: Vec3) -> f32;

    /// Draw a direction from the distribution.
    fn generate(&self, rng: &mut dyn RngCore) -> Vec3;
}

/// Cosine-weighted hemisphere around a normal.
#[derive(Debug, Clone, Copy)]
pub struct CosinePdf {
    uvw: Onb,
}

impl CosinePdf {
    pub fn new(normal: Vec3) -> Self {
        Self {
            uvw: Onb::from_w(normal),
        }
    }
}

impl Pdf for CosinePdf {
    fn value(&self, direction: Vec3) -> f32 {
        let cosine = direction.normalize().dot(self.uvw.w());
        (cosine / PI).max(0.0)
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Vec3 {
        self.uvw.local(random_cosine_direction(rng))
    }
}

/// GGX microfacet distribution of reflected directions for a fixed view.
#[derive(Debug, Clone, Copy)]
pub struct GgxPdf {
    view: Vec3,
    uvw: Onb,
    roughness: f32,
}

impl GgxPdf {
    /// `view` points from the surface toward the viewer.
    pub fn new(view: Vec3, normal: Vec3, roughness: f32) -> Self {
        Self {
            view: view.normalize(),
            uvw: Onb::from_w(normal),
            roughness,
        }
    }
}

impl Pdf for GgxPdf {
    fn value(&self, direction: Vec3) -> f32 {
        let l = direction.normalize();
        let n = self.uvw.w();
        let h = (self.view + l).normalize();

        let n_dot_h = n.dot(h);
        let v_dot_h = self.view.dot(h).abs();
        if n_dot_h <= 0.0 || v_dot_h < 1e-6 || !h.is_finite() {
            return 0.0;
        }
        (distribution_ggx(n_dot_h, self.roughness) * n_dot_h / (4.0 * v_dot_h)).max(0.0)
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Vec3 {
        let r0 = gen_f32(rng);
        let r1 = gen_f32(rng);

        let a = self.roughness * self.roughness;
        let a2 = a * a;
        let cos_theta = ((1.0 - r0) / ((a2 - 1.0) * r0 + 1.0)).sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * r1;

        // Microfacet normal, then mirror the view about it.
        let h = self
            .uvw
            .local(Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta));
        2.0 * self.view.dot(h) * h - self.view
    }
}

/// Uniform over the whole sphere.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPdf;

impl Pdf for UniformPdf {
    fn value(&self, _direction: Vec3) -> f32 {
        1.0 / (4.0 * PI)
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Vec3 {
        random_unit_vector(rng)
    }
}

/// Distributions a material can hand back from `scatter`.
///
/// A closed set so scatter records stay `Copy` and nothing is boxed per bounce.
#[derive(Debug, Clone, Copy)]
pub enum ScatterPdf {
    Cosine(CosinePdf),
    Ggx(GgxPdf),
    Uniform(UniformPdf),
}

impl Pdf for ScatterPdf {
    fn value(&self, direction: Vec3) -> f32 {
        match self {
            ScatterPdf::Cosine(p) => p.value(direction),
            ScatterPdf::Ggx(p) => p.value(direction),
            ScatterPdf::Uniform(p) => p.value(direction),
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Vec3 {
        match self {
            ScatterPdf::Cosine(p) => p.generate(rng),
            ScatterPdf::Ggx(p) => p.generate(rng),
            ScatterPdf::Uniform(p) => p.generate(rng),
        }
    }
}

/// Directions from `origin` toward a set of emissive primitives.
///
/// `generate` picks one light uniformly and samples toward it; `value`
/// averages the lights' densities accordingly.
pub struct LightPdf<'a> {
    origin: Vec3,
    lights: &'a [PrimId],
    primitives: &'a HittableList,
}

impl<'a> LightPdf<'a> {
    /// `lights` must not be empty.
    pub fn new(origin: Vec3, lights: &'a [PrimId], primitives: &'a HittableList) -> Self {
        debug_assert!(!lights.is_empty());
        Self {
            origin,
            lights,
            primitives,
        }
    }
}

impl Pdf for LightPdf<'_> {
    fn value(&self, direction: Vec3) -> f32 {
        self.primitives
            .pdf_value_subset(self.lights, self.origin, direction)
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Vec3 {
        self.primitives
            .random_toward_subset(self.lights, self.origin, rng)
    }
}

/// Blend of two distributions: `weight` of the first, the rest of the second.
pub struct MixturePdf<'a> {
    weight: f32,
    first: &'a dyn Pdf,
    second: &'a dyn Pdf,
}

impl<'a> MixturePdf<'a> {
    pub fn new(weight: f32, first: &'a dyn Pdf, second: &'a dyn Pdf) -> Self {
        Self {
            weight: weight.clamp(0.0, 1.0),
            first,
            second,
        }
    }
}

impl Pdf for MixturePdf<'_> {
    fn value(&self, direction: Vec3) -> f32 {
        self.weight * self.first.value(direction) + (1.0 - self.weight) * self.second.value(direction)
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Vec3 {
        if gen_f32(rng) < self.weight {
            self.first.generate(rng)
        } else {
            self.second.generate(rng)
        }
    }
}
