//! Monte Carlo path integrator.
//!
//! Each bounce mixes the material's own sampling distribution with one aimed
//! at the scene's lights, divides by the mixture density and recurses. Paths
//! stop at a hard bounce limit; there is no Russian roulette.

use crate::bvh::FirstHitCache;
use crate::config::RenderConfig;
use crate::hittable::{HitRecord, PrimId, RAY_EPSILON};
use crate::material::Color;
use crate::pdf::{LightPdf, MixturePdf, Pdf};
use crate::scene::Scene;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use umbra_math::{Interval, Ray};

/// Counts of numeric repairs made while integrating.
///
/// Shared by every worker; updates are relaxed increments.
#[derive(Debug, Default)]
pub struct Corrections {
    degenerate_pdf: AtomicU64,
    non_finite: AtomicU64,
    clamped: AtomicU64,
}

/// Plain copy of [`Corrections`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionCounts {
    /// Densities below `min_pdf` or non-finite, replaced with 1.
    pub degenerate_pdf: u64,
    /// Sample components that were NaN or infinite, replaced with 0.
    pub non_finite: u64,
    /// Sample components cut down to `max_sample_value`.
    pub clamped: u64,
}

impl Corrections {
    pub fn snapshot(&self) -> CorrectionCounts {
        CorrectionCounts {
            degenerate_pdf: self.degenerate_pdf.load(Ordering::Relaxed),
            non_finite: self.non_finite.load(Ordering::Relaxed),
            clamped: self.clamped.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64, by: u64) {
        if by > 0 {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }
}

pub struct Integrator<'s> {
    scene: &'s Scene,
    lights: &'s [PrimId],
    max_bounces: u32,
    background: Color,
    light_mix: f32,
    min_pdf: f32,
    max_sample_value: f32,
    corrections: Corrections,
}

impl<'s> Integrator<'s> {
    pub fn new(scene: &'s Scene, config: &RenderConfig) -> Self {
        Self {
            scene,
            lights: scene.sampled_lights(config.light_sampling),
            max_bounces: config.max_bounces,
            background: config.background,
            light_mix: config.light_mix,
            min_pdf: config.min_pdf,
            max_sample_value: config.max_sample_value,
            corrections: Corrections::default(),
        }
    }

    pub fn corrections(&self) -> CorrectionCounts {
        self.corrections.snapshot()
    }

    /// Radiance arriving along `ray`, which is bounce number `depth` of its path.
    pub fn ray_color(&self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> Color {
        if depth >= self.max_bounces {
            return Color::ZERO;
        }
        let hit = self.scene.hit(ray, scene_interval());
        self.shade(ray, hit, depth, rng)
    }

    /// Camera-ray sample that resolves its first hit through `cache`.
    pub fn camera_sample(
        &self,
        ray: &Ray,
        sample: u32,
        cache: &mut FirstHitCache,
        rng: &mut dyn RngCore,
    ) -> Color {
        if self.max_bounces == 0 {
            return Color::ZERO;
        }
        let hit = match self.scene.bvh() {
            Some(bvh) => cache.hit(sample, bvh, self.scene.primitives(), ray, scene_interval()),
            None => None,
        };
        self.shade(ray, hit, 0, rng)
    }

    fn shade(&self, ray: &Ray, hit: Option<HitRecord<'_>>, depth: u32, rng: &mut dyn RngCore) -> Color {
        let Some(rec) = hit else {
            return self.background;
        };

        let emission = rec.material.emitted(rec.u, rec.v, rec.p);
        let Some(mut srec) = rec.material.scatter(ray, &rec, rng) else {
            return self.finish(emission);
        };

        let material_pdf = match srec.pdf {
            Some(pdf) if !srec.skip_pdf => pdf,
            _ => {
                let next = self.ray_color(&srec.ray, depth + 1, rng);
                return self.finish(emission + srec.attenuation * next);
            }
        };

        let (direction, density) = if self.lights.is_empty() {
            let d = material_pdf.generate(rng);
            (d, material_pdf.value(d))
        } else {
            let light_pdf = LightPdf::new(rec.p, self.lights, self.scene.primitives());
            let mixture = MixturePdf::new(self.light_mix, &light_pdf, &material_pdf);
            let d = mixture.generate(rng);
            (d, mixture.value(d))
        };

        srec.ray = Ray::new(rec.p, direction);
        let density = self.guard_density(density);
        let response = rec.material.eval(ray, &rec, &srec);
        let next = self.ray_color(&srec.ray, depth + 1, rng);

        self.finish(emission + response * next / density)
    }

    fn guard_density(&self, density: f32) -> f32 {
        if density.is_finite() && density > 0.0 && density >= self.min_pdf {
            density
        } else {
            Corrections::bump(&self.corrections.degenerate_pdf, 1);
            1.0
        }
    }

    /// Zero non-finite components and clamp the rest to `[0, max_sample_value]`.
    fn finish(&self, color: Color) -> Color {
        let mut out = color.to_array();
        let (mut non_finite, mut clamped) = (0, 0);

        for c in &mut out {
            if !c.is_finite() {
                *c = 0.0;
                non_finite += 1;
            } else if *c > self.max_sample_value {
                *c = self.max_sample_value;
                clamped += 1;
            } else if *c < 0.0 {
                *c = 0.0;
            }
        }

        Corrections::bump(&self.corrections.non_finite, non_finite);
        Corrections::bump(&self.corrections.clamped, clamped);
        Color::from_array(out)
    }
}

fn scene_interval() -> Interval {
    Interval::new(RAY_EPSILON, f32::INFINITY)
}
