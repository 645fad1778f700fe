//! Material trait for surface scattering.

use crate::pdf::{CosinePdf, GgxPdf, ScatterPdf};
use crate::sampling::{gen_f32, random_in_unit_sphere};
use crate::texture::{SolidColor, Texture};
use crate::{hittable::HitRecord, Ray};
use rand::RngCore;
use std::f32::consts::PI;
use std::sync::Arc;
use umbra_math::Vec3;

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Result of a material's scatter step.
#[derive(Debug, Clone, Copy)]
pub struct ScatterRecord {
    /// Proposed outgoing ray. For sampled bounces the integrator replaces the
    /// direction with one drawn from the PDF mixture.
    pub ray: Ray,
    /// Attenuation applied on delta bounces (`skip_pdf`).
    pub attenuation: Color,
    /// Material importance-sampling distribution, if any.
    pub pdf: Option<ScatterPdf>,
    /// Perfectly specular bounce: follow `ray` with an implicit density of 1.
    pub skip_pdf: bool,
}

impl ScatterRecord {
    /// Delta bounce along `ray`.
    pub fn specular(ray: Ray, attenuation: Color) -> Self {
        Self {
            ray,
            attenuation,
            pdf: None,
            skip_pdf: true,
        }
    }

    /// Bounce whose direction is drawn from `pdf`.
    pub fn sampled(rec: &HitRecord, attenuation: Color, pdf: ScatterPdf) -> Self {
        Self {
            ray: Ray::new(rec.p, rec.normal),
            attenuation,
            pdf: Some(pdf),
            skip_pdf: false,
        }
    }
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Scatter an incoming ray, or `None` if it is absorbed.
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterRecord>;

    /// Get emitted light from this material.
    ///
    /// Most materials return black (no emission).
    fn emitted(&self, _u: f32, _v: f32, _p: Vec3) -> Color {
        Color::ZERO
    }

    /// BRDF times cosine for the direction in `srec.ray`.
    ///
    /// Only called for sampled (non-delta) bounces.
    fn eval(&self, _ray_in: &Ray, _rec: &HitRecord, _srec: &ScatterRecord) -> Color {
        Color::ZERO
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    albedo: Arc<dyn Texture>,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self::textured(SolidColor(albedo))
    }

    /// Albedo looked up per hit from `texture`.
    pub fn textured(texture: impl Texture + 'static) -> Self {
        Self {
            albedo: Arc::new(texture),
        }
    }

    fn albedo_at(&self, rec: &HitRecord) -> Color {
        self.albedo.value(rec.u, rec.v, rec.p)
    }
}

impl Material for Lambertian {
    fn scatter(&self, _ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterRecord> {
        let pdf = ScatterPdf::Cosine(CosinePdf::new(rec.normal));
        Some(ScatterRecord::sampled(rec, self.albedo_at(rec), pdf))
    }

    fn eval(&self, _ray_in: &Ray, rec: &HitRecord, srec: &ScatterRecord) -> Color {
        let cosine = rec.normal.dot(srec.ray.direction().normalize());
        self.albedo_at(rec) * (cosine.max(0.0) / PI)
    }
}

/// Metal (specular) material.
#[derive(Debug, Clone)]
pub struct Metal {
    albedo: Color,
    fuzz: f32,
}

impl Metal {
    /// - `albedo`: The color of the metal
    /// - `fuzz`: Roughness, 0.0 = perfect mirror, 1.0 = very rough
    pub fn new(albedo: Color, fuzz: f32) -> Self {
        Self {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }
}

impl Material for Metal {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterRecord> {
        let reflected = reflect(ray_in.direction().normalize(), rec.normal);
        let direction = reflected + self.fuzz * random_in_unit_sphere(rng);

        // Fuzz can push the reflection below the surface; absorb those.
        (direction.dot(rec.normal) > 0.0)
            .then(|| ScatterRecord::specular(Ray::new(rec.p, direction), self.albedo))
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone)]
pub struct Dielectric {
    /// Index of refraction
    ior: f32,
}

impl Dielectric {
    /// - `ior`: Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub fn new(ior: f32) -> Self {
        Self { ior }
    }
}

impl Material for Dielectric {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterRecord> {
        let refraction_ratio = if rec.front_face { 1.0 / self.ior } else { self.ior };

        let unit_direction = ray_in.direction().normalize();
        let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        // Total internal reflection, or a stochastic pick between the two lobes.
        let cannot_refract = refraction_ratio * sin_theta > 1.0;
        let direction = if cannot_refract || reflectance(cos_theta, refraction_ratio) > gen_f32(rng) {
            reflect(unit_direction, rec.normal)
        } else {
            refract(unit_direction, rec.normal, refraction_ratio)
        };

        Some(ScatterRecord::specular(Ray::new(rec.p, direction), Color::ONE))
    }
}

/// Diffuse light emitter.
#[derive(Debug, Clone)]
pub struct DiffuseLight {
    emit: Arc<dyn Texture>,
}

impl DiffuseLight {
    pub fn new(emit: Color) -> Self {
        Self::textured(SolidColor(emit))
    }

    /// Radiance that varies over the surface.
    pub fn textured(texture: impl Texture + 'static) -> Self {
        Self {
            emit: Arc::new(texture),
        }
    }
}

impl Material for DiffuseLight {
    fn scatter(&self, _ray_in: &Ray, _rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterRecord> {
        None
    }

    fn emitted(&self, u: f32, v: f32, p: Vec3) -> Color {
        self.emit.value(u, v, p)
    }
}

/// Glossy microfacet material: Cook-Torrance specular (GGX distribution,
/// Smith-Schlick geometry, Schlick Fresnel) over a Lambertian base,
/// importance sampled with the GGX distribution.
#[derive(Debug, Clone)]
pub struct Glossy {
    base_color: Color,
    roughness: f32,
    metallic: f32,
}

impl Glossy {
    /// Very low roughness makes the GGX lobe a near-delta; keep it sampleable.
    const MIN_ROUGHNESS: f32 = 0.05;

    pub fn new(base_color: Color, roughness: f32, metallic: f32) -> Self {
        Self {
            base_color,
            roughness: roughness.clamp(Self::MIN_ROUGHNESS, 1.0),
            metallic: metallic.clamp(0.0, 1.0),
        }
    }
}

impl Material for Glossy {
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterRecord> {
        let view = -ray_in.direction().normalize();
        let pdf = ScatterPdf::Ggx(GgxPdf::new(view, rec.normal, self.roughness));
        Some(ScatterRecord::sampled(rec, self.base_color, pdf))
    }

    fn eval(&self, ray_in: &Ray, rec: &HitRecord, srec: &ScatterRecord) -> Color {
        let v = -ray_in.direction().normalize();
        let l = srec.ray.direction().normalize();
        let n = rec.normal;

        let n_dot_l = n.dot(l);
        if n_dot_l <= 0.0 {
            return Color::ZERO;
        }
        cook_torrance(v, l, n, self.metallic, self.roughness, self.base_color) * n_dot_l
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub(crate) fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a vector through a surface.
#[inline]
fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation for reflectance
fn reflectance(cosine: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

fn schlick_fresnel(f0: Color, cos_theta: f32) -> Color {
    f0 + (Color::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

/// GGX / Trowbridge-Reitz normal distribution, `alpha = roughness^2`.
pub(crate) fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let term = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * term * term)
}

fn geometry_schlick_ggx(n_dot_v: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick_ggx(n_dot_v.max(0.0), roughness) * geometry_schlick_ggx(n_dot_l.max(0.0), roughness)
}

fn cook_torrance(v: Vec3, l: Vec3, n: Vec3, metallic: f32, roughness: f32, c: Color) -> Color {
    // Dielectrics reflect ~4% at normal incidence.
    let f0 = Color::splat(0.04).lerp(c, metallic);

    let h = (v + l).normalize();
    let n_dot_v = n.dot(v);
    let n_dot_l = n.dot(l);

    let d = distribution_ggx(n.dot(h), roughness);
    let g = geometry_smith(n_dot_v, n_dot_l, roughness);
    let f = schlick_fresnel(f0, v.dot(h).max(0.0));

    let kd = (Color::ONE - f) * (1.0 - metallic);
    let specular = d * g * f / (4.0 * n_dot_v.max(0.0) * n_dot_l.max(0.0) + 1e-6);
    let diffuse = kd * c / PI;

    diffuse + specular
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::PrimId;
    use crate::pdf::Pdf;
    use crate::texture::CheckerTexture;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn record<'a>(material: &'a dyn Material) -> HitRecord<'a> {
        HitRecord {
            p: Vec3::ZERO,
            normal: Vec3::Y,
            material,
            prim: PrimId(0),
            u: 0.0,
            v: 0.0,
            t: 1.0,
            front_face: true,
        }
    }

    #[test]
    fn test_lambertian_eval_over_pdf_is_albedo() {
        let mat = Lambertian::new(Color::new(0.2, 0.4, 0.8));
        let rec = record(&mat);
        let ray_in = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(11);

        let srec = mat.scatter(&ray_in, &rec, &mut rng).unwrap();
        let pdf = srec.pdf.unwrap();
        let dir = pdf.generate(&mut rng);
        let srec = ScatterRecord {
            ray: Ray::new(rec.p, dir),
            ..srec
        };

        let ratio = mat.eval(&ray_in, &rec, &srec) / pdf.value(dir);
        assert!((ratio - Color::new(0.2, 0.4, 0.8)).length() < 1e-3);
    }

    #[test]
    fn test_metal_mirror_reflects() {
        let mat = Metal::new(Color::ONE, 0.0);
        let rec = record(&mat);
        let ray_in = Ray::new(Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(12);

        let srec = mat.scatter(&ray_in, &rec, &mut rng).unwrap();
        assert!(srec.skip_pdf);
        assert!((srec.ray.direction().normalize() - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn test_diffuse_light_emits_and_absorbs() {
        let mat = DiffuseLight::new(Color::splat(4.0));
        let rec = record(&mat);
        let mut rng = Xoshiro256StarStar::seed_from_u64(13);

        assert!(mat.scatter(&Ray::default(), &rec, &mut rng).is_none());
        assert_eq!(mat.emitted(0.0, 0.0, Vec3::ZERO), Color::splat(4.0));
    }

    #[test]
    fn test_glossy_eval_is_finite_and_non_negative() {
        let mat = Glossy::new(Color::new(0.9, 0.6, 0.2), 0.3, 0.5);
        let rec = record(&mat);
        let ray_in = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(14);

        for _ in 0..200 {
            let srec = mat.scatter(&ray_in, &rec, &mut rng).unwrap();
            let dir = srec.pdf.unwrap().generate(&mut rng);
            let srec = ScatterRecord {
                ray: Ray::new(rec.p, dir),
                ..srec
            };
            let value = mat.eval(&ray_in, &rec, &srec);
            assert!(value.is_finite());
            assert!(value.min_element() >= 0.0);
        }
    }

    #[test]
    fn test_dielectric_always_scatters() {
        let mat = Dielectric::new(1.5);
        let rec = record(&mat);
        let ray_in = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.3, -1.0, 0.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(15);

        for _ in 0..50 {
            let srec = mat.scatter(&ray_in, &rec, &mut rng).unwrap();
            assert!(srec.skip_pdf);
            assert_eq!(srec.attenuation, Color::ONE);
        }
    }

    #[test]
    fn test_textured_lambertian_reads_hit_uv() {
        let white = Color::ONE;
        let black = Color::ZERO;
        let mat = Lambertian::textured(CheckerTexture::new(white, black, 2.0));
        let ray_in = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(16);

        let mut rec = record(&mat);
        rec.u = 0.25;
        rec.v = 0.25;
        let srec = mat.scatter(&ray_in, &rec, &mut rng).unwrap();
        assert_eq!(srec.attenuation, white);
        let lit = mat.eval(&ray_in, &rec, &srec);

        rec.u = 0.75;
        let srec = mat.scatter(&ray_in, &rec, &mut rng).unwrap();
        assert_eq!(srec.attenuation, black);
        assert_eq!(mat.eval(&ray_in, &rec, &srec), Color::ZERO);
        assert!(lit.max_element() > 0.0);
    }

    #[test]
    fn test_textured_light_emits_texture_value() {
        let warm = Color::new(4.0, 2.0, 1.0);
        let light = DiffuseLight::textured(CheckerTexture::new(warm, Color::ZERO, 1.0));
        assert_eq!(light.emitted(0.5, 0.5, Vec3::ZERO), warm);
        assert_eq!(light.emitted(1.5, 0.5, Vec3::ZERO), Color::ZERO);
        assert_eq!(DiffuseLight::new(warm).emitted(0.9, 0.1, Vec3::ONE), warm);
    }
}
