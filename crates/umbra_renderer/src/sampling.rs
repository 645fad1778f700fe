//! Random sampling helpers shared by materials, PDFs and the camera.
//!
//! Everything takes the generator explicitly; there is no thread-local RNG.

use rand::{Rng, RngCore};
use std::f32::consts::PI;
use umbra_math::Vec3;

/// Uniform `f32` in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen()
}

/// Uniform index in `0..n`. `n` must be non-zero.
#[inline]
pub fn gen_range_usize(rng: &mut dyn RngCore, n: usize) -> usize {
    rng.gen_range(0..n)
}

/// Random point strictly inside the unit sphere (rejection sampling).
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = random_in_unit_sphere(rng);
        let len_sq = p.length_squared();
        if len_sq > 1e-6 {
            return p / len_sq.sqrt();
        }
    }
}

/// Random point in the unit disk on the XY plane.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0, 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Cosine-weighted direction around +Z.
pub fn random_cosine_direction(rng: &mut dyn RngCore) -> Vec3 {
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);

    let phi = 2.0 * PI * r1;
    let r = r2.sqrt();
    Vec3::new(phi.cos() * r, phi.sin() * r, (1.0 - r2).sqrt())
}

/// Uniform direction inside the cone subtended by a sphere of `radius` at
/// squared distance `distance_squared`, around +Z.
pub fn random_to_sphere(rng: &mut dyn RngCore, radius: f32, distance_squared: f32) -> Vec3 {
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);
    let cos_theta_max = (1.0 - radius * radius / distance_squared).max(0.0).sqrt();
    let z = 1.0 + r2 * (cos_theta_max - 1.0);

    let phi = 2.0 * PI * r1;
    let sin_theta = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, z)
}

/// Orthonormal basis with `w` along a given normal.
#[derive(Debug, Clone, Copy)]
pub struct Onb {
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Onb {
    pub fn from_w(n: Vec3) -> Self {
        let w = n.normalize();
        let a = if w.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let v = w.cross(a).normalize();
        let u = w.cross(v);
        Self { u, v, w }
    }

    #[inline]
    pub fn w(&self) -> Vec3 {
        self.w
    }

    /// Local coordinates to world space.
    #[inline]
    pub fn local(&self, a: Vec3) -> Vec3 {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for _ in 0..1000 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_random_cosine_direction_upper_hemisphere() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        for _ in 0..1000 {
            let v = random_cosine_direction(&mut rng);
            assert!(v.z >= 0.0);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_onb_is_orthonormal() {
        for n in [Vec3::X, Vec3::new(0.3, -0.2, 0.9), -Vec3::Y] {
            let onb = Onb::from_w(n);
            assert!(onb.u.dot(onb.v).abs() < 1e-5);
            assert!(onb.u.dot(onb.w).abs() < 1e-5);
            assert!(onb.v.dot(onb.w).abs() < 1e-5);
            assert!((onb.local(Vec3::Z) - n.normalize()).length() < 1e-5);
        }
    }

    #[test]
    fn test_random_to_sphere_stays_in_cone() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let cos_theta_max = (1.0f32 - 1.0 / 25.0).sqrt();
        for _ in 0..1000 {
            let v = random_to_sphere(&mut rng, 1.0, 25.0);
            assert!(v.z >= cos_theta_max - 1e-5);
        }
    }
}
