//! Surface textures looked up by hit-point UV and position.
//!
//! [`Lambertian`](crate::Lambertian) reads its albedo and
//! [`DiffuseLight`](crate::DiffuseLight) its emission through a [`Texture`],
//! so the `u`/`v` a primitive reports in its [`HitRecord`](crate::HitRecord)
//! drives shading.

use crate::material::Color;
use crate::sampling::gen_f32;
use rand::RngCore;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use umbra_math::Vec3;

/// Color as a function of surface coordinates.
pub trait Texture: Send + Sync + fmt::Debug {
    /// `u`, `v` in `[0, 1]` from the hit record; `p` is the world-space hit point.
    fn value(&self, u: f32, v: f32, p: Vec3) -> Color;
}

/// Constant color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidColor(pub Color);

impl Texture for SolidColor {
    fn value(&self, _u: f32, _v: f32, _p: Vec3) -> Color {
        self.0
    }
}

/// Two-color checkerboard in UV space, `scale` squares along each axis.
#[derive(Debug, Clone, Copy)]
pub struct CheckerTexture {
    even: Color,
    odd: Color,
    scale: f32,
}

impl CheckerTexture {
    pub fn new(even: Color, odd: Color, scale: f32) -> Self {
        Self { even, odd, scale }
    }
}

impl Default for CheckerTexture {
    fn default() -> Self {
        Self::new(Color::ZERO, Color::ONE, 10.0)
    }
}

impl Texture for CheckerTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Color {
        let cell = (u * self.scale).floor() as i64 + (v * self.scale).floor() as i64;
        if cell.rem_euclid(2) == 0 {
            self.even
        } else {
            self.odd
        }
    }
}

/// Shows the UV parameterization itself: red is `u`, green is `v`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UvTexture;

impl Texture for UvTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Color {
        Color::new(u.clamp(0.0, 1.0), v.clamp(0.0, 1.0), 0.9)
    }
}

/// Value noise on a lattice of random values, blended trilinearly.
///
/// Unlike the UV textures this is solid: it depends on the world position
/// only, so it is seamless across primitives.
#[derive(Clone)]
pub struct NoiseTexture {
    values: Vec<f32>,
    perm: [Vec<usize>; 3],
    /// Lattice cells per world unit.
    frequency: f32,
    tint: Color,
}

impl NoiseTexture {
    const POINT_COUNT: usize = 256;

    pub fn new(frequency: f32, tint: Color, rng: &mut dyn RngCore) -> Self {
        let values = (0..Self::POINT_COUNT).map(|_| gen_f32(rng)).collect();
        let perm = [
            Self::permutation(rng),
            Self::permutation(rng),
            Self::permutation(rng),
        ];
        Self {
            values,
            perm,
            frequency,
            tint,
        }
    }

    fn permutation(rng: &mut dyn RngCore) -> Vec<usize> {
        let mut p: Vec<usize> = (0..Self::POINT_COUNT).collect();
        // Fisher-Yates
        for i in (1..p.len()).rev() {
            let j = (rng.next_u32() as usize) % (i + 1);
            p.swap(i, j);
        }
        p
    }

    fn lattice(&self, i: i64, j: i64, k: i64) -> f32 {
        let mask = Self::POINT_COUNT as i64 - 1;
        let index = self.perm[0][(i & mask) as usize]
            ^ self.perm[1][(j & mask) as usize]
            ^ self.perm[2][(k & mask) as usize];
        self.values[index]
    }

    /// Noise in `[0, 1]` at `p`.
    pub fn noise(&self, p: Vec3) -> f32 {
        let p = p * self.frequency;
        let base = p.floor();
        let f = p - base;
        // Hermite smoothing hides the lattice grid
        let w = f * f * (3.0 - 2.0 * f);
        let (i, j, k) = (base.x as i64, base.y as i64, base.z as i64);

        let mut sum = 0.0;
        for di in 0..2 {
            for dj in 0..2 {
                for dk in 0..2 {
                    let weight = (if di == 1 { w.x } else { 1.0 - w.x })
                        * (if dj == 1 { w.y } else { 1.0 - w.y })
                        * (if dk == 1 { w.z } else { 1.0 - w.z });
                    sum += weight * self.lattice(i + di, j + dj, k + dk);
                }
            }
        }
        sum
    }
}

impl fmt::Debug for NoiseTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseTexture")
            .field("frequency", &self.frequency)
            .field("tint", &self.tint)
            .finish_non_exhaustive()
    }
}

impl Texture for NoiseTexture {
    fn value(&self, _u: f32, _v: f32, p: Vec3) -> Color {
        self.tint * self.noise(p)
    }
}

/// Failure loading an image texture.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture image: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("texture has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Bitmap texture, stored as linear RGB.
#[derive(Clone)]
pub struct ImageTexture {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl ImageTexture {
    /// Build from sRGB-encoded 8-bit pixels, row-major from the top row.
    pub fn from_srgb8(width: u32, height: u32, rgb: &[u8]) -> Result<Self, TextureError> {
        if width == 0 || height == 0 || rgb.len() < (width * height * 3) as usize {
            return Err(TextureError::Empty { width, height });
        }
        let pixels = rgb
            .chunks_exact(3)
            .take((width * height) as usize)
            .map(|c| {
                Color::new(
                    srgb_to_linear(c[0] as f32 / 255.0),
                    srgb_to_linear(c[1] as f32 / 255.0),
                    srgb_to_linear(c[2] as f32 / 255.0),
                )
            })
            .collect();
        Ok(Self { width, height, pixels })
    }

    /// Decode any format the `image` crate supports.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let rgb = ::image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        log::info!("Loaded texture {} ({width}x{height})", path.display());
        Self::from_srgb8(width, height, rgb.as_raw())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn texel(&self, x: i64, y: i64) -> Color {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.pixels[y * self.width as usize + x]
    }
}

impl fmt::Debug for ImageTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Texture for ImageTexture {
    /// Bilinear lookup, wrapping in both directions. `v = 0` is the bottom row.
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Color {
        let x = u.rem_euclid(1.0) * self.width as f32 - 0.5;
        let y = (1.0 - v.rem_euclid(1.0)) * self.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }
}

/// sRGB transfer function to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_solid_color_ignores_coordinates() {
        let tex = SolidColor(Color::new(0.1, 0.2, 0.3));
        assert_eq!(tex.value(0.0, 0.0, Vec3::ZERO), tex.value(0.7, 0.9, Vec3::splat(4.0)));
    }

    #[test]
    fn test_checker_alternates_in_u_and_v() {
        let red = Color::new(1.0, 0.0, 0.0);
        let blue = Color::new(0.0, 0.0, 1.0);
        let tex = CheckerTexture::new(red, blue, 4.0);

        assert_eq!(tex.value(0.1, 0.1, Vec3::ZERO), red);
        assert_eq!(tex.value(0.3, 0.1, Vec3::ZERO), blue);
        assert_eq!(tex.value(0.1, 0.3, Vec3::ZERO), blue);
        assert_eq!(tex.value(0.3, 0.3, Vec3::ZERO), red);
        // Position plays no part
        assert_eq!(tex.value(0.3, 0.3, Vec3::splat(7.5)), red);
    }

    #[test]
    fn test_uv_texture_encodes_coordinates() {
        let c = UvTexture.value(0.25, 0.75, Vec3::ZERO);
        assert_eq!(c, Color::new(0.25, 0.75, 0.9));
    }

    #[test]
    fn test_noise_is_bounded_and_varies() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(9);
        let tex = NoiseTexture::new(4.0, Color::ONE, &mut rng);

        let samples: Vec<f32> = (0..200)
            .map(|i| tex.noise(Vec3::new(i as f32 * 0.37, i as f32 * -0.11, 1.3)))
            .collect();
        assert!(samples.iter().all(|&n| (0.0..=1.0).contains(&n)));
        let spread = samples.iter().cloned().fold(f32::MIN, f32::max)
            - samples.iter().cloned().fold(f32::MAX, f32::min);
        assert!(spread > 0.2, "noise too flat: {spread}");
    }

    #[test]
    fn test_noise_is_continuous() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(10);
        let tex = NoiseTexture::new(2.0, Color::ONE, &mut rng);
        let p = Vec3::new(0.499, 1.999, -0.001);
        let step = Vec3::splat(2e-4);
        assert!((tex.noise(p) - tex.noise(p + step)).abs() < 0.01);
    }

    #[test]
    fn test_image_texture_rows_and_wrap() {
        // 2x2: top row white/black, bottom row red/green
        let rgb = [255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255, 0];
        let tex = ImageTexture::from_srgb8(2, 2, &rgb).unwrap();

        let top_left = tex.value(0.25, 0.75, Vec3::ZERO);
        assert!((top_left - Color::ONE).length() < 1e-5);
        let bottom_right = tex.value(0.75, 0.25, Vec3::ZERO);
        assert!((bottom_right - Color::new(0.0, 1.0, 0.0)).length() < 1e-5);
        // u wraps around
        assert_eq!(tex.value(1.25, 0.75, Vec3::ZERO), top_left);
    }

    #[test]
    fn test_image_texture_rejects_short_buffer() {
        assert!(matches!(
            ImageTexture::from_srgb8(2, 2, &[0; 6]),
            Err(TextureError::Empty { .. })
        ));
        assert!(ImageTexture::from_srgb8(0, 4, &[]).is_err());
    }

    #[test]
    fn test_srgb_to_linear() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(0.5) - 0.214).abs() < 0.001);
    }
}
