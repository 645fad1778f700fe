//! Output color buffer and display transform.

use crate::material::Color;

pub const GAMMA: f32 = 2.2;

/// Display gamma (power 1/2.2). Negative input maps to 0.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.powf(1.0 / GAMMA)
    } else {
        0.0
    }
}

/// Average `sum` over `samples`, gamma correct and clamp to `[0, 1]`.
#[inline]
pub fn resolve_pixel(sum: Color, samples: u32) -> Color {
    let mean = sum / samples.max(1) as f32;
    Color::new(
        linear_to_gamma(mean.x),
        linear_to_gamma(mean.y),
        linear_to_gamma(mean.z),
    )
    .clamp(Color::ZERO, Color::ONE)
}

/// Gamma-corrected RGB in `[0, 1]`, row-major with the top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Packed 8-bit RGB, for image codecs.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for color in &self.pixels {
            let c = color.clamp(Color::ZERO, Color::ONE) * 255.0;
            bytes.extend_from_slice(&[c.x.round() as u8, c.y.round() as u8, c.z.round() as u8]);
        }
        bytes
    }

    /// Per-channel mean over the whole image.
    pub fn mean(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().copied().sum::<Color>() / self.pixels.len() as f32
    }
}
