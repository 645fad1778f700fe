//! Render settings.
//!
//! Loaded from JSON by the CLI; every field has a default, so a partial
//! document (or `{}`) is a valid config.

use crate::bvh::BvhBuilder;
use crate::error::ConfigError;
use crate::material::Color;
use serde::{Deserialize, Serialize};

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// How pixels are divided among workers. All strategies produce the same
/// expected image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// One contiguous band of rows per thread; the last band takes the remainder.
    Bands,
    /// Square tiles handed out from a shared queue, center first.
    Tiles {
        #[serde(default = "default_tile_size")]
        size: u32,
    },
    /// Rayon parallel-for over pixels.
    PerPixel,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Tiles {
            size: DEFAULT_TILE_SIZE,
        }
    }
}

/// Which emissive primitives direct-light sampling aims at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSampling {
    /// Only the first registered light. Other lights are still reached by
    /// material sampling, just not importance-sampled.
    #[default]
    First,
    /// A uniformly chosen light per bounce; densities are averaged.
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Hard path-length cutoff; a path at this depth contributes black.
    pub max_bounces: u32,
    /// Worker count; 0 uses every available core.
    pub threads: usize,
    pub background: Color,
    pub schedule: Schedule,
    pub bvh: BvhBuilder,
    /// Probability of drawing from the light distribution instead of the
    /// material's.
    pub light_mix: f32,
    pub light_sampling: LightSampling,
    /// Per-component ceiling on a single sample's radiance (firefly clamp).
    pub max_sample_value: f32,
    /// Densities below this are replaced with 1.
    pub min_pdf: f32,
    /// Fraction of samples after which camera rays only test cached
    /// primitives. `None` disables the cache.
    pub first_hit_cache: Option<f32>,
    pub progress: bool,
    pub progress_interval_ms: u64,
    /// Fixed base seed. Worker `i` uses `seed + i`; without it every worker
    /// seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 225,
            samples_per_pixel: 100,
            max_bounces: 12,
            threads: 0,
            background: Color::ZERO,
            schedule: Schedule::default(),
            bvh: BvhBuilder::default(),
            light_mix: 0.5,
            light_sampling: LightSampling::default(),
            max_sample_value: 20.0,
            min_pdf: 1e-6,
            first_hit_cache: None,
            progress: false,
            progress_interval_ms: 500,
            seed: None,
        }
    }
}

impl RenderConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if let Schedule::Tiles { size: 0 } = self.schedule {
            return Err(ConfigError::ZeroTileSize);
        }
        if let BvhBuilder::Sah { candidates: 0 } = self.bvh {
            return Err(ConfigError::ZeroSahCandidates);
        }

        check_range("light_mix", self.light_mix, 0.0, 1.0)?;
        check_range("max_sample_value", self.max_sample_value, f32::MIN_POSITIVE, f32::MAX)?;
        check_range("min_pdf", self.min_pdf, f32::MIN_POSITIVE, 1.0)?;
        if let Some(fraction) = self.first_hit_cache {
            check_range("first_hit_cache", fraction, 0.0, 1.0)?;
        }
        Ok(())
    }

    /// Worker count with 0 resolved to the number of cores.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or_else(|_| {
                log::warn!("Could not query available parallelism, using one thread");
                1
            })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    // NaN fails both comparisons and lands here too
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RenderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.light_mix, 0.5);
        assert_eq!(config.max_sample_value, 20.0);
        assert_eq!(config.light_sampling, LightSampling::First);
        assert!(config.first_hit_cache.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RenderConfig::from_json(
            r#"{
                "width": 32,
                "height": 16,
                "background": [0.5, 0.7, 1.0],
                "schedule": { "kind": "tiles" },
                "light_sampling": "uniform"
            }"#,
        )
        .unwrap();

        assert_eq!((config.width, config.height), (32, 16));
        assert_eq!(config.background, Color::new(0.5, 0.7, 1.0));
        assert_eq!(config.schedule, Schedule::Tiles { size: DEFAULT_TILE_SIZE });
        assert_eq!(config.light_sampling, LightSampling::Uniform);
        assert_eq!(config.samples_per_pixel, RenderConfig::default().samples_per_pixel);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(RenderConfig::from_json("{}").unwrap(), RenderConfig::default());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let zero_width = RenderConfig {
            width: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(
            zero_width.validate(),
            Err(ConfigError::ZeroDimensions { .. })
        ));

        let bad_mix = RenderConfig {
            light_mix: 1.5,
            ..RenderConfig::default()
        };
        assert!(matches!(
            bad_mix.validate(),
            Err(ConfigError::OutOfRange { name: "light_mix", .. })
        ));

        let zero_min_pdf = RenderConfig {
            min_pdf: 0.0,
            ..RenderConfig::default()
        };
        assert!(matches!(
            zero_min_pdf.validate(),
            Err(ConfigError::OutOfRange { name: "min_pdf", .. })
        ));

        let nan_cache = RenderConfig {
            first_hit_cache: Some(f32::NAN),
            ..RenderConfig::default()
        };
        assert!(nan_cache.validate().is_err());

        assert!(matches!(
            RenderConfig::from_json(r#"{"schedule": {"kind": "tiles", "size": 0}}"#),
            Err(ConfigError::ZeroTileSize)
        ));
        assert!(matches!(
            RenderConfig::from_json(r#"{"width": "wide"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_effective_threads() {
        let explicit = RenderConfig {
            threads: 3,
            ..RenderConfig::default()
        };
        assert_eq!(explicit.effective_threads(), 3);
        assert!(RenderConfig::default().effective_threads() >= 1);
    }
}
