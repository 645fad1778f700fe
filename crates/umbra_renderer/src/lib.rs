//! Umbra renderer: CPU Monte Carlo path tracing.
//!
//! A static [`Scene`] is indexed by a [`Bvh`], shaded by the [`Integrator`]
//! and rendered in parallel by [`render`]. Primitives, materials, textures
//! and the camera are small reference implementations of the traits the core
//! needs.

mod bucket;
pub mod bvh;
mod camera;
mod config;
mod error;
mod framebuffer;
mod hittable;
mod integrator;
mod material;
pub mod pdf;
pub mod sampling;
mod scene;
mod scheduler;
mod sphere;
mod texture;
mod triangle;

pub use bucket::{generate_buckets, Bucket, BucketResult};
pub use bvh::{Bvh, BvhBuilder, BvhStats, Child, FirstHitCache};
pub use camera::Camera;
pub use config::{LightSampling, RenderConfig, Schedule, DEFAULT_TILE_SIZE};
pub use error::{BvhError, ConfigError, RenderError};
pub use framebuffer::{linear_to_gamma, resolve_pixel, ImageBuffer};
pub use hittable::{HitRecord, Hittable, HittableList, PrimId, RAY_EPSILON};
pub use integrator::{CorrectionCounts, Integrator};
pub use material::{Color, Dielectric, DiffuseLight, Glossy, Lambertian, Material, Metal, ScatterRecord};
pub use scene::{Scene, SceneBuilder};
pub use scheduler::{band_rows, render, worker_rng, RenderOutput, RenderStats, WorkerRng};
pub use sphere::Sphere;
pub use texture::{
    srgb_to_linear, CheckerTexture, ImageTexture, NoiseTexture, SolidColor, Texture, TextureError,
    UvTexture,
};
pub use triangle::Triangle;

/// Re-export the math types callers need alongside the renderer.
pub use umbra_math::{Aabb, Interval, Ray, Vec3};
