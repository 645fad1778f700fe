//! Error types for scene construction and rendering.
//!
//! Only structural failures surface here. Numeric trouble inside a path
//! (tiny densities, NaNs, near-parallel rays) is repaired where it happens
//! and counted by the integrator instead.

use thiserror::Error;

/// Fatal problems while building the acceleration structure.
#[derive(Debug, Error)]
pub enum BvhError {
    #[error("primitive {index} has no bounding box and cannot be placed in a BVH")]
    MissingBoundingBox { index: usize },

    #[error("BVH node arena could not allocate another chunk")]
    ArenaExhausted,

    #[error("cannot build a BVH over an empty primitive list")]
    Empty,
}

/// Rejected render settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("image dimensions must be non-zero (got {width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("samples_per_pixel must be at least 1")]
    ZeroSamples,

    #[error("tile size must be at least 1")]
    ZeroTileSize,

    #[error("SAH builder needs at least one split candidate per axis")]
    ZeroSahCandidates,

    #[error("{name} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("failed to parse render config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Anything that stops a render before it produces an image.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Bvh(#[from] BvhError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to seed worker RNG from OS entropy: {0}")]
    Entropy(#[from] rand::Error),

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("render worker panicked")]
    WorkerPanicked,
}
