//! Parallel render driver.
//!
//! Splits the image into units of work according to [`Schedule`], runs them
//! on `threads` workers and assembles the finished [`ImageBuffer`]. The scene
//! is shared read-only; each worker owns its generator and writes only its
//! own pixels.

use crate::bucket::{generate_buckets, Bucket, BucketResult};
use crate::bvh::FirstHitCache;
use crate::camera::Camera;
use crate::config::{RenderConfig, Schedule};
use crate::error::RenderError;
use crate::framebuffer::{resolve_pixel, ImageBuffer};
use crate::integrator::{CorrectionCounts, Integrator};
use crate::material::Color;
use crate::sampling::gen_f32;
use crate::scene::Scene;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Generator owned by one worker.
pub type WorkerRng = Xoshiro256StarStar;

/// Generator for worker `worker`: `seed + worker` when a seed is fixed,
/// otherwise fresh OS entropy.
pub fn worker_rng(seed: Option<u64>, worker: usize) -> Result<WorkerRng, RenderError> {
    match seed {
        Some(seed) => Ok(WorkerRng::seed_from_u64(seed.wrapping_add(worker as u64))),
        None => Ok(WorkerRng::from_rng(OsRng)?),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderStats {
    pub elapsed: Duration,
    pub threads: usize,
    /// Camera samples traced (pixels times samples per pixel).
    pub camera_samples: u64,
    pub corrections: CorrectionCounts,
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: ImageBuffer,
    pub stats: RenderStats,
}

/// Render `scene` through `camera` with the settings in `config`.
pub fn render(scene: &Scene, camera: &Camera, config: &RenderConfig) -> Result<RenderOutput, RenderError> {
    config.validate()?;
    let threads = config.effective_threads();
    log::info!(
        "Rendering {}x{} at {} spp, {} bounces, {} threads, {:?}, light sampling {:?}",
        config.width,
        config.height,
        config.samples_per_pixel,
        config.max_bounces,
        threads,
        config.schedule,
        config.light_sampling
    );
    if let Some(fraction) = config.first_hit_cache {
        log::warn!(
            "First-hit cache enabled after {:.0}% of samples; camera rays may miss late geometry",
            fraction * 100.0
        );
    }

    let ctx = RenderContext {
        integrator: Integrator::new(scene, config),
        camera,
        config,
    };
    let progress = Progress::new(threads);
    let done = AtomicBool::new(false);
    let mut image = ImageBuffer::new(config.width, config.height);
    let start = Instant::now();

    thread::scope(|s| {
        let reporter = config.progress.then(|| {
            let interval = Duration::from_millis(config.progress_interval_ms.max(1));
            let (progress, done) = (&progress, &done);
            s.spawn(move || progress.report(config.pixel_count(), interval, done))
        });

        let result = match config.schedule {
            Schedule::Bands => render_bands(&ctx, &progress, threads, &mut image),
            Schedule::Tiles { size } => render_tiles(&ctx, &progress, threads, size, &mut image),
            Schedule::PerPixel => render_per_pixel(&ctx, &progress, threads, &mut image),
        };

        done.store(true, Ordering::Release);
        if let Some(reporter) = reporter {
            reporter.thread().unpark();
        }
        result
    })?;

    let stats = RenderStats {
        elapsed: start.elapsed(),
        threads,
        camera_samples: config.pixel_count() as u64 * config.samples_per_pixel as u64,
        corrections: ctx.integrator.corrections(),
    };
    log::info!(
        "Render finished in {:.2?}: {} camera samples ({:.2} M/s)",
        stats.elapsed,
        stats.camera_samples,
        stats.camera_samples as f64 / stats.elapsed.as_secs_f64().max(1e-9) / 1e6
    );
    log::debug!(
        "Numeric corrections: {} degenerate pdfs, {} non-finite components, {} clamped components",
        stats.corrections.degenerate_pdf,
        stats.corrections.non_finite,
        stats.corrections.clamped
    );

    Ok(RenderOutput { image, stats })
}

/// Everything a worker needs, shared by reference.
struct RenderContext<'a> {
    integrator: Integrator<'a>,
    camera: &'a Camera,
    config: &'a RenderConfig,
}

impl RenderContext<'_> {
    fn new_cache(&self) -> Option<FirstHitCache> {
        self.config
            .first_hit_cache
            .map(|fraction| FirstHitCache::new(self.config.samples_per_pixel, fraction))
    }

    /// All samples of pixel `(x, y)`, averaged and display-transformed.
    fn pixel(&self, x: u32, y: u32, rng: &mut dyn RngCore, mut cache: Option<&mut FirstHitCache>) -> Color {
        let (width, height) = (self.config.width as f32, self.config.height as f32);
        if let Some(cache) = cache.as_deref_mut() {
            cache.reset();
        }

        let mut sum = Color::ZERO;
        for sample in 0..self.config.samples_per_pixel {
            let s = (x as f32 + gen_f32(rng)) / width;
            let t = (y as f32 + gen_f32(rng)) / height;
            let ray = self.camera.send_ray(s, t, rng);

            sum += match cache.as_deref_mut() {
                Some(cache) => self.integrator.camera_sample(&ray, sample, cache, rng),
                None => self.integrator.ray_color(&ray, 0, rng),
            };
        }
        resolve_pixel(sum, self.config.samples_per_pixel)
    }

    /// Render `rows` into `out`, which holds exactly those rows.
    fn render_rows(&self, rows: Range<u32>, out: &mut [Color], rng: &mut dyn RngCore, progress: &WorkerProgress<'_>) {
        let width = self.config.width;
        let mut cache = self.new_cache();
        for (row, y) in out.chunks_mut(width as usize).zip(rows) {
            for (x, pixel) in (0..width).zip(row.iter_mut()) {
                *pixel = self.pixel(x, y, rng, cache.as_mut());
                progress.tick();
            }
        }
    }

    fn render_bucket(&self, bucket: &Bucket, rng: &mut dyn RngCore, progress: &WorkerProgress<'_>) -> Vec<Color> {
        let mut cache = self.new_cache();
        bucket
            .pixels()
            .map(|(x, y)| {
                let color = self.pixel(x, y, rng, cache.as_mut());
                progress.tick();
                color
            })
            .collect()
    }
}

/// Contiguous row ranges, one per band; the last band absorbs the remainder.
pub fn band_rows(height: u32, bands: usize) -> Vec<Range<u32>> {
    let bands = bands.clamp(1, height.max(1) as usize) as u32;
    let per_band = height / bands;
    (0..bands)
        .map(|i| {
            let start = i * per_band;
            let end = if i + 1 == bands { height } else { start + per_band };
            start..end
        })
        .collect()
}

fn join_all(handles: Vec<thread::ScopedJoinHandle<'_, Result<(), RenderError>>>) -> Result<(), RenderError> {
    let mut first_error = None;
    for handle in handles {
        let result = handle.join().unwrap_or(Err(RenderError::WorkerPanicked));
        if let Err(e) = result {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn render_bands(
    ctx: &RenderContext<'_>,
    progress: &Progress,
    threads: usize,
    image: &mut ImageBuffer,
) -> Result<(), RenderError> {
    let width = image.width as usize;
    let mut rest = image.pixels_mut();

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for (worker, rows) in band_rows(ctx.config.height, threads).into_iter().enumerate() {
            let (band, tail) = std::mem::take(&mut rest).split_at_mut(rows.len() * width);
            rest = tail;
            handles.push(s.spawn(move || {
                let mut rng = worker_rng(ctx.config.seed, worker)?;
                ctx.render_rows(rows, band, &mut rng, &progress.worker(worker));
                Ok(())
            }));
        }
        join_all(handles)
    })
}

fn render_tiles(
    ctx: &RenderContext<'_>,
    progress: &Progress,
    threads: usize,
    tile_size: u32,
    image: &mut ImageBuffer,
) -> Result<(), RenderError> {
    let buckets = generate_buckets(ctx.config.width, ctx.config.height, tile_size);
    log::debug!("Queued {} tiles of {}px", buckets.len(), tile_size);

    let queue = Mutex::new(VecDeque::from(buckets));
    let (tx, rx) = mpsc::channel::<BucketResult>();

    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move || {
                    let mut rng = worker_rng(ctx.config.seed, worker)?;
                    let progress = progress.worker(worker);
                    loop {
                        // Hold the lock only for the pop
                        let next = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                        let Some(bucket) = next else { break };

                        let pixels = ctx.render_bucket(&bucket, &mut rng, &progress);
                        if tx.send(BucketResult::new(bucket, pixels)).is_err() {
                            break;
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        drop(tx);
        join_all(handles)
    })?;

    for result in rx {
        for ((x, y), color) in result.bucket.pixels().zip(result.pixels) {
            image.set(x, y, color);
        }
    }
    Ok(())
}

fn render_per_pixel(
    ctx: &RenderContext<'_>,
    progress: &Progress,
    threads: usize,
    image: &mut ImageBuffer,
) -> Result<(), RenderError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("umbra-pixel-{i}"))
        .build()?;

    // One generator per rayon job, each from its own seed.
    let base_seed = match ctx.config.seed {
        Some(seed) => seed,
        None => {
            let mut bytes = [0u8; 8];
            OsRng.try_fill_bytes(&mut bytes)?;
            u64::from_le_bytes(bytes)
        }
    };
    let next_job = AtomicU64::new(0);
    let width = ctx.config.width as usize;

    pool.install(|| {
        image.pixels_mut().par_iter_mut().enumerate().for_each_init(
            || {
                let job = next_job.fetch_add(1, Ordering::Relaxed);
                (
                    WorkerRng::seed_from_u64(base_seed.wrapping_add(job)),
                    ctx.new_cache(),
                )
            },
            |(rng, cache), (i, pixel)| {
                let (x, y) = ((i % width) as u32, (i / width) as u32);
                *pixel = ctx.pixel(x, y, rng, cache.as_mut());
                progress.worker(rayon::current_thread_index().unwrap_or(0)).tick();
            },
        );
    });
    Ok(())
}

/// Per-worker completed-pixel counters polled by the reporter thread.
struct Progress {
    counters: Vec<AtomicU32>,
}

impl Progress {
    fn new(workers: usize) -> Self {
        Self {
            counters: (0..workers.max(1)).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn worker(&self, index: usize) -> WorkerProgress<'_> {
        WorkerProgress {
            counter: &self.counters[index % self.counters.len()],
        }
    }

    fn completed(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.load(Ordering::Relaxed) as u64)
            .sum()
    }

    fn report(&self, total: usize, interval: Duration, done: &AtomicBool) {
        let total = total.max(1) as f64;
        loop {
            thread::park_timeout(interval);
            if done.load(Ordering::Acquire) {
                break;
            }
            let completed = self.completed();
            log::info!(
                "Progress: {:5.1}% ({} pixels)",
                100.0 * completed as f64 / total,
                completed
            );
        }
    }
}

struct WorkerProgress<'a> {
    counter: &'a AtomicU32,
}

impl WorkerProgress<'_> {
    /// Only the owning worker writes its counter, so load-then-store is enough.
    #[inline]
    fn tick(&self) {
        let n = self.counter.load(Ordering::Relaxed);
        self.counter.store(n.wrapping_add(1), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_rows_cover_every_row_once() {
        for (height, bands) in [(10, 3), (7, 7), (3, 8), (1, 1), (100, 1)] {
            let ranges = band_rows(height, bands);
            assert_eq!(ranges.len(), bands.min(height as usize));
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges.last().unwrap().end, height);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn test_last_band_takes_remainder() {
        let ranges = band_rows(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn test_seeded_worker_rngs_differ_and_repeat() {
        let mut a = worker_rng(Some(7), 0).unwrap();
        let mut b = worker_rng(Some(7), 1).unwrap();
        let mut a_again = worker_rng(Some(7), 0).unwrap();

        let first = a.next_u64();
        assert_ne!(first, b.next_u64());
        assert_eq!(first, a_again.next_u64());
    }

    #[test]
    fn test_entropy_worker_rng() {
        let mut a = worker_rng(None, 0).unwrap();
        let mut b = worker_rng(None, 0).unwrap();
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_progress_sums_workers() {
        let progress = Progress::new(3);
        for _ in 0..4 {
            progress.worker(0).tick();
        }
        progress.worker(2).tick();
        assert_eq!(progress.completed(), 5);
    }
}
