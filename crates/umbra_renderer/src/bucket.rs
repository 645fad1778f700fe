//! Tiles (buckets) of the image handed out by the tile-queue scheduler.

use crate::material::Color;

/// Tile of the image rendered as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left pixel
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position of this bucket in render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Image coordinates covered by this bucket, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Tiles covering a `width` x `height` image, edge tiles clipped, sorted so
/// the ones nearest the image center come first.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Sort buckets by distance from image center.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let dist = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| {
        dist(a)
            .partial_cmp(&dist(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// A finished bucket on its way back to the main thread.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Pixel colors in row-major order within the bucket
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(width: u32, height: u32, size: u32) -> Vec<u32> {
        let mut hits = vec![0u32; (width * height) as usize];
        for bucket in generate_buckets(width, height, size) {
            for (x, y) in bucket.pixels() {
                hits[(y * width + x) as usize] += 1;
            }
        }
        hits
    }

    #[test]
    fn test_tiles_divide_evenly() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4);
        let total: usize = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total, 128 * 128);
    }

    #[test]
    fn test_edge_tiles_are_clipped() {
        let buckets = generate_buckets(100, 100, 64);
        assert_eq!(buckets.len(), 4);
        let total: usize = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total, 100 * 100);
    }

    #[test]
    fn test_every_pixel_covered_once() {
        for (w, h, s) in [(100, 37, 16), (1, 1, 64), (65, 3, 8), (7, 9, 1)] {
            assert!(coverage(w, h, s).iter().all(|&n| n == 1), "{w}x{h} tile {s}");
        }
    }

    #[test]
    fn test_center_tile_first() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9);

        // Center tile first, indices follow the sorted order
        assert_eq!((buckets[0].x, buckets[0].y), (64, 64));
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));
    }
}
