use crate::{Interval, Ray, Vec3};
use rand::Rng;

/// Minimum thickness of a box built from points.
const MIN_THICKNESS: f32 = 0.0001;

/// Axis-aligned box, one [`Interval`] per axis.
///
/// `EMPTY` is the identity for [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };

    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from two corner points, in any order.
    ///
    /// Flat boxes (e.g. around an axis-aligned triangle) are padded so every
    /// axis has a non-zero extent.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let lo = a.min(b);
        let hi = a.max(b);
        Self::new(
            Interval::new(lo.x, hi.x),
            Interval::new(lo.y, hi.y),
            Interval::new(lo.z, hi.z),
        )
    }

    /// Smallest box containing both `box0` and `box1`.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Interval along axis `n`; anything past 1 is Z.
    #[inline]
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Edge lengths along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    /// Slab test against `ray_t`; faces count as inside.
    ///
    /// Branchless slab test on the ray's precomputed reciprocal direction.
    /// Axis-parallel rays produce ±inf slab distances and fall out of the
    /// min/max reduction. An axis-parallel ray starting exactly on a face
    /// gives `0 * inf = NaN`; that slab holds the whole ray, so it becomes
    /// `(-inf, inf)`.
    #[inline]
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        let origin = ray.origin();
        let inv = ray.inv_direction();

        let t0 = (self.min() - origin) * inv;
        let t1 = (self.max() - origin) * inv;

        let on_face = t0.is_nan_mask() | t1.is_nan_mask();
        let t_lo = Vec3::select(on_face, Vec3::NEG_INFINITY, t0.min(t1));
        let t_hi = Vec3::select(on_face, Vec3::INFINITY, t0.max(t1));

        let t_enter = t_lo.max_element().max(ray_t.min);
        let t_exit = t_hi.min_element().min(ray_t.max);

        t_enter <= t_exit
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    pub fn volume(&self) -> f32 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    pub fn surface_area(&self) -> f32 {
        let e = self.extent();
        2.0 * (e.x * e.y + e.x * e.z + e.y * e.z)
    }

    /// Uniformly distributed point inside the box.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let r = Vec3::new(rng.gen(), rng.gen(), rng.gen());
        self.min() + r * self.extent()
    }

    /// Box with the same center and every extent multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Aabb {
        let center = self.centroid();
        let half = self.extent() * (0.5 * factor);
        let lo = center - half;
        let hi = center + half;
        Aabb {
            x: Interval::new(lo.x, hi.x),
            y: Interval::new(lo.y, hi.y),
            z: Interval::new(lo.z, hi.z),
        }
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.min().cmple(other.min()).all() && other.max().cmple(self.max()).all()
    }

    /// Flat axes get a minimum thickness so planar boxes still have area.
    fn pad_to_minimums(&mut self) {
        if self.x.size() < MIN_THICKNESS {
            self.x = self.x.expand(MIN_THICKNESS);
        }
        if self.y.size() < MIN_THICKNESS {
            self.y = self.y.expand(MIN_THICKNESS);
        }
        if self.z.size() < MIN_THICKNESS {
            self.z = self.z.expand(MIN_THICKNESS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn unit_box() -> Aabb {
        Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_aabb_from_points_any_order() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_flat_box_is_padded() {
        let aabb = Aabb::from_points(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        assert!(aabb.z.size() > 0.0);
        assert!(aabb.z.min < 0.0 && aabb.z.max > 0.0);
    }

    #[test]
    fn test_aabb_surrounding_is_tight() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 1.0, 2.0));
        let b = Aabb::from_points(Vec3::new(3.0, -2.0, 1.0), Vec3::new(10.0, 0.5, 4.0));
        let s = Aabb::surrounding(&a, &b);

        assert!(s.contains_box(&a));
        assert!(s.contains_box(&b));
        assert_eq!(s.min(), Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(s.max(), Vec3::new(10.0, 1.0, 4.0));
        assert_eq!(s.volume(), 10.0 * 3.0 * 4.0);
    }

    #[test]
    fn test_slab_hit_and_miss() {
        let aabb = unit_box();

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.hit(&ray, Interval::new(0.0, 100.0)));

        // Pointing away
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));

        // Parallel to the box, outside the x slab
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));

        // Interval ends before the box
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 3.0)));
    }

    #[test]
    fn test_aabb_hit_axis_parallel_inside_slabs() {
        let aabb = unit_box();

        // Direction has two zero components, so two reciprocals are infinite.
        let ray = Ray::new(Vec3::new(0.5, -0.5, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.hit(&ray, Interval::new(0.0, f32::INFINITY)));

        let ray = Ray::new(Vec3::new(0.5, 3.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, f32::INFINITY)));
    }

    #[test]
    fn test_axis_parallel_ray_along_face_hits() {
        let aabb = Aabb::new(
            Interval::new(-1.0, 1.0),
            Interval::new(-1.0, 1.0),
            Interval::new(-1.0, 1.0),
        );
        let ray_t = Interval::new(0.0, f32::INFINITY);

        for origin in [Vec3::new(1.0, 0.0, -5.0), Vec3::new(-1.0, 0.0, -5.0), Vec3::new(0.0, 1.0, -5.0)] {
            assert!(aabb.hit(&Ray::new(origin, Vec3::Z), ray_t), "{origin:?}");
        }
        // Negative zero reciprocal is -inf; the face still counts.
        let ray = Ray::new(Vec3::new(-1.0, 0.0, 5.0), Vec3::new(-0.0, 0.0, -1.0));
        assert!(aabb.hit(&ray, ray_t));

        // Just outside the face still misses.
        let ray = Ray::new(Vec3::new(1.001, 0.0, -5.0), Vec3::Z);
        assert!(!aabb.hit(&ray, ray_t));
    }

    #[test]
    fn test_aabb_volume_and_area() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.volume(), 6.0);
        assert_eq!(aabb.surface_area(), 2.0 * (2.0 + 3.0 + 6.0));
    }

    #[test]
    fn test_aabb_scaled_keeps_center() {
        let aabb = Aabb::from_points(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 4.0, 2.0));
        let scaled = aabb.scaled(0.5);

        assert_eq!(scaled.centroid(), aabb.centroid());
        assert_eq!(scaled.extent(), aabb.extent() * 0.5);
        assert!(aabb.contains_box(&scaled));
    }

    #[test]
    fn test_aabb_random_point_inside() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);

        for _ in 0..1000 {
            let p = aabb.random_point(&mut rng);
            assert!(p.cmpge(aabb.min()).all() && p.cmple(aabb.max()).all());
        }
    }
}
