//! BVH construction: randomized median split and binned surface-area heuristic.

use super::{Bvh, BvhNode, BvhStats, Child, LeafId, LeafSpan, NodeArena};
use crate::error::BvhError;
use crate::hittable::{HittableList, PrimId};
use crate::sampling::gen_range_usize;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;
use umbra_math::{Aabb, Vec3};

pub const DEFAULT_SAH_CANDIDATES: u32 = 10;

fn default_candidates() -> u32 {
    DEFAULT_SAH_CANDIDATES
}

/// Construction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BvhBuilder {
    /// Random axis, sort by box minimum, split the range in half.
    MedianSplit,
    /// Evaluate `candidates` evenly spaced split planes per axis and keep
    /// the cheapest, or stop with a leaf when no split pays off.
    Sah {
        #[serde(default = "default_candidates")]
        candidates: u32,
    },
}

impl Default for BvhBuilder {
    fn default() -> Self {
        BvhBuilder::Sah {
            candidates: DEFAULT_SAH_CANDIDATES,
        }
    }
}

pub(super) fn build(
    primitives: &HittableList,
    builder: BvhBuilder,
    rng: &mut dyn RngCore,
) -> Result<Bvh, BvhError> {
    if primitives.is_empty() {
        return Err(BvhError::Empty);
    }
    let start = Instant::now();

    let mut boxes = Vec::with_capacity(primitives.len());
    let mut centers = Vec::with_capacity(primitives.len());
    for (id, prim) in primitives.iter() {
        let bbox = prim
            .bounding_box()
            .ok_or(BvhError::MissingBoundingBox { index: id.index() })?;
        boxes.push(bbox);
        centers.push(prim.center().unwrap_or_else(|| bbox.centroid()));
    }

    let mut ids: Vec<PrimId> = primitives.iter().map(|(id, _)| id).collect();
    let mut tree = TreeBuilder {
        boxes: &boxes,
        centers: &centers,
        nodes: NodeArena::new(),
        leaf_spans: Vec::new(),
        leaf_prims: Vec::new(),
        max_depth: 0,
    };

    let root = match builder {
        BvhBuilder::MedianSplit => tree.median(&mut ids, 0, rng)?,
        BvhBuilder::Sah { candidates } => tree.sah(&mut ids, candidates.max(1), 0)?,
    };

    let stats = BvhStats {
        primitives: primitives.len(),
        nodes: tree.nodes.len(),
        leaves: tree.leaf_spans.len(),
        max_depth: tree.max_depth,
        arena_chunks: tree.nodes.chunk_count(),
        build_time: start.elapsed(),
    };
    log::info!(
        "BVH built with {:?}: {} primitives, {} nodes, {} leaves, depth {}, {:.2?}",
        builder,
        stats.primitives,
        stats.nodes,
        stats.leaves,
        stats.max_depth,
        stats.build_time
    );

    let TreeBuilder {
        nodes,
        leaf_spans,
        leaf_prims,
        ..
    } = tree;

    Ok(Bvh {
        root,
        nodes,
        leaf_spans,
        leaf_prims,
        boxes,
        builder,
        stats,
    })
}

struct TreeBuilder<'a> {
    boxes: &'a [Aabb],
    centers: &'a [Vec3],
    nodes: NodeArena<BvhNode>,
    leaf_spans: Vec<LeafSpan>,
    leaf_prims: Vec<PrimId>,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn bounds(&self, ids: &[PrimId]) -> Aabb {
        ids.iter().fold(Aabb::EMPTY, |acc, id| {
            Aabb::surrounding(&acc, &self.boxes[id.index()])
        })
    }

    fn child_bbox(&self, child: Child) -> Aabb {
        match child {
            Child::Node(id) => self.nodes.get(id).bbox,
            Child::Primitive(id) => self.boxes[id.index()],
            Child::Leaf(id) => self.leaf_spans[id.index()].bbox,
        }
    }

    fn node(&mut self, left: Child, right: Child, depth: usize) -> Result<Child, BvhError> {
        self.max_depth = self.max_depth.max(depth);
        let bbox = Aabb::surrounding(&self.child_bbox(left), &self.child_bbox(right));
        let id = self.nodes.alloc(BvhNode { bbox, left, right })?;
        Ok(Child::Node(id))
    }

    fn leaf(&mut self, ids: &[PrimId], bbox: Aabb, depth: usize) -> Child {
        self.max_depth = self.max_depth.max(depth);
        let id = LeafId(self.leaf_spans.len() as u32);
        self.leaf_spans.push(LeafSpan {
            start: self.leaf_prims.len() as u32,
            len: ids.len() as u32,
            bbox,
        });
        self.leaf_prims.extend_from_slice(ids);
        Child::Leaf(id)
    }

    fn box_min_cmp(&self, a: PrimId, b: PrimId, axis: usize) -> Ordering {
        let a_min = self.boxes[a.index()].axis_interval(axis).min;
        let b_min = self.boxes[b.index()].axis_interval(axis).min;
        a_min.partial_cmp(&b_min).unwrap_or(Ordering::Equal)
    }

    fn median(
        &mut self,
        ids: &mut [PrimId],
        depth: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Child, BvhError> {
        let axis = gen_range_usize(rng, 3);

        match ids.len() {
            1 => {
                let only = Child::Primitive(ids[0]);
                self.node(only, only, depth)
            }
            2 => {
                let (a, b) = (ids[0], ids[1]);
                let (left, right) = if self.box_min_cmp(b, a, axis) == Ordering::Less {
                    (b, a)
                } else {
                    (a, b)
                };
                self.node(Child::Primitive(left), Child::Primitive(right), depth)
            }
            n => {
                ids.sort_by(|&a, &b| self.box_min_cmp(a, b, axis));
                let (lo, hi) = ids.split_at_mut(n / 2);
                let left = self.median(lo, depth + 1, rng)?;
                let right = self.median(hi, depth + 1, rng)?;
                self.node(left, right, depth)
            }
        }
    }

    fn sah(&mut self, ids: &mut [PrimId], candidates: u32, depth: usize) -> Result<Child, BvhError> {
        if let [only] = ids {
            self.max_depth = self.max_depth.max(depth);
            return Ok(Child::Primitive(*only));
        }

        let parent = self.bounds(ids);
        let Some((axis, pos)) = self.best_split(ids, &parent, candidates) else {
            return Ok(self.leaf(ids, parent, depth));
        };

        let mid = partition(ids, |id| self.centers[id.index()][axis] < pos);
        if mid == 0 || mid == ids.len() {
            return Ok(self.leaf(ids, parent, depth));
        }

        let (lo, hi) = ids.split_at_mut(mid);
        let left = self.sah(lo, candidates, depth + 1)?;
        let right = self.sah(hi, candidates, depth + 1)?;
        self.node(left, right, depth)
    }

    /// Cheapest `(axis, position)` whose cost beats not splitting at all.
    fn best_split(&self, ids: &[PrimId], parent: &Aabb, candidates: u32) -> Option<(usize, f32)> {
        let mut best_cost = parent.surface_area() * ids.len() as f32;
        let mut best = None;

        for axis in 0..3 {
            let extent = parent.axis_interval(axis);
            if extent.size() <= 0.0 {
                continue;
            }
            let step = extent.size() / candidates as f32;
            for i in 0..candidates {
                let pos = extent.min + step * i as f32;
                let Some(cost) = self.split_cost(ids, axis, pos) else {
                    continue;
                };
                if cost < best_cost {
                    best_cost = cost;
                    best = Some((axis, pos));
                }
            }
        }
        best
    }

    /// `n_l * SA_l + n_r * SA_r`, or `None` when either side would be empty.
    fn split_cost(&self, ids: &[PrimId], axis: usize, pos: f32) -> Option<f32> {
        let mut left = (0usize, Aabb::EMPTY);
        let mut right = (0usize, Aabb::EMPTY);

        for id in ids {
            let side = if self.centers[id.index()][axis] < pos {
                &mut left
            } else {
                &mut right
            };
            side.0 += 1;
            side.1 = Aabb::surrounding(&side.1, &self.boxes[id.index()]);
        }

        if left.0 == 0 || right.0 == 0 {
            return None;
        }
        Some(left.0 as f32 * left.1.surface_area() + right.0 as f32 * right.1.surface_area())
    }
}

/// Move every element matching `pred` to the front; returns how many matched.
fn partition<T, F: Fn(&T) -> bool>(items: &mut [T], pred: F) -> usize {
    let mut first_false = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(first_false, i);
            first_false += 1;
        }
    }
    first_false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lambertian, Sphere};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn spheres(centers: &[Vec3], radius: f32) -> HittableList {
        let mut list = HittableList::new();
        for &c in centers {
            list.add(Box::new(Sphere::new(c, radius, Lambertian::new(Vec3::ONE))));
        }
        list
    }

    /// Walk the tree checking each interior node against the unsplit cost.
    fn assert_sah_splits_pay_off(bvh: &Bvh, child: Child) {
        if let Child::Node(id) = child {
            let node = bvh.node(id);
            let n_left = bvh.primitive_count(node.left) as f32;
            let n_right = bvh.primitive_count(node.right) as f32;
            let split = n_left * bvh.child_bbox(node.left).surface_area()
                + n_right * bvh.child_bbox(node.right).surface_area();
            let unsplit = (n_left + n_right) * node.bbox.surface_area();
            assert!(split <= unsplit, "split {split} > unsplit {unsplit}");

            assert_sah_splits_pay_off(bvh, node.left);
            assert_sah_splits_pay_off(bvh, node.right);
        }
    }

    #[test]
    fn test_partition_moves_matches_to_front() {
        let mut items = [5, 1, 8, 2, 9, 3];
        let mid = partition(&mut items, |&x| x < 4);
        assert_eq!(mid, 3);
        assert!(items[..mid].iter().all(|&x| x < 4));
        assert!(items[mid..].iter().all(|&x| x >= 4));
    }

    #[test]
    fn test_sah_splits_never_cost_more_than_leaf() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(11);
        let centers: Vec<Vec3> = (0..300)
            .map(|_| crate::sampling::random_in_unit_sphere(&mut rng) * 30.0)
            .collect();
        let list = spheres(&centers, 0.4);

        let bvh = Bvh::build(&list, BvhBuilder::default(), &mut rng).unwrap();
        assert!(matches!(bvh.root(), Child::Node(_)));
        assert_sah_splits_pay_off(&bvh, bvh.root());
        assert_eq!(bvh.primitive_count(bvh.root()), 300);
    }

    #[test]
    fn test_sah_returns_leaf_when_no_split_helps() {
        // Coincident primitives: every candidate leaves one side empty.
        let list = spheres(&[Vec3::ZERO; 6], 1.0);
        let mut rng = Xoshiro256StarStar::seed_from_u64(12);

        let bvh = Bvh::build(&list, BvhBuilder::default(), &mut rng).unwrap();
        let Child::Leaf(leaf) = bvh.root() else {
            panic!("expected a leaf, got {:?}", bvh.root());
        };
        assert_eq!(bvh.leaf(leaf).len(), 6);
        assert_eq!(bvh.stats().nodes, 0);
    }

    #[test]
    fn test_median_pair_is_ordered_by_box_min() {
        let list = spheres(&[Vec3::splat(3.0), Vec3::splat(-3.0)], 0.5);

        for seed in 0..8 {
            let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
            let bvh = Bvh::build(&list, BvhBuilder::MedianSplit, &mut rng).unwrap();
            let Child::Node(root) = bvh.root() else {
                panic!("median split should produce a node");
            };
            // Offset on every axis, so the random axis does not matter.
            assert_eq!(bvh.node(root).left, Child::Primitive(PrimId(1)));
            assert_eq!(bvh.node(root).right, Child::Primitive(PrimId(0)));
        }
    }

    #[test]
    fn test_median_split_is_balanced() {
        let centers: Vec<Vec3> = (0..64).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let list = spheres(&centers, 0.25);
        let mut rng = Xoshiro256StarStar::seed_from_u64(13);

        let bvh = Bvh::build(&list, BvhBuilder::MedianSplit, &mut rng).unwrap();
        assert_eq!(bvh.stats().max_depth, 5);
        assert_eq!(bvh.stats().leaves, 0);
        assert_eq!(bvh.primitive_count(bvh.root()), 64);
    }

    #[test]
    fn test_missing_bounding_box_is_fatal() {
        use crate::hittable::{HitRecord, Hittable};
        use umbra_math::{Interval, Ray};

        struct Unbounded;
        impl Hittable for Unbounded {
            fn hit<'a>(&'a self, _ray: &Ray, _ray_t: Interval) -> Option<HitRecord<'a>> {
                None
            }
            fn bounding_box(&self) -> Option<Aabb> {
                None
            }
        }

        let mut list = spheres(&[Vec3::ZERO], 1.0);
        list.add(Box::new(Unbounded));
        let mut rng = Xoshiro256StarStar::seed_from_u64(14);

        for builder in [BvhBuilder::MedianSplit, BvhBuilder::default()] {
            let err = Bvh::build(&list, builder, &mut rng).err();
            assert!(matches!(err, Some(BvhError::MissingBoundingBox { index: 1 })));
        }
    }

    #[test]
    fn test_builder_serde_forms() {
        let median: BvhBuilder = serde_json::from_str(r#"{"kind":"median_split"}"#).unwrap();
        assert_eq!(median, BvhBuilder::MedianSplit);

        let sah: BvhBuilder = serde_json::from_str(r#"{"kind":"sah"}"#).unwrap();
        assert_eq!(sah, BvhBuilder::default());

        let custom: BvhBuilder = serde_json::from_str(r#"{"kind":"sah","candidates":4}"#).unwrap();
        assert_eq!(custom, BvhBuilder::Sah { candidates: 4 });
    }
}
