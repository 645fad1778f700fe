//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The tree never owns primitives. It stores [`PrimId`]s into the scene's
//! [`HittableList`] and takes that list as an argument on every query, so
//! the BVH cannot outlive or alias the primitives it indexes. Interior nodes
//! live in a [`NodeArena`] and are addressed by [`NodeId`].

mod arena;
mod build;
mod cache;

pub use arena::{NodeArena, NodeId};
pub use build::{BvhBuilder, DEFAULT_SAH_CANDIDATES};
pub use cache::{FirstHitCache, FIRST_HIT_CACHE_CAPACITY};

use crate::error::BvhError;
use crate::hittable::{HitRecord, HittableList, PrimId};
use rand::RngCore;
use std::time::Duration;
use umbra_math::{Aabb, Interval, Ray};

/// Handle to a leaf span (an SAH no-split result).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(u32);

impl LeafId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference held by an interior node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    /// Another interior node.
    Node(NodeId),
    /// A single primitive, tested directly.
    Primitive(PrimId),
    /// A list of primitives scanned linearly.
    Leaf(LeafId),
}

/// Interior node: two children and a box bounding both.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    pub bbox: Aabb,
    pub left: Child,
    pub right: Child,
}

#[derive(Debug, Clone, Copy)]
struct LeafSpan {
    start: u32,
    len: u32,
    bbox: Aabb,
}

/// Build statistics, logged after construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BvhStats {
    pub primitives: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub arena_chunks: usize,
    pub build_time: Duration,
}

pub struct Bvh {
    root: Child,
    nodes: NodeArena<BvhNode>,
    leaf_spans: Vec<LeafSpan>,
    leaf_prims: Vec<PrimId>,
    boxes: Vec<Aabb>,
    builder: BvhBuilder,
    stats: BvhStats,
}

impl Bvh {
    /// Build a tree over every primitive in `primitives`.
    ///
    /// `rng` drives the median-split axis choice; the SAH builder ignores it.
    pub fn build(
        primitives: &HittableList,
        builder: BvhBuilder,
        rng: &mut dyn RngCore,
    ) -> Result<Self, BvhError> {
        build::build(primitives, builder, rng)
    }

    /// Nearest intersection strictly inside `ray_t`.
    ///
    /// `primitives` must be the list the tree was built over.
    pub fn hit<'a>(
        &self,
        primitives: &'a HittableList,
        ray: &Ray,
        ray_t: Interval,
    ) -> Option<HitRecord<'a>> {
        self.hit_child(self.root, primitives, ray, ray_t)
    }

    fn hit_child<'a>(
        &self,
        child: Child,
        primitives: &'a HittableList,
        ray: &Ray,
        ray_t: Interval,
    ) -> Option<HitRecord<'a>> {
        match child {
            Child::Primitive(id) => primitives.get(id).hit(ray, ray_t).map(|mut rec| {
                rec.prim = id;
                rec
            }),
            Child::Leaf(id) => {
                let span = self.leaf_spans[id.index()];
                if !span.bbox.hit(ray, ray_t) {
                    return None;
                }
                primitives.hit_subset(self.leaf(id), ray, ray_t)
            }
            Child::Node(id) => {
                let node = self.nodes.get(id);
                if !node.bbox.hit(ray, ray_t) {
                    return None;
                }

                let left = self.hit_child(node.left, primitives, ray, ray_t);
                // Right side only counts if strictly closer than the left hit
                let right_t = left.map_or(ray_t, |rec| ray_t.with_max(rec.t));
                let right = self.hit_child(node.right, primitives, ray, right_t);
                right.or(left)
            }
        }
    }

    pub fn root(&self) -> Child {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &BvhNode {
        self.nodes.get(id)
    }

    /// Primitives of a leaf, in scan order.
    pub fn leaf(&self, id: LeafId) -> &[PrimId] {
        let span = self.leaf_spans[id.index()];
        let start = span.start as usize;
        &self.leaf_prims[start..start + span.len as usize]
    }

    /// Bounds of whatever `child` refers to.
    pub fn child_bbox(&self, child: Child) -> Aabb {
        match child {
            Child::Node(id) => self.nodes.get(id).bbox,
            Child::Primitive(id) => self.boxes[id.index()],
            Child::Leaf(id) => self.leaf_spans[id.index()].bbox,
        }
    }

    /// Number of primitive references under `child`.
    ///
    /// A median-split node over one primitive references it twice.
    pub fn primitive_count(&self, child: Child) -> usize {
        match child {
            Child::Primitive(_) => 1,
            Child::Leaf(id) => self.leaf_spans[id.index()].len as usize,
            Child::Node(id) => {
                let node = self.nodes.get(id);
                self.primitive_count(node.left) + self.primitive_count(node.right)
            }
        }
    }

    pub fn bbox(&self) -> Aabb {
        self.child_bbox(self.root)
    }

    pub fn builder(&self) -> BvhBuilder {
        self.builder
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }
}
