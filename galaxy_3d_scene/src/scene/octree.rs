/// Octree: dynamic spatial index for frustum culling.
///
/// Single-node placement: each item is stored in exactly one node, the
/// deepest node whose region fully contains its bounds. An item that
/// straddles a child boundary stays in the parent. Queries therefore
/// never produce duplicates.
///
/// Nodes are kept in a flat array. A leaf splits into 8 equal octants
/// once it holds more than `split_threshold` items and is above
/// `max_depth`; on split, the leaf's items migrate down into the
/// children that fully contain them (recursively, so a child that is
/// itself over the threshold splits too). Past `max_depth`, items
/// accumulate without further splitting.
///
/// Items whose bounds leave the root region are kept in an overflow list
/// and tested individually on every query.

use std::hash::Hash;
use rustc_hash::FxHashMap;
use glam::Vec3;
use crate::camera::{Frustum, FrustumTest};
use crate::error::{Error, Result};
use super::aabb::AABB;

/// Index of the root node in the flat node array.
const ROOT: usize = 0;

/// A single node in the octree.
struct OctreeNode<T> {
    /// World-space region of this node
    aabb: AABB,
    /// Root = 0
    depth: u32,
    /// Index of the first of 8 contiguous children (None = leaf)
    first_child: Option<usize>,
    /// Items placed at this node
    objects: Vec<T>,
}

impl<T> OctreeNode<T> {
    fn new(aabb: AABB, depth: u32) -> Self {
        Self { aabb, depth, first_child: None, objects: Vec::new() }
    }
}

/// Where an item currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Node(usize),
    Overflow,
}

pub struct Octree<T> {
    nodes: Vec<OctreeNode<T>>,
    split_threshold: usize,
    max_depth: u32,
    /// Reverse lookup: item -> (placement, bounds), for O(1) remove
    locations: FxHashMap<T, (Placement, AABB)>,
    /// Items outside the root region
    overflow: Vec<T>,
}

impl<T: Copy + Eq + Hash> Octree<T> {
    /// Create an empty octree covering `bounds`.
    pub fn new(bounds: AABB, split_threshold: usize, max_depth: u32) -> Self {
        Self {
            nodes: vec![OctreeNode::new(bounds, 0)],
            split_threshold: split_threshold.max(1),
            max_depth,
            locations: FxHashMap::default(),
            overflow: Vec::new(),
        }
    }

    /// World region covered by the root node
    pub fn bounds(&self) -> AABB {
        self.nodes[ROOT].aabb
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, item: T) -> bool {
        self.locations.contains_key(&item)
    }

    /// Bounds the item was inserted with
    pub fn item_bounds(&self, item: T) -> Option<AABB> {
        self.locations.get(&item).map(|(_, aabb)| *aabb)
    }

    /// Total node count (root included)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the node holding `item` (None if absent or in overflow)
    pub fn item_depth(&self, item: T) -> Option<u32> {
        match self.locations.get(&item) {
            Some((Placement::Node(idx), _)) => Some(self.nodes[*idx].depth),
            _ => None,
        }
    }

    /// Insert `item` with world-space `bounds`.
    ///
    /// Re-inserting an item already present moves it to its new bounds.
    /// Bounds with NaN or inverted coordinates are rejected and leave the
    /// tree untouched.
    pub fn insert(&mut self, bounds: AABB, item: T) -> Result<()> {
        if !bounds.is_valid() {
            crate::engine_error!(
                "galaxy3d::Octree",
                "Rejected bounds min={:?} max={:?}",
                bounds.min, bounds.max
            );
            return Err(Error::InvalidBounds(format!(
                "min={:?} max={:?}", bounds.min, bounds.max
            )));
        }

        self.remove(item);

        if !self.nodes[ROOT].aabb.contains(&bounds) {
            self.overflow.push(item);
            self.locations.insert(item, (Placement::Overflow, bounds));
            return Ok(());
        }

        let node_idx = self.descend(ROOT, &bounds);
        self.nodes[node_idx].objects.push(item);
        self.locations.insert(item, (Placement::Node(node_idx), bounds));
        self.split_if_needed(node_idx);
        Ok(())
    }

    /// Remove `item`. Returns `false` if it was not present.
    ///
    /// Nodes are never merged back; an emptied subtree costs one
    /// classification per query.
    pub fn remove(&mut self, item: T) -> bool {
        let Some((placement, _)) = self.locations.remove(&item) else {
            return false;
        };

        let list = match placement {
            Placement::Node(idx) => &mut self.nodes[idx].objects,
            Placement::Overflow => &mut self.overflow,
        };
        if let Some(pos) = list.iter().position(|&k| k == item) {
            list.swap_remove(pos);
        }
        true
    }

    /// Remove every item and collapse the tree back to its root.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT].first_child = None;
        self.nodes[ROOT].objects.clear();
        self.overflow.clear();
        self.locations.clear();
    }

    /// Append to `results` every item whose bounds are not disjoint from
    /// `frustum` and for which `predicate` holds.
    ///
    /// Subtrees whose region is outside the frustum are skipped; subtrees
    /// fully inside are collected without per-item tests.
    pub fn query<F>(&self, frustum: &Frustum, mut predicate: F, results: &mut Vec<T>)
    where
        F: FnMut(T) -> bool,
    {
        let root_class = frustum.classify_aabb(&self.nodes[ROOT].aabb);
        self.query_recursive(ROOT, frustum, root_class, &mut predicate, results);

        for &item in &self.overflow {
            if let Some((_, aabb)) = self.locations.get(&item) {
                if frustum.intersects_aabb(aabb) && predicate(item) {
                    results.push(item);
                }
            }
        }
    }

    /// Every item, in no particular order.
    pub fn items(&self) -> impl Iterator<Item = T> + '_ {
        self.locations.keys().copied()
    }

    // ===== INTERNALS =====

    /// Determine which octant a point falls into relative to a center.
    ///
    /// Bit layout: bit0 = X, bit1 = Y, bit2 = Z (0 = low, 1 = high).
    fn point_octant(center: &Vec3, point: &Vec3) -> usize {
        ((point.x >= center.x) as usize)
            | (((point.y >= center.y) as usize) << 1)
            | (((point.z >= center.z) as usize) << 2)
    }

    /// Region of octant `octant` of `parent`.
    fn octant_aabb(parent: &AABB, center: &Vec3, octant: usize) -> AABB {
        AABB {
            min: Vec3::new(
                if octant & 1 == 0 { parent.min.x } else { center.x },
                if octant & 2 == 0 { parent.min.y } else { center.y },
                if octant & 4 == 0 { parent.min.z } else { center.z },
            ),
            max: Vec3::new(
                if octant & 1 == 0 { center.x } else { parent.max.x },
                if octant & 2 == 0 { center.y } else { parent.max.y },
                if octant & 4 == 0 { center.z } else { parent.max.z },
            ),
        }
    }

    /// Child of `node_idx` fully containing `bounds`, if any.
    fn child_for(&self, node_idx: usize, bounds: &AABB) -> Option<usize> {
        let node = &self.nodes[node_idx];
        let first_child = node.first_child?;
        let center = node.aabb.center();
        let min_oct = Self::point_octant(&center, &bounds.min);
        let max_oct = Self::point_octant(&center, &bounds.max);
        // Corners in different octants: straddles a split plane
        (min_oct == max_oct).then_some(first_child + min_oct)
    }

    /// Deepest existing node under `start` that fully contains `bounds`.
    fn descend(&self, start: usize, bounds: &AABB) -> usize {
        let mut node_idx = start;
        while let Some(child) = self.child_for(node_idx, bounds) {
            node_idx = child;
        }
        node_idx
    }

    fn split_if_needed(&mut self, node_idx: usize) {
        let node = &self.nodes[node_idx];
        if node.first_child.is_some()
            || node.objects.len() <= self.split_threshold
            || node.depth >= self.max_depth
        {
            return;
        }

        let parent_aabb = node.aabb;
        let depth = node.depth + 1;
        let center = parent_aabb.center();
        let first_child = self.nodes.len();
        for octant in 0..8 {
            let child_aabb = Self::octant_aabb(&parent_aabb, &center, octant);
            self.nodes.push(OctreeNode::new(child_aabb, depth));
        }
        self.nodes[node_idx].first_child = Some(first_child);

        // Migrate existing items into the children that contain them
        let items = std::mem::take(&mut self.nodes[node_idx].objects);
        for item in items {
            let target = self
                .locations
                .get(&item)
                .and_then(|(_, aabb)| self.child_for(node_idx, aabb))
                .unwrap_or(node_idx);
            self.nodes[target].objects.push(item);
            if let Some(entry) = self.locations.get_mut(&item) {
                entry.0 = Placement::Node(target);
            }
        }

        for child in first_child..first_child + 8 {
            self.split_if_needed(child);
        }
    }

    /// 3-way classification at each node:
    /// - `Outside` -> skip entire subtree
    /// - `Inside` -> collect all objects from subtree without further testing
    /// - `Partial` -> test objects individually, recurse into children
    fn query_recursive<F>(
        &self,
        node_idx: usize,
        frustum: &Frustum,
        classification: FrustumTest,
        predicate: &mut F,
        results: &mut Vec<T>,
    ) where
        F: FnMut(T) -> bool,
    {
        let node = &self.nodes[node_idx];

        match classification {
            FrustumTest::Outside => {}

            FrustumTest::Inside => self.collect_all(node_idx, predicate, results),

            FrustumTest::Partial => {
                for &item in &node.objects {
                    if let Some((_, aabb)) = self.locations.get(&item) {
                        if frustum.intersects_aabb(aabb) && predicate(item) {
                            results.push(item);
                        }
                    }
                }

                if let Some(first_child) = node.first_child {
                    for child_idx in first_child..first_child + 8 {
                        let child_class = frustum.classify_aabb(&self.nodes[child_idx].aabb);
                        self.query_recursive(child_idx, frustum, child_class, predicate, results);
                    }
                }
            }
        }
    }

    /// Collect all objects from a node and its entire subtree (no frustum test).
    fn collect_all<F>(&self, node_idx: usize, predicate: &mut F, results: &mut Vec<T>)
    where
        F: FnMut(T) -> bool,
    {
        let node = &self.nodes[node_idx];
        results.extend(node.objects.iter().copied().filter(|&item| predicate(item)));

        if let Some(first_child) = node.first_child {
            for child_idx in first_child..first_child + 8 {
                self.collect_all(child_idx, predicate, results);
            }
        }
    }
}

#[cfg(test)]
#[path = "octree_tests.rs"]
mod tests;
