//! Scene configuration
//!
//! Plain values with defaults matching the reference setup: a
//! [-50, 50]^3 octree splitting past 2 items down to depth 8, a sprite
//! batch of 16384 quads, black clear colour, MSAA off.

use glam::Vec3;
use crate::device::SampleCount;
use crate::error::{Error, Result};
use crate::scene::AABB;

/// Deepest octree accepted by `validate`
pub const MAX_OCTREE_DEPTH: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Region covered by the octree root
    pub world_bounds: AABB,
    /// A leaf splits once it holds more items than this
    pub split_threshold: usize,
    /// Leaves at this depth never split
    pub max_depth: u32,
    /// Quad capacity of sprite batches
    pub batch_quad_capacity: usize,
    /// Main scene clear colour
    pub clear_color: [f32; 4],
    /// Requested MSAA sample count (clamped to device support)
    pub sample_count: SampleCount,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            world_bounds: AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0)),
            split_threshold: 2,
            max_depth: 8,
            batch_quad_capacity: 16384,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            sample_count: SampleCount::X1,
        }
    }
}

impl SceneConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> {
            crate::engine_error!("galaxy3d::SceneConfig", "{}", msg);
            Err(Error::InitializationFailed(msg))
        };

        let bounds = &self.world_bounds;
        if !bounds.is_valid() || bounds.min.cmpge(bounds.max).any() {
            return fail(format!("world bounds {:?}..{:?} are empty or invalid", bounds.min, bounds.max));
        }
        if self.split_threshold == 0 {
            return fail("split threshold must be at least 1".to_string());
        }
        if self.max_depth > MAX_OCTREE_DEPTH {
            return fail(format!("max depth {} above {}", self.max_depth, MAX_OCTREE_DEPTH));
        }
        // Quad vertices are addressed with u32 indices
        if self.batch_quad_capacity == 0 || self.batch_quad_capacity > (u32::MAX / 4) as usize {
            return fail(format!("batch quad capacity {} out of range", self.batch_quad_capacity));
        }
        if self.clear_color.iter().any(|c| !c.is_finite()) {
            return fail("clear colour must be finite".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
