//! Scene module
//!
//! Spatial indexing, pass filtering, draw ordering and the per-frame
//! orchestration of registered drawables.

mod aabb;
mod octree;
mod passes;
mod visibility;
mod render_queue;
mod geometry_batch;
mod scene_context;
mod renderable;
mod scene;

pub use aabb::AABB;
pub use octree::Octree;
pub use passes::{RenderPasses, STAGE_ORDER};
pub use visibility::{PassFilter, FilterCache};
pub use render_queue::{RenderQueue, RenderItem, RenderOrderKey};
pub use geometry_batch::{GeometryBatch, QuadReservation, VertexPositionColorTexture};
pub use scene_context::SceneContext;
pub use renderable::{
    GraphicsResource, Renderable, Updateable, FrameTime,
    SharedRenderable, SharedGraphicsResource, SharedUpdateable,
};
pub use scene::{Scene, RenderableKey, RenderItemComparer};

pub(crate) use renderable::lock;
