/// Drawable contracts
///
/// - `GraphicsResource`: owns device objects, created and destroyed by the
///   orchestrator on device (re)creation, never by itself.
/// - `Renderable`: a resource that draws in one or more render passes.
///   Reporting a bounding box makes it cullable (indexed by the octree);
///   without one it is free and considered visible in every pass it
///   belongs to.
/// - `Updateable`: advanced once per frame before rendering.
///
/// Drawables are shared between the scene and their creator as
/// `Arc<Mutex<dyn ...>>`.

use std::sync::{Arc, Mutex, MutexGuard};
use glam::Vec3;
use crate::device::{CommandList, GraphicsDevice};
use crate::error::{Error, Result};
use super::aabb::AABB;
use super::passes::RenderPasses;
use super::render_queue::RenderOrderKey;
use super::scene_context::SceneContext;

pub type SharedRenderable = Arc<Mutex<dyn Renderable>>;
pub type SharedGraphicsResource = Arc<Mutex<dyn GraphicsResource>>;
pub type SharedUpdateable = Arc<Mutex<dyn Updateable>>;

pub trait GraphicsResource: Send {
    /// Create every device object this resource owns.
    ///
    /// Called again after `destroy_device_objects` on device recreation;
    /// must not leak the previous objects.
    fn create_device_objects(
        &mut self,
        device: &mut dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
    ) -> Result<()>;

    /// Release every device object. Safe to call repeatedly.
    fn destroy_device_objects(&mut self);
}

pub trait Renderable: GraphicsResource {
    /// Passes this drawable takes part in
    fn render_passes(&self) -> RenderPasses;

    /// World-space bounds; `Some` makes the drawable cullable
    fn bounding_box(&self) -> Option<AABB> {
        None
    }

    /// Sort key for this frame
    fn render_order_key(&self, _viewpoint: Vec3) -> RenderOrderKey {
        RenderOrderKey::NEUTRAL
    }

    /// Record draw commands for `pass`
    fn render(
        &mut self,
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
        pass: RenderPasses,
    ) -> Result<()>;

    /// Called once per frame, after all passes, if drawn this frame
    fn update_per_frame_resources(
        &mut self,
        _device: &dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
    ) -> Result<()> {
        Ok(())
    }
}

pub trait Updateable: Send {
    fn update(&mut self, time: &FrameTime) -> Result<()>;
}

/// Frame timing passed to `Updateable::update`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds since the previous frame
    pub elapsed_seconds: f32,
    /// Seconds since the first frame
    pub total_seconds: f32,
}

impl FrameTime {
    pub fn new(elapsed_seconds: f32, total_seconds: f32) -> Self {
        Self { elapsed_seconds, total_seconds }
    }

    /// Next frame, `delta_seconds` later
    pub fn advance(self, delta_seconds: f32) -> Self {
        Self {
            elapsed_seconds: delta_seconds,
            total_seconds: self.total_seconds + delta_seconds,
        }
    }
}

/// Lock a shared drawable, mapping poisoning to `BackendError`
pub(crate) fn lock<'a, T: ?Sized>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| Error::BackendError(format!("{} lock poisoned", what)))
}

/// Identity of a shared object, ignoring trait-object metadata
pub(crate) fn same_object<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
