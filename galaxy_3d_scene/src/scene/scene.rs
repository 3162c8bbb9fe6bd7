/// Scene: per-frame visibility, ordering and draw orchestration.
///
/// Drawables are registered once and addressed by stable `RenderableKey`s
/// (SlotMap). Cullable drawables live in the octree, free drawables in a
/// flat list. Each frame:
///
/// ```text
/// update(time)
/// render_all_stages():
///   for each stage: query -> filter -> order -> render -> mark touched
///   update_per_frame_resources() for touched drawables, submit
/// ```
///
/// Device objects are a separate lifecycle: `destroy_graphics_device_objects`
/// and `create_graphics_device_objects` walk the registered resources in
/// registration order. The scene never destroys device objects on its own.

use std::cmp::Ordering;
use glam::Vec3;
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use crate::camera::{Camera, Frustum};
use crate::config::SceneConfig;
use crate::device::{CommandList, Framebuffer, GraphicsDevice, Rect2D, Viewport};
use crate::error::{Error, Result};
use super::aabb::AABB;
use super::octree::Octree;
use super::passes::RenderPasses;
use super::render_queue::{RenderItem, RenderQueue};
use super::renderable::{
    lock, same_object, FrameTime, SharedGraphicsResource, SharedRenderable, SharedUpdateable,
};
use super::scene_context::SceneContext;
use super::visibility::FilterCache;

new_key_type! {
    /// Stable key for a drawable registered in a Scene.
    pub struct RenderableKey;
}

/// Registered drawable, with the capabilities read at registration
struct RenderableEntry {
    renderable: SharedRenderable,
    passes: RenderPasses,
    bounds: Option<AABB>,
}

/// Something whose device objects the scene manages
enum ResourceHandle {
    Renderable(RenderableKey),
    Resource(SharedGraphicsResource),
}

/// Comparer for `render_sorted_by`
pub type RenderItemComparer<'a> =
    &'a mut dyn FnMut(&RenderItem<RenderableKey>, &RenderItem<RenderableKey>) -> Ordering;

pub struct Scene {
    camera: Camera,
    clear_color: [f32; 4],
    renderables: SlotMap<RenderableKey, RenderableEntry>,
    octree: Octree<RenderableKey>,
    free_renderables: Vec<RenderableKey>,
    /// Registration order drives device object creation/destruction
    resources: Vec<ResourceHandle>,
    updateables: Vec<SharedUpdateable>,
    render_queue: RenderQueue<RenderableKey>,
    cullable_stage: Vec<RenderableKey>,
    free_stage: Vec<RenderableKey>,
    /// Drawables rendered this frame, in first-render order
    touched: Vec<RenderableKey>,
    touched_set: FxHashSet<RenderableKey>,
    filters: FilterCache,
    resource_update_cmd: Option<Box<dyn CommandList>>,
}

impl Scene {
    /// Create an empty scene with a camera sized `width` x `height`.
    pub fn new(config: &SceneConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            camera: Camera::new(width, height),
            clear_color: config.clear_color,
            renderables: SlotMap::with_key(),
            octree: Octree::new(config.world_bounds, config.split_threshold, config.max_depth),
            free_renderables: Vec::new(),
            resources: Vec::new(),
            updateables: Vec::new(),
            render_queue: RenderQueue::new(),
            cullable_stage: Vec::new(),
            free_stage: Vec::new(),
            touched: Vec::new(),
            touched_set: FxHashSet::default(),
            filters: FilterCache::new(),
            resource_update_cmd: None,
        })
    }

    // ===== ACCESSORS =====

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    /// Cullable drawables currently indexed by the octree
    pub fn cullable_count(&self) -> usize {
        self.octree.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_renderables.len()
    }

    pub fn graphics_resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn renderable(&self, key: RenderableKey) -> Option<&SharedRenderable> {
        self.renderables.get(key).map(|entry| &entry.renderable)
    }

    /// Bounds recorded at registration (None for free drawables)
    pub fn bounding_box(&self, key: RenderableKey) -> Option<AABB> {
        self.renderables.get(key).and_then(|entry| entry.bounds)
    }

    /// Drawables rendered since the last per-frame resource update
    pub fn touched_this_frame(&self) -> &[RenderableKey] {
        &self.touched
    }

    pub fn has_device_objects(&self) -> bool {
        self.resource_update_cmd.is_some()
    }

    // ===== REGISTRATION =====

    /// Register a drawable.
    ///
    /// Passes and bounds are read once here. With `as_resource_owner`, the
    /// scene also drives its device object lifecycle. Registering the same
    /// drawable twice, or one with invalid bounds, is rejected.
    pub fn add_renderable(
        &mut self,
        renderable: SharedRenderable,
        as_resource_owner: bool,
    ) -> Result<RenderableKey> {
        if self.renderables.values().any(|entry| same_object(&entry.renderable, &renderable)) {
            return Err(Error::InvalidResource("drawable already registered".to_string()));
        }

        let (passes, bounds) = {
            let guard = lock(&renderable, "Renderable")?;
            (guard.render_passes(), guard.bounding_box())
        };

        let key = self.renderables.insert(RenderableEntry {
            renderable,
            passes,
            bounds,
        });

        match bounds {
            Some(bounds) => {
                if let Err(err) = self.octree.insert(bounds, key) {
                    self.renderables.remove(key);
                    return Err(err);
                }
            }
            None => self.free_renderables.push(key),
        }

        if as_resource_owner {
            self.resources.push(ResourceHandle::Renderable(key));
        }

        crate::engine_debug!(
            "galaxy3d::Scene",
            "Added {} drawable ({:?})",
            if bounds.is_some() { "cullable" } else { "free" },
            passes
        );
        Ok(key)
    }

    /// Register a device-object owner that does not draw.
    pub fn add_graphics_resource(&mut self, resource: SharedGraphicsResource) -> Result<()> {
        let duplicate = self.resources.iter().any(|handle| match handle {
            ResourceHandle::Resource(existing) => same_object(existing, &resource),
            ResourceHandle::Renderable(key) => self
                .renderables
                .get(*key)
                .is_some_and(|entry| same_object(&entry.renderable, &resource)),
        });
        if duplicate {
            return Err(Error::InvalidResource("graphics resource already registered".to_string()));
        }

        self.resources.push(ResourceHandle::Resource(resource));
        Ok(())
    }

    pub fn add_updateable(&mut self, updateable: SharedUpdateable) -> Result<()> {
        if self.updateables.iter().any(|existing| same_object(existing, &updateable)) {
            return Err(Error::InvalidResource("updateable already registered".to_string()));
        }
        self.updateables.push(updateable);
        Ok(())
    }

    // ===== FRAME =====

    /// Advance every updateable, in registration order.
    pub fn update(&mut self, time: &FrameTime) -> Result<()> {
        for updateable in &self.updateables {
            lock(updateable, "Updateable")?.update(time)?;
        }
        Ok(())
    }

    /// Record every stage of the frame into `cmd`, then run and submit the
    /// per-frame resource updates of the drawables that were rendered.
    pub fn render_all_stages(
        &mut self,
        device: &mut dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
    ) -> Result<()> {
        let viewpoint = self.camera.position();
        let camera_frustum = self.camera.frustum();
        let depth_clear = if device.is_depth_range_zero_to_one() { 0.0 } else { 1.0 };

        // An aborted frame may have left drawables marked
        self.touched.clear();
        self.touched_set.clear();

        ctx.update_camera_buffer(cmd, &self.camera)?;

        // Main scene: opaque geometry into the (possibly multisampled) targets
        let main_framebuffer = ctx.main_framebuffer()?.clone();
        let (width, height) = (main_framebuffer.width(), main_framebuffer.height());
        cmd.push_debug_group(RenderPasses::OPAQUE.debug_label())?;
        cmd.set_framebuffer(&main_framebuffer)?;
        cmd.set_viewport(Viewport::full(width, height))?;
        cmd.clear_color_target(0, self.clear_color)?;
        cmd.clear_depth_stencil(depth_clear)?;
        cmd.set_scissor(Rect2D::full(width, height))?;
        self.render(&*device, cmd, ctx, RenderPasses::OPAQUE, &camera_frustum, viewpoint)?;
        cmd.pop_debug_group()?;

        for pass in [RenderPasses::ALPHA_BLEND, RenderPasses::OVERLAY] {
            cmd.push_debug_group(pass.debug_label())?;
            self.render(&*device, cmd, ctx, pass, &camera_frustum, viewpoint)?;
            cmd.pop_debug_group()?;
        }

        if ctx.needs_resolve() {
            cmd.resolve_texture(ctx.main_color_texture()?, ctx.main_resolved_color_texture()?)?;
        }

        // Full-screen passes see everything
        let everything = Frustum::everything();
        let duplicator = ctx.duplicator_framebuffer()?.clone();
        let swapchain = device.swapchain_framebuffer();
        for (pass, framebuffer) in [
            (RenderPasses::DUPLICATOR, duplicator),
            (RenderPasses::SWAPCHAIN_OUTPUT, swapchain),
        ] {
            cmd.push_debug_group(pass.debug_label())?;
            cmd.set_framebuffer(&framebuffer)?;
            cmd.set_viewport(Viewport::full(framebuffer.width(), framebuffer.height()))?;
            self.render(&*device, cmd, ctx, pass, &everything, viewpoint)?;
            cmd.pop_debug_group()?;
        }

        self.update_per_frame_resources(device, ctx)
    }

    /// Render one pass with the default ordering for `pass`.
    pub fn render(
        &mut self,
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
        pass: RenderPasses,
        frustum: &Frustum,
        viewpoint: Vec3,
    ) -> Result<()> {
        self.render_pass(device, cmd, ctx, pass, frustum, viewpoint, None)
    }

    /// Render one pass ordered by `compare` instead of the default.
    #[allow(clippy::too_many_arguments)]
    pub fn render_sorted_by(
        &mut self,
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
        pass: RenderPasses,
        frustum: &Frustum,
        viewpoint: Vec3,
        compare: RenderItemComparer<'_>,
    ) -> Result<()> {
        self.render_pass(device, cmd, ctx, pass, frustum, viewpoint, Some(compare))
    }

    /// Drawables visible in `pass` through `frustum`: cullable first, then free.
    pub fn collect_visible(&mut self, pass: RenderPasses, frustum: &Frustum) -> Vec<RenderableKey> {
        self.collect_stage(pass, frustum);
        self.cullable_stage.iter().chain(self.free_stage.iter()).copied().collect()
    }

    // ===== DEVICE OBJECTS =====

    /// Create the device objects of every registered resource, in
    /// registration order, then the resource-update command list.
    pub fn create_graphics_device_objects(
        &mut self,
        device: &mut dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
    ) -> Result<()> {
        self.camera.set_reverse_depth(device.is_depth_range_zero_to_one());

        for handle in &self.resources {
            match handle {
                ResourceHandle::Renderable(key) => {
                    if let Some(entry) = self.renderables.get(*key) {
                        lock(&entry.renderable, "Renderable")?.create_device_objects(device, cmd, ctx)?;
                    }
                }
                ResourceHandle::Resource(resource) => {
                    lock(resource, "GraphicsResource")?.create_device_objects(device, cmd, ctx)?;
                }
            }
        }

        self.resource_update_cmd = Some(device.create_command_list("Scene Resource Update Command List")?);
        crate::engine_debug!(
            "galaxy3d::Scene",
            "Created device objects for {} resources",
            self.resources.len()
        );
        Ok(())
    }

    /// Destroy the device objects of every registered resource, in
    /// registration order, and the resource-update command list.
    pub fn destroy_graphics_device_objects(&mut self) -> Result<()> {
        for handle in &self.resources {
            match handle {
                ResourceHandle::Renderable(key) => {
                    if let Some(entry) = self.renderables.get(*key) {
                        lock(&entry.renderable, "Renderable")?.destroy_device_objects();
                    }
                }
                ResourceHandle::Resource(resource) => {
                    lock(resource, "GraphicsResource")?.destroy_device_objects();
                }
            }
        }

        self.resource_update_cmd = None;
        Ok(())
    }

    // ===== INTERNALS =====

    /// Fill `cullable_stage` and `free_stage` for `pass`.
    fn collect_stage(&mut self, pass: RenderPasses, frustum: &Frustum) {
        let filter = self.filters.get(pass);
        let renderables = &self.renderables;

        self.cullable_stage.clear();
        self.octree.query(
            frustum,
            |key| renderables.get(key).is_some_and(|entry| filter.matches(entry.passes)),
            &mut self.cullable_stage,
        );

        self.free_stage.clear();
        self.free_stage.extend(
            self.free_renderables
                .iter()
                .copied()
                .filter(|key| renderables.get(*key).is_some_and(|entry| filter.matches_any(entry.passes))),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn render_pass(
        &mut self,
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
        pass: RenderPasses,
        frustum: &Frustum,
        viewpoint: Vec3,
        compare: Option<RenderItemComparer<'_>>,
    ) -> Result<()> {
        self.collect_stage(pass, frustum);

        self.render_queue.clear();
        for &key in self.cullable_stage.iter().chain(self.free_stage.iter()) {
            if let Some(entry) = self.renderables.get(key) {
                let order_key = lock(&entry.renderable, "Renderable")?.render_order_key(viewpoint);
                self.render_queue.push(key, order_key);
            }
        }

        match compare {
            Some(compare) => self.render_queue.sort_by(compare),
            None => self.render_queue.sort(pass.is_back_to_front()),
        }

        for key in self.render_queue.iter() {
            if let Some(entry) = self.renderables.get(key) {
                lock(&entry.renderable, "Renderable")?.render(device, cmd, ctx, pass)?;
            }
        }

        for &key in self.cullable_stage.iter().chain(self.free_stage.iter()) {
            if self.touched_set.insert(key) {
                self.touched.push(key);
            }
        }
        Ok(())
    }

    /// Per-frame resource updates for drawables rendered this frame, on
    /// the scene's own command list, then submit it.
    fn update_per_frame_resources(&mut self, device: &mut dyn GraphicsDevice, ctx: &SceneContext) -> Result<()> {
        let Some(update_cmd) = self.resource_update_cmd.as_mut() else {
            return Err(Error::InvalidState(
                "scene device objects not created before rendering".to_string(),
            ));
        };

        update_cmd.begin()?;
        let recorded = self.touched.iter().try_for_each(|key| match self.renderables.get(*key) {
            Some(entry) => lock(&entry.renderable, "Renderable")?
                .update_per_frame_resources(&*device, update_cmd.as_mut(), ctx),
            None => Ok(()),
        });
        let ended = update_cmd.end();

        self.touched.clear();
        self.touched_set.clear();

        recorded?;
        ended?;
        device.submit(&[update_cmd.as_ref()])
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
