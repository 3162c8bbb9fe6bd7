/// Frame driver: owns the device and drives one scene frame after frame.
///
/// ```text
/// window_resized / change_sample_count   (latched, any time)
/// run_frame(dt):
///   update(time)
///   draw():
///     apply latched resize, then latched sample count
///     begin frame commands
///     drain queued drawables into the scene (device objects created
///     on the frame command list)
///     render_all_stages
///     end, submit
/// ```
///
/// New drawables may be produced on other threads; they reach the scene
/// only through the `RenderableQueue` handle and are drained on the
/// render thread at the start of the next `draw`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::config::SceneConfig;
use crate::device::{CommandList, Framebuffer, GraphicsDevice, SampleCount};
use crate::error::{Error, Result};
use crate::scene::{lock, FrameTime, Scene, SceneContext, SharedRenderable};
use crate::texture_cache::TextureCache;

type ResizeHandler = Box<dyn FnMut(u32, u32) + Send>;

/// Cloneable hand-off of new drawables to a FrameDriver
#[derive(Clone)]
pub struct RenderableQueue {
    sender: Sender<SharedRenderable>,
}

impl RenderableQueue {
    /// Queue `renderable`; it joins the scene at the start of the next draw.
    pub fn push(&self, renderable: SharedRenderable) -> Result<()> {
        self.sender
            .send(renderable)
            .map_err(|_| Error::InvalidState("frame driver no longer accepts drawables".to_string()))
    }
}

pub struct FrameDriver {
    device: Box<dyn GraphicsDevice>,
    scene: Scene,
    context: SceneContext,
    texture_cache: Arc<TextureCache>,
    frame_commands: Option<Box<dyn CommandList>>,
    queue_sender: Sender<SharedRenderable>,
    queue: Receiver<SharedRenderable>,
    pending_resize: Option<(u32, u32)>,
    pending_sample_count: Option<SampleCount>,
    resize_handlers: Vec<ResizeHandler>,
    time: FrameTime,
}

impl FrameDriver {
    /// Create a driver for `device`, sized after its swapchain.
    ///
    /// Device objects are not created yet: call
    /// `create_graphics_device_objects` before the first `draw`.
    pub fn new(device: Box<dyn GraphicsDevice>, config: SceneConfig) -> Result<Self> {
        let swapchain = device.swapchain_framebuffer();
        let scene = Scene::new(&config, swapchain.width(), swapchain.height())?;
        let (queue_sender, queue) = mpsc::channel();

        crate::engine_info!(
            "galaxy3d::FrameDriver",
            "Frame driver ready ({}x{}, {}x MSAA requested)",
            swapchain.width(), swapchain.height(), config.sample_count.samples()
        );

        Ok(Self {
            device,
            scene,
            context: SceneContext::new(config.sample_count),
            texture_cache: Arc::new(TextureCache::new()),
            frame_commands: None,
            queue_sender,
            queue,
            pending_resize: None,
            pending_sample_count: None,
            resize_handlers: Vec::new(),
            time: FrameTime::default(),
        })
    }

    // ===== ACCESSORS =====

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn context(&self) -> &SceneContext {
        &self.context
    }

    pub fn texture_cache(&self) -> &Arc<TextureCache> {
        &self.texture_cache
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    /// Time of the last `run_frame`
    pub fn frame_time(&self) -> FrameTime {
        self.time
    }

    /// Handle for queueing drawables, usable from any thread
    pub fn queue_handle(&self) -> RenderableQueue {
        RenderableQueue { sender: self.queue_sender.clone() }
    }

    // ===== LATCHED REQUESTS =====

    /// Latch a window resize, applied at the start of the next draw.
    pub fn window_resized(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    /// Latch an MSAA change, applied at the start of the next draw.
    pub fn change_sample_count(&mut self, sample_count: SampleCount) {
        self.pending_sample_count = Some(sample_count);
    }

    /// Run `handler(width, height)` each time a resize is applied
    pub fn add_resize_handler<F>(&mut self, handler: F)
    where
        F: FnMut(u32, u32) + Send + 'static,
    {
        self.resize_handlers.push(Box::new(handler));
    }

    // ===== FRAME =====

    pub fn update(&mut self, time: &FrameTime) -> Result<()> {
        self.scene.update(time)
    }

    /// Advance time by `delta_seconds`, update, then draw.
    pub fn run_frame(&mut self, delta_seconds: f32) -> Result<()> {
        self.time = self.time.advance(delta_seconds);
        let time = self.time;
        self.update(&time)?;
        self.draw()
    }

    /// Record and submit one frame.
    pub fn draw(&mut self) -> Result<()> {
        if let Some((width, height)) = self.pending_resize.take() {
            self.apply_resize(width, height)?;
        }

        if let Some(sample_count) = self.pending_sample_count.take() {
            crate::engine_info!(
                "galaxy3d::FrameDriver",
                "Switching to {}x MSAA",
                sample_count.samples()
            );
            self.context.set_sample_count(sample_count);
            self.destroy_graphics_device_objects()?;
            self.create_graphics_device_objects()?;
        }

        let Some(cmd) = self.frame_commands.as_mut() else {
            return Err(Error::InvalidState(
                "draw before create_graphics_device_objects".to_string(),
            ));
        };

        cmd.begin()?;

        // Closed even when recording fails
        let recorded = Self::record_frame(
            &self.queue,
            &mut self.scene,
            self.device.as_mut(),
            cmd.as_mut(),
            &self.context,
        );
        let ended = cmd.end();
        recorded?;
        ended?;

        self.device.submit(&[cmd.as_ref()])
    }

    fn record_frame(
        queue: &Receiver<SharedRenderable>,
        scene: &mut Scene,
        device: &mut dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        context: &SceneContext,
    ) -> Result<()> {
        while let Ok(renderable) = queue.try_recv() {
            scene.add_renderable(renderable.clone(), true)?;
            lock(&renderable, "Renderable")?.create_device_objects(device, cmd, context)?;
        }

        scene.render_all_stages(device, cmd, context)
    }

    /// Destroy and recreate every device object `count` times.
    pub fn refresh_device_objects(&mut self, count: usize) -> Result<Duration> {
        let start = Instant::now();
        for _ in 0..count {
            self.destroy_graphics_device_objects()?;
            self.create_graphics_device_objects()?;
        }
        let elapsed = start.elapsed();

        crate::engine_info!(
            "galaxy3d::FrameDriver",
            "Refreshing resources {} times took {} seconds",
            count, elapsed.as_secs_f64()
        );
        Ok(elapsed)
    }

    // ===== DEVICE OBJECTS =====

    /// Create the frame command list, then the context and scene device
    /// objects on a one-off initialization list, submitted immediately.
    pub fn create_graphics_device_objects(&mut self) -> Result<()> {
        self.frame_commands = Some(self.device.create_command_list("Frame Commands List")?);

        let mut init = self
            .device
            .create_command_list("Recreation Initialization Command List")?;
        init.begin()?;
        self.context
            .create_device_objects(self.device.as_mut(), init.as_mut(), self.scene.camera())?;
        self.scene
            .create_graphics_device_objects(self.device.as_mut(), init.as_mut(), &self.context)?;
        init.end()?;
        self.device.submit(&[init.as_ref()])
    }

    /// Wait for the device, then drop every device object (cache, context,
    /// scene) and wait again.
    pub fn destroy_graphics_device_objects(&mut self) -> Result<()> {
        self.device.wait_idle()?;

        self.frame_commands = None;
        self.texture_cache.destroy_device_objects();
        self.context.destroy_device_objects();
        self.scene.destroy_graphics_device_objects()?;

        self.device.wait_idle()
    }

    fn apply_resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.device.resize_main_window(width, height)?;
        self.scene.camera_mut().window_resized(width, height);
        for handler in &mut self.resize_handlers {
            handler(width, height);
        }

        let mut cmd = self.device.create_command_list("Main Window Resize Command List")?;
        cmd.begin()?;
        self.context
            .recreate_window_sized_resources(self.device.as_mut(), cmd.as_mut())?;
        cmd.end()?;
        self.device.submit(&[cmd.as_ref()])?;

        crate::engine_debug!("galaxy3d::FrameDriver", "Resized to {}x{}", width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_driver_tests.rs"]
mod tests;
