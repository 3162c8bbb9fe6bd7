/// SceneContext: device objects shared by every drawable of a scene.
///
/// Holds the camera uniform buffer, the main scene colour/depth targets
/// and framebuffer, the resolved colour texture read by post passes, and
/// the two-target duplicator framebuffer. Window-sized objects are
/// recreated on resize; all objects are recreated on sample count change.

use std::sync::Arc;
use crate::camera::{Camera, CameraInfo};
use crate::device::{
    Buffer, BufferDesc, BufferUsage, CommandList, Framebuffer, FramebufferDesc, GraphicsDevice,
    SampleCount, Texture, TextureDesc, TextureFormat, TextureUsage,
};
use crate::error::{Error, Result};

const COLOR_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
const DEPTH_FORMAT: TextureFormat = TextureFormat::R32_SFLOAT;

pub struct SceneContext {
    /// Sample count asked for (menu value)
    requested_sample_count: SampleCount,
    /// Sample count actually used, clamped to device support
    sample_count: SampleCount,
    camera_info_buffer: Option<Arc<dyn Buffer>>,
    main_color: Option<Arc<dyn Texture>>,
    main_depth: Option<Arc<dyn Texture>>,
    main_framebuffer: Option<Arc<dyn Framebuffer>>,
    /// Same texture as `main_color` when single-sampled
    main_resolved_color: Option<Arc<dyn Texture>>,
    duplicator_targets: Vec<Arc<dyn Texture>>,
    duplicator_framebuffer: Option<Arc<dyn Framebuffer>>,
}

fn missing(what: &str) -> Error {
    Error::InvalidState(format!("scene context {} not created", what))
}

impl SceneContext {
    pub fn new(sample_count: SampleCount) -> Self {
        Self {
            requested_sample_count: sample_count,
            sample_count,
            camera_info_buffer: None,
            main_color: None,
            main_depth: None,
            main_framebuffer: None,
            main_resolved_color: None,
            duplicator_targets: Vec::new(),
            duplicator_framebuffer: None,
        }
    }

    // ===== GETTERS =====

    pub fn requested_sample_count(&self) -> SampleCount {
        self.requested_sample_count
    }

    /// Sample count of the main scene targets
    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    /// The main colour target must be resolved before post passes read it
    pub fn needs_resolve(&self) -> bool {
        self.sample_count != SampleCount::X1
    }

    pub fn has_device_objects(&self) -> bool {
        self.camera_info_buffer.is_some()
    }

    pub fn camera_info_buffer(&self) -> Result<&Arc<dyn Buffer>> {
        self.camera_info_buffer.as_ref().ok_or_else(|| missing("camera buffer"))
    }

    pub fn main_color_texture(&self) -> Result<&Arc<dyn Texture>> {
        self.main_color.as_ref().ok_or_else(|| missing("main colour texture"))
    }

    pub fn main_depth_texture(&self) -> Result<&Arc<dyn Texture>> {
        self.main_depth.as_ref().ok_or_else(|| missing("main depth texture"))
    }

    pub fn main_framebuffer(&self) -> Result<&Arc<dyn Framebuffer>> {
        self.main_framebuffer.as_ref().ok_or_else(|| missing("main framebuffer"))
    }

    pub fn main_resolved_color_texture(&self) -> Result<&Arc<dyn Texture>> {
        self.main_resolved_color.as_ref().ok_or_else(|| missing("resolved colour texture"))
    }

    pub fn duplicator_targets(&self) -> &[Arc<dyn Texture>] {
        &self.duplicator_targets
    }

    pub fn duplicator_framebuffer(&self) -> Result<&Arc<dyn Framebuffer>> {
        self.duplicator_framebuffer.as_ref().ok_or_else(|| missing("duplicator framebuffer"))
    }

    // ===== SETTERS =====

    /// Takes effect at the next `create_device_objects`
    pub fn set_sample_count(&mut self, sample_count: SampleCount) {
        self.requested_sample_count = sample_count;
    }

    // ===== DEVICE OBJECTS =====

    /// Create the camera buffer (filled from `camera`) and every
    /// window-sized object.
    pub fn create_device_objects(
        &mut self,
        device: &mut dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        camera: &Camera,
    ) -> Result<()> {
        self.camera_info_buffer = Some(device.create_buffer(BufferDesc {
            name: "Camera info".to_string(),
            size: std::mem::size_of::<CameraInfo>() as u64,
            usage: BufferUsage::Uniform,
        })?);
        self.update_camera_buffer(cmd, camera)?;
        self.recreate_window_sized_resources(device, cmd)
    }

    /// Release every device object. Safe to call repeatedly.
    pub fn destroy_device_objects(&mut self) {
        self.camera_info_buffer = None;
        self.drop_window_sized_resources();
    }

    /// Record an update of the camera buffer from `camera`
    pub fn update_camera_buffer(&self, cmd: &mut dyn CommandList, camera: &Camera) -> Result<()> {
        let buffer = self.camera_info_buffer()?;
        cmd.update_buffer(buffer, 0, bytemuck::bytes_of(&camera.camera_info()))
    }

    /// Recreate every object sized after the swapchain.
    ///
    /// Previous handles are released first, so repeated calls never
    /// accumulate objects.
    pub fn recreate_window_sized_resources(
        &mut self,
        device: &mut dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
    ) -> Result<()> {
        self.drop_window_sized_resources();

        let swapchain = device.swapchain_framebuffer();
        let (width, height) = (swapchain.width(), swapchain.height());

        let supported = device.max_sample_count(COLOR_FORMAT);
        let sample_count = self.requested_sample_count.clamped_to(supported);
        if sample_count != self.requested_sample_count {
            crate::engine_warn!(
                "galaxy3d::SceneContext",
                "{}x MSAA not supported, using {}x",
                self.requested_sample_count.samples(), sample_count.samples()
            );
        }
        self.sample_count = sample_count;

        let color_desc = |name: &str, sample_count: SampleCount| TextureDesc {
            name: name.to_string(),
            width,
            height,
            format: COLOR_FORMAT,
            usage: TextureUsage::SampledAndRenderTarget,
            sample_count,
            data: None,
        };

        let main_color = device.create_texture(color_desc("Main scene colour", sample_count))?;
        let main_resolved_color = if sample_count != SampleCount::X1 {
            device.create_texture(color_desc("Main scene resolved colour", SampleCount::X1))?
        } else {
            main_color.clone()
        };
        let main_depth = device.create_texture(TextureDesc {
            name: "Main scene depth".to_string(),
            width,
            height,
            format: DEPTH_FORMAT,
            usage: TextureUsage::DepthStencil,
            sample_count,
            data: None,
        })?;
        let main_framebuffer = device.create_framebuffer(FramebufferDesc {
            name: "Main scene".to_string(),
            color_attachments: vec![main_color.clone()],
            depth_attachment: Some(main_depth.clone()),
        })?;

        let duplicator_targets = vec![
            device.create_texture(color_desc("Duplicator target 0", SampleCount::X1))?,
            device.create_texture(color_desc("Duplicator target 1", SampleCount::X1))?,
        ];
        let duplicator_framebuffer = device.create_framebuffer(FramebufferDesc {
            name: "Duplicator".to_string(),
            color_attachments: duplicator_targets.clone(),
            depth_attachment: None,
        })?;

        self.main_color = Some(main_color);
        self.main_resolved_color = Some(main_resolved_color);
        self.main_depth = Some(main_depth);
        self.main_framebuffer = Some(main_framebuffer);
        self.duplicator_targets = duplicator_targets;
        self.duplicator_framebuffer = Some(duplicator_framebuffer);

        crate::engine_debug!(
            "galaxy3d::SceneContext",
            "Window-sized resources created ({}x{}, {}x MSAA)",
            width, height, sample_count.samples()
        );
        Ok(())
    }

    fn drop_window_sized_resources(&mut self) {
        self.main_framebuffer = None;
        self.main_color = None;
        self.main_resolved_color = None;
        self.main_depth = None;
        self.duplicator_framebuffer = None;
        self.duplicator_targets.clear();
    }
}

#[cfg(test)]
#[path = "scene_context_tests.rs"]
mod tests;
