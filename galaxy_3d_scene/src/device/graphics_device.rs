/// GraphicsDevice trait - factory and submission interface of a backend

use std::sync::Arc;
use crate::error::Result;
use super::{
    Buffer, BufferDesc, Texture, TextureDesc, Framebuffer, FramebufferDesc,
    Pipeline, PipelineDesc, BindingGroup, BindingResource, CommandList,
    SampleCount, TextureFormat,
};

/// Graphics device: creates GPU objects, submits command lists
///
/// Implemented by backend-specific devices. Every GPU object the scene
/// pipeline touches is created through this trait.
pub trait GraphicsDevice: Send {
    /// Create a buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a framebuffer from existing attachments
    fn create_framebuffer(&mut self, desc: FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a graphics pipeline
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a binding group for slot `set_index` of `pipeline`
    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: Vec<BindingResource>,
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Create an empty command list
    fn create_command_list(&mut self, name: &str) -> Result<Box<dyn CommandList>>;

    /// Submit recorded command lists, in order
    fn submit(&mut self, commands: &[&dyn CommandList]) -> Result<()>;

    /// Block until the GPU finished all submitted work
    fn wait_idle(&mut self) -> Result<()>;

    /// Resize the swapchain
    fn resize_main_window(&mut self, width: u32, height: u32) -> Result<()>;

    /// Framebuffer presenting to the window
    fn swapchain_framebuffer(&self) -> Arc<dyn Framebuffer>;

    /// Whether clip-space depth is 0..1 (as opposed to -1..1)
    fn is_depth_range_zero_to_one(&self) -> bool;

    /// Highest sample count supported for color targets of `format`
    fn max_sample_count(&self, format: TextureFormat) -> SampleCount;
}
