/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Every command recorded by a mock command list is appended to a log
/// shared with the device, and every created buffer/texture is retained
/// by the shared state so tests can inspect contents and detect leaked
/// handles (a handle is live while someone besides the state holds it).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::device::{
    Buffer, BufferDesc, BufferUsage, Texture, TextureDesc, TextureInfo, TextureFormat,
    TextureUsage, Framebuffer, FramebufferDesc, Pipeline, PipelineDesc, BindingGroup,
    BindingResource, CommandList, GraphicsDevice, SampleCount, Viewport, Rect2D, IndexType,
};

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub name: String,
    pub usage: BufferUsage,
    pub size: u64,
    pub data: Mutex<Vec<u8>>,
    /// (offset, length) of every update, in order
    pub updates: Mutex<Vec<(u64, usize)>>,
}

impl MockBuffer {
    pub fn new(desc: &BufferDesc) -> Self {
        Self {
            name: desc.name.clone(),
            usage: desc.usage,
            size: desc.size,
            data: Mutex::new(vec![0u8; desc.size as usize]),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn bytes(&self, range: std::ops::Range<usize>) -> Vec<u8> {
        self.data.lock().unwrap()[range].to_vec()
    }

    pub fn update_log(&self) -> Vec<(u64, usize)> {
        self.updates.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        if end as u64 > self.size {
            return Err(Error::InvalidResource(format!(
                "update of {} bytes at {} overflows '{}' ({} bytes)",
                data.len(), offset, self.name, self.size
            )));
        }
        self.data.lock().unwrap()[offset as usize..end].copy_from_slice(data);
        self.updates.lock().unwrap().push((offset, data.len()));
        Ok(())
    }
}

// ============================================================================
// Mock Texture / Framebuffer / Pipeline / BindingGroup
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub name: String,
    pub info: TextureInfo,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

#[derive(Debug)]
pub struct MockFramebuffer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_count: usize,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_attachment_count(&self) -> usize {
        self.color_count
    }
}

#[derive(Debug)]
pub struct MockPipeline {
    pub shader_set: String,
    pub binding_group_count: u32,
}

impl Pipeline for MockPipeline {
    fn binding_group_count(&self) -> u32 {
        self.binding_group_count
    }
}

#[derive(Debug)]
pub struct MockBindingGroup {
    pub set_index: u32,
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

// ============================================================================
// Shared state
// ============================================================================

/// State shared between a MockDevice, its command lists and the test
#[derive(Default)]
pub struct MockDeviceState {
    pub log: Mutex<Vec<String>>,
    pub buffers: Mutex<Vec<Arc<MockBuffer>>>,
    pub textures: Mutex<Vec<Arc<MockTexture>>>,
    pub framebuffers: Mutex<Vec<Arc<MockFramebuffer>>>,
    pub pipelines: AtomicUsize,
    pub wait_idle_calls: AtomicUsize,
    pub submits: AtomicUsize,
}

impl MockDeviceState {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Recorded commands whose text starts with `prefix`
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.log().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    /// Buffers still referenced outside the mock
    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().unwrap().iter().filter(|b| Arc::strong_count(b) > 1).count()
    }

    /// Textures still referenced outside the mock
    pub fn live_textures(&self) -> usize {
        self.textures.lock().unwrap().iter().filter(|t| Arc::strong_count(t) > 1).count()
    }

    /// Framebuffers still referenced outside the mock (swapchain included)
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.lock().unwrap().iter().filter(|f| Arc::strong_count(f) > 1).count()
    }

    /// Most recently created live buffer with the given name
    pub fn buffer_named(&self, name: &str) -> Option<Arc<MockBuffer>> {
        self.buffers
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|b| b.name == name && Arc::strong_count(b) > 1)
            .cloned()
    }

    fn record(&self, line: String) {
        self.log.lock().unwrap().push(line);
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    pub name: String,
    pub recording: bool,
    state: Arc<MockDeviceState>,
}

impl MockCommandList {
    fn push(&self, command: String) {
        self.state.record(command);
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            return Err(Error::InvalidState(format!("'{}' already recording", self.name)));
        }
        self.recording = true;
        self.push(format!("begin({})", self.name));
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState(format!("'{}' not recording", self.name)));
        }
        self.recording = false;
        self.push(format!("end({})", self.name));
        Ok(())
    }

    fn set_framebuffer(&mut self, framebuffer: &Arc<dyn Framebuffer>) -> Result<()> {
        self.push(format!("set_framebuffer({}x{})", framebuffer.width(), framebuffer.height()));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push(format!("set_viewport({}x{})", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push(format!("set_scissor({}x{})", scissor.width, scissor.height));
        Ok(())
    }

    fn clear_color_target(&mut self, index: u32, _color: [f32; 4]) -> Result<()> {
        self.push(format!("clear_color_target({})", index));
        Ok(())
    }

    fn clear_depth_stencil(&mut self, depth: f32) -> Result<()> {
        self.push(format!("clear_depth_stencil({})", depth));
        Ok(())
    }

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push("bind_pipeline".to_string());
        Ok(())
    }

    fn bind_binding_group(&mut self, set_index: u32, _group: &Arc<dyn BindingGroup>) -> Result<()> {
        self.push(format!("bind_binding_group({})", set_index));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.push(format!("bind_vertex_buffer({})", offset));
        Ok(())
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.push(format!("bind_index_buffer({}, {:?})", offset, index_type));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.push(format!("draw_indexed({}, {}, {})", index_count, first_index, vertex_offset));
        Ok(())
    }

    fn update_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()> {
        self.push(format!("update_buffer({}, {})", offset, data.len()));
        buffer.update(offset, data)
    }

    fn resolve_texture(&mut self, _source: &Arc<dyn Texture>, _destination: &Arc<dyn Texture>) -> Result<()> {
        self.push("resolve_texture".to_string());
        Ok(())
    }

    fn push_debug_group(&mut self, name: &str) -> Result<()> {
        self.push(format!("push_debug_group({})", name));
        Ok(())
    }

    fn pop_debug_group(&mut self) -> Result<()> {
        self.push("pop_debug_group".to_string());
        Ok(())
    }
}

// ============================================================================
// Mock Device
// ============================================================================

pub struct MockDevice {
    state: Arc<MockDeviceState>,
    swapchain: Arc<dyn Framebuffer>,
    max_samples: SampleCount,
    depth_zero_to_one: bool,
    buffer_budget: Option<u64>,
    buffer_bytes: u64,
}

impl MockDevice {
    pub fn new(width: u32, height: u32) -> Self {
        let state = Arc::new(MockDeviceState::default());
        let swapchain = Self::make_swapchain(&state, width, height);
        Self {
            state,
            swapchain,
            max_samples: SampleCount::X8,
            depth_zero_to_one: true,
            buffer_budget: None,
            buffer_bytes: 0,
        }
    }

    pub fn with_max_samples(mut self, max: SampleCount) -> Self {
        self.max_samples = max;
        self
    }

    pub fn with_depth_zero_to_one(mut self, zero_to_one: bool) -> Self {
        self.depth_zero_to_one = zero_to_one;
        self
    }

    /// Fail buffer creation with `OutOfMemory` once `bytes` have been handed out
    pub fn with_buffer_budget(mut self, bytes: u64) -> Self {
        self.buffer_budget = Some(bytes);
        self
    }

    /// Handle on the shared state, valid after the device is moved away
    pub fn tracker(&self) -> Arc<MockDeviceState> {
        self.state.clone()
    }

    fn make_swapchain(state: &Arc<MockDeviceState>, width: u32, height: u32) -> Arc<dyn Framebuffer> {
        let fb = Arc::new(MockFramebuffer {
            name: "swapchain".to_string(),
            width,
            height,
            color_count: 1,
        });
        state.framebuffers.lock().unwrap().push(fb.clone());
        fb
    }
}

impl GraphicsDevice for MockDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        let total = self.buffer_bytes + desc.size;
        if self.buffer_budget.is_some_and(|budget| total > budget) {
            return Err(Error::OutOfMemory);
        }
        self.buffer_bytes = total;
        let buffer = Arc::new(MockBuffer::new(&desc));
        self.state.buffers.lock().unwrap().push(buffer.clone());
        Ok(buffer)
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!("texture '{}' has zero size", desc.name)));
        }
        let texture = Arc::new(MockTexture {
            name: desc.name.clone(),
            info: TextureInfo::from(&desc),
        });
        self.state.textures.lock().unwrap().push(texture.clone());
        Ok(texture)
    }

    fn create_framebuffer(&mut self, desc: FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        let first = desc
            .color_attachments
            .first()
            .or(desc.depth_attachment.as_ref())
            .ok_or_else(|| Error::InvalidResource(format!("framebuffer '{}' has no attachments", desc.name)))?;
        let info = *first.info();
        let fb = Arc::new(MockFramebuffer {
            name: desc.name,
            width: info.width,
            height: info.height,
            color_count: desc.color_attachments.len(),
        });
        self.state.framebuffers.lock().unwrap().push(fb.clone());
        Ok(fb)
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.state.pipelines.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPipeline {
            shader_set: desc.shader_set,
            binding_group_count: desc.binding_group_count,
        }))
    }

    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        _resources: Vec<BindingResource>,
    ) -> Result<Arc<dyn BindingGroup>> {
        if set_index >= pipeline.binding_group_count() {
            return Err(Error::InvalidResource(format!("binding group slot {} out of range", set_index)));
        }
        Ok(Arc::new(MockBindingGroup { set_index }))
    }

    fn create_command_list(&mut self, name: &str) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            name: name.to_string(),
            recording: false,
            state: self.state.clone(),
        }))
    }

    fn submit(&mut self, commands: &[&dyn CommandList]) -> Result<()> {
        self.state.submits.fetch_add(1, Ordering::SeqCst);
        self.state.record(format!("submit({})", commands.len()));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.state.wait_idle_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resize_main_window(&mut self, width: u32, height: u32) -> Result<()> {
        self.swapchain = Self::make_swapchain(&self.state, width, height);
        self.state.record(format!("resize_main_window({}x{})", width, height));
        Ok(())
    }

    fn swapchain_framebuffer(&self) -> Arc<dyn Framebuffer> {
        self.swapchain.clone()
    }

    fn is_depth_range_zero_to_one(&self) -> bool {
        self.depth_zero_to_one
    }

    fn max_sample_count(&self, _format: TextureFormat) -> SampleCount {
        self.max_samples
    }
}

/// Shorthand for a sampled RGBA texture descriptor
pub fn sampled_texture_desc(name: &str, width: u32, height: u32) -> TextureDesc {
    TextureDesc {
        name: name.to_string(),
        width,
        height,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::Sampled,
        sample_count: SampleCount::X1,
        data: None,
    }
}
