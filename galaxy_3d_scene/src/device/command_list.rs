/// CommandList trait - for recording rendering commands

use std::sync::Arc;
use crate::error::Result;
use super::{Buffer, BindingGroup, Framebuffer, Pipeline, Texture};

/// Command list for recording rendering commands
///
/// Commands are recorded and later submitted via `GraphicsDevice::submit()`.
/// Recording is single-threaded: one producer per list per frame.
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Set the framebuffer subsequent draws render into
    fn set_framebuffer(&mut self, framebuffer: &Arc<dyn Framebuffer>) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Clear a color attachment of the current framebuffer
    fn clear_color_target(&mut self, index: u32, color: [f32; 4]) -> Result<()>;

    /// Clear the depth attachment of the current framebuffer
    fn clear_depth_stencil(&mut self, depth: f32) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group (resource set) at `set_index`
    fn bind_binding_group(&mut self, set_index: u32, group: &Arc<dyn BindingGroup>) -> Result<()>;

    /// Bind a vertex buffer
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Record a buffer update executed in command order
    fn update_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()>;

    /// Resolve a multisampled texture into a single-sampled one
    fn resolve_texture(&mut self, source: &Arc<dyn Texture>, destination: &Arc<dyn Texture>) -> Result<()>;

    /// Open a named debug group (shown by capture tools)
    fn push_debug_group(&mut self, name: &str) -> Result<()>;

    /// Close the innermost debug group
    fn pop_debug_group(&mut self) -> Result<()>;
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size of one index in bytes
    pub fn size(self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering a whole `width` x `height` target, depth 0..1
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle covering a whole `width` x `height` target
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}
