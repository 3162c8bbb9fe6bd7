/// Pipeline and binding group traits
///
/// Both are opaque handles to the scene pipeline: drawables create them
/// through the GraphicsDevice and bind them through a CommandList.

use std::sync::Arc;
use super::buffer::Buffer;
use super::texture::Texture;

/// Vertex attribute formats used by batch vertex layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float3,
    Byte4Norm,
    UShort2,
}

/// One attribute of an interleaved vertex
#[derive(Debug, Clone)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Blend mode of a graphics pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source replaces destination
    Override,
    /// Standard alpha blending
    Alpha,
}

/// Descriptor for creating a graphics pipeline
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    /// Shader set name resolved by the backend
    pub shader_set: String,
    pub vertex_stride: u32,
    pub vertex_attributes: Vec<VertexAttribute>,
    pub blend: BlendMode,
    pub depth_test: bool,
    /// Number of binding group slots the pipeline expects
    pub binding_group_count: u32,
}

/// Graphics pipeline handle
pub trait Pipeline: Send + Sync {
    /// Number of binding group slots
    fn binding_group_count(&self) -> u32;
}

/// Resource bound in a binding group slot
pub enum BindingResource {
    UniformBuffer(Arc<dyn Buffer>),
    SampledTexture(Arc<dyn Texture>),
}

/// Immutable set of resource bindings (textures, buffers)
pub trait BindingGroup: Send + Sync {
    /// Slot this group was created for
    fn set_index(&self) -> u32;
}
