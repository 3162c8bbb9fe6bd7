/// Graphics device module - the narrow backend surface the scene pipeline consumes
///
/// Backends (Vulkan, D3D, Metal, ...) implement these traits. The scene
/// pipeline never creates GPU objects by itself: it always goes through
/// a `GraphicsDevice` handed in by the caller.

pub mod buffer;
pub mod texture;
pub mod framebuffer;
pub mod pipeline;
pub mod command_list;
pub mod graphics_device;

pub use buffer::*;
pub use texture::*;
pub use framebuffer::*;
pub use pipeline::*;
pub use command_list::*;
pub use graphics_device::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
