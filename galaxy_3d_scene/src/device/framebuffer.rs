/// Framebuffer trait - groups color and depth attachments
///
/// Created once and reused each frame. Must be recreated only when
/// attachments change (e.g., window resize or sample count change).

use std::sync::Arc;
use super::texture::Texture;

/// Framebuffer: set of attachments a pass renders into
pub trait Framebuffer: Send + Sync {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Number of color attachments
    fn color_attachment_count(&self) -> usize;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc {
    /// Debug name shown in capture tools
    pub name: String,
    /// Color attachments
    pub color_attachments: Vec<Arc<dyn Texture>>,
    /// Optional depth attachment
    pub depth_attachment: Option<Arc<dyn Texture>>,
}
