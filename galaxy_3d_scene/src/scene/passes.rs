use bitflags::bitflags;

bitflags! {
    /// Render stages a drawable takes part in
    ///
    /// A drawable may belong to several stages at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderPasses: u8 {
        /// Depth-tested, depth-writing geometry (front-to-back)
        const OPAQUE = 1 << 0;
        /// Blended geometry (back-to-front)
        const ALPHA_BLEND = 1 << 1;
        /// Drawn on top of the 3D scene
        const OVERLAY = 1 << 2;
        /// Copies the resolved scene into the duplicator targets
        const DUPLICATOR = 1 << 3;
        /// Final composition into the swapchain
        const SWAPCHAIN_OUTPUT = 1 << 4;
    }
}

/// Stages in execution order; later stages read what earlier ones wrote.
pub const STAGE_ORDER: [RenderPasses; 5] = [
    RenderPasses::OPAQUE,
    RenderPasses::ALPHA_BLEND,
    RenderPasses::OVERLAY,
    RenderPasses::DUPLICATOR,
    RenderPasses::SWAPCHAIN_OUTPUT,
];

impl RenderPasses {
    /// Blended stages sort farthest first
    pub fn is_back_to_front(self) -> bool {
        self.contains(RenderPasses::ALPHA_BLEND)
    }

    /// Debug group label recorded around the stage
    pub fn debug_label(self) -> &'static str {
        if self == RenderPasses::OPAQUE {
            "Scene"
        } else if self == RenderPasses::ALPHA_BLEND {
            "AlphaBlend"
        } else if self == RenderPasses::OVERLAY {
            "Overlay"
        } else if self == RenderPasses::DUPLICATOR {
            "Duplicator"
        } else if self == RenderPasses::SWAPCHAIN_OUTPUT {
            "SwapchainOutput"
        } else {
            "Custom"
        }
    }
}
