/*!
# Galaxy 3D Scene

Real-time scene rendering pipeline for the Galaxy 3D engine.

Each frame, drawables registered in a [`Scene`](galaxy3d::scene::Scene)
are culled against the camera frustum through an octree, filtered per
render pass, ordered by distance, and asked to record their draw
commands into a backend command list. Backends plug in through the
narrow traits of the `device` module.

## Architecture

- **device**: backend surface (GraphicsDevice, CommandList, buffers, textures)
- **camera**: Camera and Frustum
- **scene**: Octree, pass filters, render queue, geometry batch, Scene
- **TextureCache**: decoded images and device textures keyed by path
- **SpriteRenderable**: batched screen-space sprite drawable
- **FrameDriver**: owns the device and runs frames
*/

// Internal modules
mod error;
mod engine;
mod config;
mod texture_cache;
mod sprite;
mod frame_driver;
pub mod log;
pub mod device;
pub mod camera;
pub mod scene;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-wide services (logger)
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{SceneConfig, MAX_OCTREE_DEPTH};

    // Frame driving
    pub use crate::frame_driver::{FrameDriver, RenderableQueue};

    // Texture cache
    pub use crate::texture_cache::{TextureCache, ImageData};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Backend surface
    pub mod device {
        pub use crate::device::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Built-in drawables
    pub mod sprite {
        pub use crate::sprite::{SpriteRenderable, SpriteMatrices, SPRITE_TEXTURE_PATH, SPRITE_QUAD_CAPACITY};
    }
}

// Re-export math library at crate root
pub use glam;
