/// Sprite batch drawable
///
/// A free drawable of the opaque pass that draws textured, vertex-coloured
/// screen-space quads through a GeometryBatch. Each frame `update`
/// rebuilds one quad whose colours cycle with time; `render` writes an
/// orthographic matrix block (pixel coordinates, origin top-left) and
/// submits the batch.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use crate::device::{
    BindingGroup, BindingResource, BlendMode, Buffer, BufferDesc, BufferUsage, CommandList,
    Framebuffer, GraphicsDevice, Pipeline, PipelineDesc, Texture, Viewport,
};
use crate::error::{Error, Result};
use crate::scene::{
    FrameTime, GeometryBatch, GraphicsResource, Renderable, RenderPasses, SceneContext,
    Updateable, VertexPositionColorTexture,
};
use crate::texture_cache::{ImageData, TextureCache};

/// Default sprite texture
pub const SPRITE_TEXTURE_PATH: &str = "Assets/Textures/DurrrSpaceShip.png";

/// Quads a sprite batch can hold per frame
pub const SPRITE_QUAD_CAPACITY: usize = 16384;

const SPRITE_SHADER_SET: &str = "GeometryBatch";
const QUAD_ORIGIN: [f32; 2] = [100.0, 100.0];
const QUAD_SIZE: f32 = 400.0;

/// Uniform block bound at slot 0 of the sprite pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteMatrices {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
}

impl SpriteMatrices {
    /// Pixel-space matrices for a `width` x `height` target
    pub fn screen_space(width: u32, height: u32) -> Self {
        let projection = Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, 0.0, 1.0);
        Self {
            projection: projection.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            world: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

struct SpriteDeviceObjects {
    pipeline: Arc<dyn Pipeline>,
    matrix_buffer: Arc<dyn Buffer>,
    matrix_group: Arc<dyn BindingGroup>,
    texture_group: Arc<dyn BindingGroup>,
    // Kept alive while bound in texture_group
    _texture: Arc<dyn Texture>,
}

pub struct SpriteRenderable {
    texture_path: String,
    texture_size: (u32, u32),
    cache: Arc<TextureCache>,
    batch: GeometryBatch<VertexPositionColorTexture>,
    device_objects: Option<SpriteDeviceObjects>,
}

impl SpriteRenderable {
    /// Create a sprite drawing `texture_path`, decoded through `cache`.
    pub fn new(cache: Arc<TextureCache>, texture_path: &str) -> Result<Self> {
        let image = cache.get_or_load(texture_path, || ImageData::from_file(texture_path))?;

        Ok(Self {
            texture_path: texture_path.to_string(),
            texture_size: (image.width, image.height),
            cache,
            batch: GeometryBatch::new("Sprite batch", SPRITE_QUAD_CAPACITY),
            device_objects: None,
        })
    }

    pub fn texture_path(&self) -> &str {
        &self.texture_path
    }

    pub fn batch(&self) -> &GeometryBatch<VertexPositionColorTexture> {
        &self.batch
    }

    pub fn has_device_objects(&self) -> bool {
        self.device_objects.is_some()
    }

    /// The animated quad at `total_seconds`: BR, BL, TL, TR
    fn quad_vertices(&self, total_seconds: f32) -> [VertexPositionColorTexture; 4] {
        let [x, y] = QUAD_ORIGIN;
        let (right, bottom) = (x + QUAD_SIZE, y + QUAD_SIZE);
        // Texel coordinates are 16-bit
        let u = self.texture_size.0.min(u16::MAX as u32) as u16;
        let v = self.texture_size.1.min(u16::MAX as u32) as u16;

        let red = ((total_seconds.cos() + 1.0) * 127.5) as u8;
        let green = ((total_seconds.sin() + 1.0) * 127.5) as u8;

        [
            VertexPositionColorTexture::new([right, bottom, 0.0], [0, green, 0, 255], [u, v]),
            VertexPositionColorTexture::new([x, bottom, 0.0], [0, green, 0, 255], [0, v]),
            VertexPositionColorTexture::new([x, y, 0.0], [red, 0, 0, 255], [0, 0]),
            VertexPositionColorTexture::new([right, y, 0.0], [0, 0, 255, 255], [u, 0]),
        ]
    }
}

impl GraphicsResource for SpriteRenderable {
    fn create_device_objects(
        &mut self,
        device: &mut dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
    ) -> Result<()> {
        if self.device_objects.is_some() {
            return Ok(());
        }

        let path = self.texture_path.clone();
        let texture = self
            .cache
            .get_or_create_device_texture(device, &path, || ImageData::from_file(&path))?;

        let matrix_buffer = device.create_buffer(BufferDesc {
            name: "Sprite matrices".to_string(),
            size: std::mem::size_of::<SpriteMatrices>() as u64,
            usage: BufferUsage::Uniform,
        })?;

        let pipeline = device.create_pipeline(PipelineDesc {
            shader_set: SPRITE_SHADER_SET.to_string(),
            vertex_stride: std::mem::size_of::<VertexPositionColorTexture>() as u32,
            vertex_attributes: VertexPositionColorTexture::attributes(),
            blend: BlendMode::Override,
            depth_test: true,
            binding_group_count: 2,
        })?;

        let matrix_group = device.create_binding_group(
            &pipeline,
            0,
            vec![BindingResource::UniformBuffer(matrix_buffer.clone())],
        )?;
        let texture_group = device.create_binding_group(
            &pipeline,
            1,
            vec![BindingResource::SampledTexture(texture.clone())],
        )?;

        self.batch.create_device_objects(device)?;

        self.device_objects = Some(SpriteDeviceObjects {
            pipeline,
            matrix_buffer,
            matrix_group,
            texture_group,
            _texture: texture,
        });
        Ok(())
    }

    fn destroy_device_objects(&mut self) {
        self.device_objects = None;
        self.batch.destroy_device_objects();
    }
}

impl Renderable for SpriteRenderable {
    fn render_passes(&self) -> RenderPasses {
        RenderPasses::OPAQUE
    }

    fn render(
        &mut self,
        _device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        ctx: &SceneContext,
        _pass: RenderPasses,
    ) -> Result<()> {
        let objects = self.device_objects.as_ref().ok_or_else(|| {
            Error::InvalidState("sprite rendered without device objects".to_string())
        })?;

        let framebuffer = ctx.main_framebuffer()?;
        let (width, height) = (framebuffer.width(), framebuffer.height());
        let matrices = SpriteMatrices::screen_space(width, height);

        cmd.update_buffer(&objects.matrix_buffer, 0, bytemuck::bytes_of(&matrices))?;
        cmd.bind_pipeline(&objects.pipeline)?;
        cmd.set_framebuffer(framebuffer)?;
        cmd.set_viewport(Viewport::full(width, height))?;
        cmd.bind_binding_group(0, &objects.matrix_group)?;
        cmd.bind_binding_group(1, &objects.texture_group)?;
        self.batch.submit(cmd)
    }
}

impl Updateable for SpriteRenderable {
    fn update(&mut self, time: &FrameTime) -> Result<()> {
        let quad = self.quad_vertices(time.total_seconds);

        self.batch.begin();
        self.batch.reserve_quads(1)?.vertices_mut().copy_from_slice(&quad);
        self.batch.end()
    }
}

#[cfg(test)]
#[path = "sprite_tests.rs"]
mod tests;
