/// Texture cache
///
/// Decoded images and their device textures, keyed by asset path. One
/// cache is shared by every drawable of a frame driver; lookups and
/// inserts happen inside a single critical section per table, so a
/// loader runs at most once per key even with concurrent callers.
///
/// Destroying device objects drops the device textures but keeps the
/// decoded images, so recreation does not hit the disk again.

use std::path::Path;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::device::{GraphicsDevice, SampleCount, Texture, TextureDesc, TextureFormat, TextureUsage};
use crate::error::{Error, Result};

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Create an image, checking the pixel buffer matches the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "image {}x{} needs {} bytes, got {}",
                width, height, expected, pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Decode an image file (PNG) into RGBA8
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            crate::engine_err!("galaxy3d::TextureCache", "Failed to load image {:?}: {}", path, e)
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, rgba.into_raw())
    }

    /// Decode an in-memory encoded image into RGBA8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).map_err(|e| {
            crate::engine_err!("galaxy3d::TextureCache", "Failed to decode image: {}", e)
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, rgba.into_raw())
    }

    /// Single-colour image
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }
}

#[derive(Default)]
pub struct TextureCache {
    images: Mutex<FxHashMap<String, Arc<ImageData>>>,
    textures: Mutex<FxHashMap<String, Arc<dyn Texture>>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded image for `key`, running `loader` only on a miss.
    ///
    /// A failing loader leaves the cache untouched.
    pub fn get_or_load<F>(&self, key: &str, loader: F) -> Result<Arc<ImageData>>
    where
        F: FnOnce() -> Result<ImageData>,
    {
        let mut images = self
            .images
            .lock()
            .map_err(|_| Error::BackendError("TextureCache images lock poisoned".to_string()))?;

        if let Some(image) = images.get(key) {
            return Ok(image.clone());
        }

        let image = Arc::new(loader()?);
        crate::engine_debug!(
            "galaxy3d::TextureCache",
            "Loaded '{}' ({}x{})",
            key, image.width, image.height
        );
        images.insert(key.to_string(), image.clone());
        Ok(image)
    }

    /// Device texture for `key`, created from the cached image on a miss.
    pub fn get_or_create_device_texture<F>(
        &self,
        device: &mut dyn GraphicsDevice,
        key: &str,
        loader: F,
    ) -> Result<Arc<dyn Texture>>
    where
        F: FnOnce() -> Result<ImageData>,
    {
        let mut textures = self
            .textures
            .lock()
            .map_err(|_| Error::BackendError("TextureCache textures lock poisoned".to_string()))?;

        if let Some(texture) = textures.get(key) {
            return Ok(texture.clone());
        }

        let image = self.get_or_load(key, loader)?;
        let texture = device.create_texture(TextureDesc {
            name: key.to_string(),
            width: image.width,
            height: image.height,
            format: TextureFormat::R8G8B8A8_UNORM,
            usage: TextureUsage::Sampled,
            sample_count: SampleCount::X1,
            data: Some(image.pixels.clone()),
        })?;
        textures.insert(key.to_string(), texture.clone());
        Ok(texture)
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().map(|images| images.len()).unwrap_or(0)
    }

    pub fn device_texture_count(&self) -> usize {
        self.textures.lock().map(|textures| textures.len()).unwrap_or(0)
    }

    /// Drop every device texture; decoded images stay cached.
    pub fn destroy_device_objects(&self) {
        if let Ok(mut textures) = self.textures.lock() {
            textures.clear();
        }
    }
}

#[cfg(test)]
#[path = "texture_cache_tests.rs"]
mod tests;
