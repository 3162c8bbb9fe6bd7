/// Texture trait and texture descriptor

/// Texture formats used by the scene pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
}

/// Texture usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUsage {
    /// Texture can be sampled in shaders
    Sampled,
    /// Texture can be used as color render target
    RenderTarget,
    /// Texture can be used for both
    SampledAndRenderTarget,
    /// Texture can be used as depth/stencil attachment
    DepthStencil,
}

/// MSAA sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleCount {
    X1 = 1,
    X2 = 2,
    X4 = 4,
    X8 = 8,
    X16 = 16,
    X32 = 32,
}

impl SampleCount {
    /// All counts, lowest first
    pub const ALL: [SampleCount; 6] = [
        SampleCount::X1, SampleCount::X2, SampleCount::X4,
        SampleCount::X8, SampleCount::X16, SampleCount::X32,
    ];

    /// Number of samples per pixel
    pub fn samples(self) -> u32 {
        self as u32
    }

    /// Map a menu index (0 = off, 1 = 2x, ... 5 = 32x) to a sample count
    pub fn from_option_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Highest count not above `max`
    pub fn clamped_to(self, max: SampleCount) -> SampleCount {
        self.min(max)
    }
}

/// Descriptor for creating a 2D texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name shown in capture tools
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub sample_count: SampleCount,
    /// Initial pixel data, if any
    pub data: Option<Vec<u8>>,
}

/// Texture resource trait
pub trait Texture: Send + Sync {
    /// Get the texture descriptor it was created with (without pixel data)
    fn info(&self) -> &TextureInfo;
}

/// Immutable description of a created texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub sample_count: SampleCount,
}

impl From<&TextureDesc> for TextureInfo {
    fn from(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            sample_count: desc.sample_count,
        }
    }
}
