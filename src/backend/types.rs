//! Common types shared between the render graph and backends

use bitflags::bitflags;
use glam::Vec4;

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }
}

/// Depth buffer precision requested by a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthBits {
    #[default]
    None,
    Depth16,
    Depth24,
    Depth32,
}

impl DepthBits {
    pub fn bits(&self) -> u32 {
        match self {
            DepthBits::None => 0,
            DepthBits::Depth16 => 16,
            DepthBits::Depth24 => 24,
            DepthBits::Depth32 => 32,
        }
    }
}

/// Multisample sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MsaaSamples {
    /// Single sample, no multisampling
    #[default]
    None,
    X2,
    X4,
    X8,
}

impl MsaaSamples {
    /// Number of samples per pixel (1 when multisampling is off)
    pub fn count(&self) -> u32 {
        match self {
            MsaaSamples::None => 1,
            MsaaSamples::X2 => 2,
            MsaaSamples::X4 => 4,
            MsaaSamples::X8 => 8,
        }
    }

    /// Map a raw sample count to the enum. 0 and 1 both mean "no multisampling".
    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            0 | 1 => Some(MsaaSamples::None),
            2 => Some(MsaaSamples::X2),
            4 => Some(MsaaSamples::X4),
            8 => Some(MsaaSamples::X8),
            _ => None,
        }
    }

    pub fn is_multisampled(&self) -> bool {
        *self != MsaaSamples::None
    }
}

bitflags! {
    /// What a backend should evict first when fast memory runs out
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FastMemoryFlags: u32 {
        /// Spill the least recently needed part of the resource first
        const SPILL_TOP = 1 << 0;
        /// Spill the most recently needed part of the resource first
        const SPILL_BOTTOM = 1 << 1;
    }
}

/// Residency hint for on-chip / fast memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastMemoryDesc {
    pub in_fast_memory: bool,
    /// Fraction of the resource that should stay resident, in `[0, 1]`
    pub residency_fraction: f32,
    pub flags: FastMemoryFlags,
}

impl FastMemoryDesc {
    /// Fully resident, spilling the least recently needed data first.
    pub fn resident() -> Self {
        Self {
            in_fast_memory: true,
            residency_fraction: 1.0,
            flags: FastMemoryFlags::SPILL_TOP,
        }
    }
}

impl Default for FastMemoryDesc {
    fn default() -> Self {
        Self {
            in_fast_memory: false,
            residency_fraction: 0.0,
            flags: FastMemoryFlags::empty(),
        }
    }
}

/// Declarative description of a logical texture in the render graph.
///
/// Physical allocation is deferred to the execution engine; the descriptor is
/// copied into the graph's registry when a handle is created, so later edits to
/// the caller's value have no effect.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Diagnostic name only
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub depth_bits: DepthBits,
    pub msaa_samples: MsaaSamples,
    /// Clear the texture on its first use within a graph execution
    pub clear: bool,
    pub clear_color: Vec4,
    /// Allow unordered (storage) writes
    pub enable_random_write: bool,
    pub fast_memory: FastMemoryDesc,
    /// Substitute a black texture instead of failing when the backend cannot
    /// provide this one
    pub fallback_to_black: bool,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            depth_bits: DepthBits::None,
            msaa_samples: MsaaSamples::None,
            clear: false,
            clear_color: Vec4::ZERO,
            enable_random_write: false,
            fast_memory: FastMemoryDesc::default(),
            fallback_to_black: false,
        }
    }
}

impl TextureDescriptor {
    pub fn is_depth(&self) -> bool {
        self.format.is_depth() || self.depth_bits != DepthBits::None
    }

    /// The fields that decide whether two descriptors can share one physical
    /// texture.
    pub fn allocation_key(&self) -> TextureKey {
        TextureKey {
            width: self.width,
            height: self.height,
            format: self.format,
            depth_bits: self.depth_bits,
            msaa_samples: self.msaa_samples,
            enable_random_write: self.enable_random_write,
        }
    }

    /// Approximate size in bytes of the physical allocation
    pub fn byte_size(&self) -> u64 {
        self.width as u64
            * self.height as u64
            * self.format.bytes_per_pixel() as u64
            * self.msaa_samples.count() as u64
    }
}

/// Pooling key for physical textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub depth_bits: DepthBits,
    pub msaa_samples: MsaaSamples,
    pub enable_random_write: bool,
}

/// GPU viewport rectangle in pixels
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
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Value written when a render target is cleared
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color(Vec4),
    Depth(f32),
}

/// An externally owned presentable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRef {
    /// Whatever the current camera renders to (window backbuffer by default)
    CameraTarget,
    /// A render texture owned by the host, identified by its id
    Texture(u64),
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msaa_from_count() {
        assert_eq!(MsaaSamples::from_count(0), Some(MsaaSamples::None));
        assert_eq!(MsaaSamples::from_count(1), Some(MsaaSamples::None));
        assert_eq!(MsaaSamples::from_count(4), Some(MsaaSamples::X4));
        assert_eq!(MsaaSamples::from_count(3), None);
        assert_eq!(MsaaSamples::X8.count(), 8);
    }

    #[test]
    fn test_allocation_key_ignores_name_and_clear() {
        let a = TextureDescriptor {
            name: "A".into(),
            width: 64,
            height: 32,
            clear: true,
            ..Default::default()
        };
        let b = TextureDescriptor {
            name: "B".into(),
            clear_color: Vec4::ONE,
            ..a.clone()
        };
        assert_ne!(a, b);
        assert_eq!(a.allocation_key(), b.allocation_key());
    }

    #[test]
    fn test_depth_detection() {
        let depth = TextureDescriptor {
            format: TextureFormat::Depth32Float,
            depth_bits: DepthBits::Depth32,
            ..Default::default()
        };
        assert!(depth.is_depth());
        assert!(!TextureDescriptor::default().is_depth());
        assert_eq!(DepthBits::Depth32.bits(), 32);
    }

    #[test]
    fn test_byte_size_counts_samples() {
        let desc = TextureDescriptor {
            width: 4,
            height: 4,
            msaa_samples: MsaaSamples::X4,
            ..Default::default()
        };
        assert_eq!(desc.byte_size(), 4 * 4 * 4 * 4);
    }
}
