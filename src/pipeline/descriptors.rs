//! Texture descriptors for the per-camera buffers

use glam::Vec4;

use crate::backend::types::*;
use crate::error::{GraphBuildError, GraphResult};
use crate::scene::Camera;

/// Pixel size of a camera's buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Fails on a zero-area size instead of clamping it
    pub fn new(width: u32, height: u32) -> GraphResult<Self> {
        let resolution = Self { width, height };
        resolution.validate()?;
        Ok(resolution)
    }

    pub fn from_camera(camera: &Camera) -> GraphResult<Self> {
        Self::new(camera.pixel_rect.width, camera.pixel_rect.height)
    }

    pub fn validate(&self) -> GraphResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GraphBuildError::InvalidResolution {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Camera depth/stencil buffer, multisampled when `msaa` asks for it
pub fn depth_buffer_desc(
    resolution: Resolution,
    clear: bool,
    msaa: MsaaSamples,
) -> GraphResult<TextureDescriptor> {
    resolution.validate()?;
    let name = if msaa.is_multisampled() {
        "CameraDepthStencilMSAA"
    } else {
        "CameraDepthStencil"
    };

    Ok(TextureDescriptor {
        name: name.to_string(),
        width: resolution.width,
        height: resolution.height,
        format: TextureFormat::Depth32Float,
        depth_bits: DepthBits::Depth32,
        msaa_samples: msaa,
        clear,
        fast_memory: FastMemoryDesc::resident(),
        ..Default::default()
    })
}

/// Single-sample target of the depth resolve
pub fn resolved_depth_desc(resolution: Resolution) -> GraphResult<TextureDescriptor> {
    let mut desc = depth_buffer_desc(resolution, false, MsaaSamples::None)?;
    desc.name = "CameraDepthStencilResolved".to_string();
    Ok(desc)
}

/// View-space normals. Random write is only possible without multisampling.
pub fn normal_buffer_desc(
    resolution: Resolution,
    clear: bool,
    msaa: MsaaSamples,
) -> GraphResult<TextureDescriptor> {
    resolution.validate()?;
    let name = if msaa.is_multisampled() {
        "NormalBufferMSAA"
    } else {
        "NormalBuffer"
    };

    Ok(TextureDescriptor {
        name: name.to_string(),
        width: resolution.width,
        height: resolution.height,
        format: TextureFormat::Rgba8Unorm,
        msaa_samples: msaa,
        clear,
        clear_color: Vec4::ZERO,
        enable_random_write: !msaa.is_multisampled(),
        fast_memory: FastMemoryDesc::resident(),
        fallback_to_black: true,
        ..Default::default()
    })
}

/// G-buffer color target `index`; never multisampled
pub fn gbuffer_color_desc(resolution: Resolution, index: usize) -> GraphResult<TextureDescriptor> {
    resolution.validate()?;
    Ok(TextureDescriptor {
        name: format!("GBuffer{}", index),
        width: resolution.width,
        height: resolution.height,
        format: TextureFormat::Rgba8UnormSrgb,
        clear: true,
        clear_color: Vec4::ZERO,
        enable_random_write: true,
        fast_memory: FastMemoryDesc::resident(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::PixelRect;

    #[test]
    fn test_zero_resolution_is_rejected() {
        assert_eq!(
            Resolution::new(0, 720),
            Err(GraphBuildError::InvalidResolution {
                width: 0,
                height: 720
            })
        );
        let camera = Camera::new("Empty", PixelRect::sized(1280, 0));
        assert!(Resolution::from_camera(&camera).is_err());

        let unchecked = Resolution {
            width: 0,
            height: 0,
        };
        assert!(depth_buffer_desc(unchecked, true, MsaaSamples::None).is_err());
        assert!(normal_buffer_desc(unchecked, true, MsaaSamples::None).is_err());
        assert!(gbuffer_color_desc(unchecked, 0).is_err());
        assert!(resolved_depth_desc(unchecked).is_err());
    }

    #[test]
    fn test_depth_buffer_desc() {
        let resolution = Resolution::new(1920, 1080).unwrap();
        let desc = depth_buffer_desc(resolution, true, MsaaSamples::None).unwrap();
        assert_eq!(desc.name, "CameraDepthStencil");
        assert_eq!(desc.format, TextureFormat::Depth32Float);
        assert_eq!(desc.depth_bits, DepthBits::Depth32);
        assert_eq!((desc.width, desc.height), (1920, 1080));
        assert!(desc.clear);
        assert_eq!(desc.fast_memory.residency_fraction, 1.0);
        assert!(desc.fast_memory.flags.contains(FastMemoryFlags::SPILL_TOP));

        let msaa = depth_buffer_desc(resolution, true, MsaaSamples::X4).unwrap();
        assert_eq!(msaa.name, "CameraDepthStencilMSAA");
        assert_eq!(msaa.msaa_samples, MsaaSamples::X4);
    }

    #[test]
    fn test_resolved_depth_is_single_sample() {
        let desc = resolved_depth_desc(Resolution::new(640, 480).unwrap()).unwrap();
        assert_eq!(desc.name, "CameraDepthStencilResolved");
        assert_eq!(desc.msaa_samples, MsaaSamples::None);
        assert!(!desc.clear);
    }

    #[test]
    fn test_normal_buffer_random_write_depends_on_msaa() {
        let resolution = Resolution::new(800, 600).unwrap();
        let single = normal_buffer_desc(resolution, true, MsaaSamples::None).unwrap();
        assert_eq!(single.name, "NormalBuffer");
        assert!(single.enable_random_write);
        assert!(single.fallback_to_black);
        assert_eq!(single.clear_color, Vec4::ZERO);

        let msaa = normal_buffer_desc(resolution, true, MsaaSamples::X2).unwrap();
        assert_eq!(msaa.name, "NormalBufferMSAA");
        assert!(!msaa.enable_random_write);
    }

    #[test]
    fn test_descriptors_are_deterministic() {
        let resolution = Resolution::new(256, 256).unwrap();
        assert_eq!(
            gbuffer_color_desc(resolution, 3),
            gbuffer_color_desc(resolution, 3)
        );
        let desc = gbuffer_color_desc(resolution, 3).unwrap();
        assert_eq!(desc.name, "GBuffer3");
        assert_eq!(desc.format, TextureFormat::Rgba8UnormSrgb);
        assert_eq!(desc.msaa_samples, MsaaSamples::None);
        assert!(desc.enable_random_write);
    }
}
