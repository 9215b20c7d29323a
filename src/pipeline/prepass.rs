//! Prepass stage: depth prepass, optional MSAA depth resolve and G-buffer
//!
//! The stage threads a [`PrepassAccumulator`] through its steps. The stage
//! marker in its type decides which step may run next, so a G-buffer pass can
//! only be declared after the depth resolve and the result can only be sealed
//! once. The sealed [`PrepassOutput`] is read-only and lives for one camera.

use std::ops::Index;

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::MsaaSamples;
use crate::error::{GraphBuildError, GraphResult, RenderResult};
use crate::pipeline::descriptors::*;
use crate::pipeline::pass_declaration::{declare_pass, PassInfo};
use crate::render_graph::{
    AccessMode, PassCommand, ProfileId, RecordingScope, TextureHandle, MAX_MRT_COUNT,
};
use crate::scene::{Camera, ShaderTag, VisibilityListDesc};

/// G-buffer color targets in attachment slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBufferOutput {
    mrt: [TextureHandle; MAX_MRT_COUNT],
    count: usize,
}

impl GBufferOutput {
    pub fn new() -> Self {
        Self {
            mrt: [TextureHandle::NULL; MAX_MRT_COUNT],
            count: 0,
        }
    }

    /// Append the next slot's target
    pub fn push(&mut self, handle: TextureHandle) -> GraphResult<()> {
        if self.count >= MAX_MRT_COUNT {
            return Err(GraphBuildError::MrtOverflow {
                capacity: MAX_MRT_COUNT,
            });
        }
        self.mrt[self.count] = handle;
        self.count += 1;
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<TextureHandle> {
        self.as_slice().get(slot).copied()
    }

    pub fn as_slice(&self) -> &[TextureHandle] {
        &self.mrt[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for GBufferOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for GBufferOutput {
    type Output = TextureHandle;

    fn index(&self, slot: usize) -> &TextureHandle {
        &self.as_slice()[slot]
    }
}

/// Everything later stages need from the prepass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepassOutput {
    depth_buffer: TextureHandle,
    resolved_depth_buffer: TextureHandle,
    stencil_buffer: TextureHandle,
    normal_buffer: TextureHandle,
    gbuffer: GBufferOutput,
}

impl PrepassOutput {
    /// Depth as rendered; multisampled on MSAA cameras
    pub fn depth_buffer(&self) -> TextureHandle {
        self.depth_buffer
    }

    /// Single-sample depth; the same handle as `depth_buffer` without MSAA
    pub fn resolved_depth_buffer(&self) -> TextureHandle {
        self.resolved_depth_buffer
    }

    /// Shares the depth texture
    pub fn stencil_buffer(&self) -> TextureHandle {
        self.stencil_buffer
    }

    pub fn normal_buffer(&self) -> TextureHandle {
        self.normal_buffer
    }

    pub fn gbuffer(&self) -> &GBufferOutput {
        &self.gbuffer
    }
}

/// Prepass stage markers
pub mod stage {
    use crate::render_graph::TextureHandle;

    /// Depth buffer created, nothing declared yet
    #[derive(Debug)]
    pub struct Init;

    /// Depth prepass declared
    #[derive(Debug)]
    pub struct DepthWritten;

    /// Single-sample depth available
    #[derive(Debug)]
    pub struct Resolved {
        pub(super) resolved_depth_buffer: TextureHandle,
    }
}

/// Intermediate prepass state, see the module docs
#[derive(Debug)]
pub struct PrepassAccumulator<S> {
    resolution: Resolution,
    msaa: MsaaSamples,
    depth_buffer: TextureHandle,
    stage: S,
}

impl PrepassAccumulator<stage::Init> {
    /// Create the camera depth buffer. It is multisampled with `msaa` only if
    /// the camera allows MSAA.
    pub fn init<B: GraphicsBackend>(
        scope: &mut RecordingScope<B>,
        camera: &Camera,
        msaa: MsaaSamples,
    ) -> RenderResult<Self> {
        let resolution = Resolution::from_camera(camera)?;
        let msaa = if camera.allow_msaa {
            msaa
        } else {
            MsaaSamples::None
        };
        let depth_buffer = scope.create_texture(&depth_buffer_desc(resolution, true, msaa)?)?;

        Ok(Self {
            resolution,
            msaa,
            depth_buffer,
            stage: stage::Init,
        })
    }

    /// Declare "Depth Prepass": opaque depth-only draw into the depth buffer
    pub fn depth_prepass<B: GraphicsBackend>(
        self,
        scope: &mut RecordingScope<B>,
        camera: &Camera,
    ) -> RenderResult<PrepassAccumulator<stage::DepthWritten>> {
        let list = scope.create_visibility_list(VisibilityListDesc::opaque(ShaderTag::DEPTH_ONLY));
        let depth = self.depth_buffer;
        let info =
            PassInfo::new("Depth Prepass", ProfileId::DepthPrepass, camera).with_visibility(list);

        declare_pass(scope, info, |resources| {
            resources.write_depth_texture(depth, AccessMode::ReadWrite)?;
            Ok(PassCommand::DrawVisibilityList { list })
        })?;

        Ok(PrepassAccumulator {
            resolution: self.resolution,
            msaa: self.msaa,
            depth_buffer: self.depth_buffer,
            stage: stage::DepthWritten,
        })
    }
}

impl PrepassAccumulator<stage::DepthWritten> {
    /// Produce a single-sample depth buffer. Without MSAA this is the depth
    /// buffer itself; with MSAA a "Resolve Depth" pass is declared.
    pub fn resolve<B: GraphicsBackend>(
        self,
        scope: &mut RecordingScope<B>,
        camera: &Camera,
    ) -> RenderResult<PrepassAccumulator<stage::Resolved>> {
        let resolved_depth_buffer = if self.msaa.is_multisampled() {
            let resolved = scope.create_texture(&resolved_depth_desc(self.resolution)?)?;
            if let Some(desc) = scope.descriptor(resolved) {
                if desc.msaa_samples.is_multisampled() {
                    return Err(GraphBuildError::UnresolvedMultisample {
                        texture: desc.name.clone(),
                        samples: desc.msaa_samples.count(),
                    }
                    .into());
                }
            }

            let source = self.depth_buffer;
            let info = PassInfo::new("Resolve Depth", ProfileId::ResolveDepth, camera);
            declare_pass(scope, info, |resources| {
                resources.read_texture(source)?;
                resources.write_depth_texture(resolved, AccessMode::Write)?;
                Ok(PassCommand::ResolveDepth {
                    source,
                    destination: resolved,
                })
            })?;
            resolved
        } else {
            self.depth_buffer
        };

        Ok(PrepassAccumulator {
            resolution: self.resolution,
            msaa: self.msaa,
            depth_buffer: self.depth_buffer,
            stage: stage::Resolved {
                resolved_depth_buffer,
            },
        })
    }
}

impl PrepassAccumulator<stage::Resolved> {
    /// Declare "GBuffer" writing `GBuffer0` and the normal buffer against the
    /// resolved depth, then seal the output
    pub fn gbuffer<B: GraphicsBackend>(
        self,
        scope: &mut RecordingScope<B>,
        camera: &Camera,
    ) -> RenderResult<PrepassOutput> {
        let depth = self.stage.resolved_depth_buffer;
        let albedo = scope.create_texture(&gbuffer_color_desc(self.resolution, 0)?)?;
        let normals = scope.create_texture(&normal_buffer_desc(
            self.resolution,
            true,
            MsaaSamples::None,
        )?)?;

        let mut gbuffer = GBufferOutput::new();
        gbuffer.push(albedo)?;
        gbuffer.push(normals)?;

        let list = scope.create_visibility_list(VisibilityListDesc::opaque(ShaderTag::GBUFFER));
        let info = PassInfo::new("GBuffer", ProfileId::GBuffer, camera).with_visibility(list);
        declare_pass(scope, info, |resources| {
            resources.write_depth_texture(depth, AccessMode::ReadWrite)?;
            for (slot, &target) in gbuffer.as_slice().iter().enumerate() {
                resources.write_color_texture(target, slot)?;
            }
            Ok(PassCommand::DrawVisibilityList { list })
        })?;

        Ok(PrepassOutput {
            depth_buffer: self.depth_buffer,
            resolved_depth_buffer: depth,
            stencil_buffer: self.depth_buffer,
            normal_buffer: normals,
            gbuffer,
        })
    }
}

/// Run the whole prepass stage for one camera
pub fn render_prepass<B: GraphicsBackend>(
    scope: &mut RecordingScope<B>,
    camera: &Camera,
    msaa: MsaaSamples,
) -> RenderResult<PrepassOutput> {
    PrepassAccumulator::<stage::Init>::init(scope, camera, msaa)?
        .depth_prepass(scope, camera)?
        .resolve(scope, camera)?
        .gbuffer(scope, camera)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::TextureDescriptor;
    use crate::render_graph::{ResourceRegistry, TextureOrigin};

    fn handles(count: usize) -> Vec<TextureHandle> {
        let mut registry = ResourceRegistry::new(1);
        (0..count)
            .map(|_| registry.create(TextureDescriptor::default(), TextureOrigin::Transient))
            .collect()
    }

    #[test]
    fn test_gbuffer_output_push() {
        let handles = handles(2);
        let mut gbuffer = GBufferOutput::new();
        assert!(gbuffer.is_empty());
        gbuffer.push(handles[0]).unwrap();
        gbuffer.push(handles[1]).unwrap();
        assert_eq!(gbuffer.len(), 2);
        assert_eq!(gbuffer.as_slice(), &handles[..]);
        assert_eq!(gbuffer[0], handles[0]);
        assert_eq!(gbuffer.get(2), None);
    }

    #[test]
    fn test_gbuffer_output_overflow() {
        let handles = handles(MAX_MRT_COUNT + 1);
        let mut gbuffer = GBufferOutput::new();
        for &handle in &handles[..MAX_MRT_COUNT] {
            gbuffer.push(handle).unwrap();
        }
        assert_eq!(
            gbuffer.push(handles[MAX_MRT_COUNT]),
            Err(GraphBuildError::MrtOverflow {
                capacity: MAX_MRT_COUNT
            })
        );
        assert_eq!(gbuffer.len(), MAX_MRT_COUNT);
    }
}
