//! Render pass definitions for the render graph

use std::collections::HashSet;

use crate::backend::traits::MaterialHandle;
use crate::backend::types::*;
use crate::error::{GraphBuildError, GraphResult};
use crate::render_graph::resource::*;

/// Maximum number of simultaneously bound color attachments
pub const MAX_MRT_COUNT: usize = 8;

/// Unique identifier for a render pass within its recording scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassHandle(pub(crate) u32);

impl PassHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Profiling sample wrapped around recorded work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileId {
    RecordRenderGraph,
    DepthPrepass,
    ResolveDepth,
    GBuffer,
    FinalPost,
}

impl ProfileId {
    pub fn name(&self) -> &'static str {
        match self {
            ProfileId::RecordRenderGraph => "Record Render Graph",
            ProfileId::DepthPrepass => "Depth Prepass",
            ProfileId::ResolveDepth => "Resolve Depth",
            ProfileId::GBuffer => "GBuffer",
            ProfileId::FinalPost => "Final Post",
        }
    }
}

/// How a pass touches a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn is_read(&self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/// What a texture is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessUsage {
    /// Sampled or resolved from, not bound as an attachment
    Sampled,
    ColorAttachment(usize),
    DepthAttachment,
}

impl AccessUsage {
    pub fn is_attachment(&self) -> bool {
        matches!(
            self,
            AccessUsage::ColorAttachment(_) | AccessUsage::DepthAttachment
        )
    }
}

/// Resource access declaration for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureAccess {
    pub handle: TextureHandle,
    pub mode: AccessMode,
    pub usage: AccessUsage,
}

/// Work a pass performs when it executes.
///
/// Commands only carry handles the pass declared plus small values; the
/// executor turns them into command buffer calls in one place.
#[derive(Debug, Clone, PartialEq)]
pub enum PassCommand {
    /// Draw a culled, filtered renderer list into the bound attachments
    DrawVisibilityList { list: VisibilityListHandle },
    /// Resolve a multisampled depth texture into a single-sample one
    ResolveDepth {
        source: TextureHandle,
        destination: TextureHandle,
    },
    /// Full-screen triangle sampling `source`, bound to the material
    /// texture property `property`
    FullscreenComposite {
        material: MaterialHandle,
        property: &'static str,
        source: TextureHandle,
    },
}

impl PassCommand {
    /// Textures the command refers to
    pub fn textures(&self) -> Vec<TextureHandle> {
        match self {
            PassCommand::DrawVisibilityList { .. } => Vec::new(),
            PassCommand::ResolveDepth {
                source,
                destination,
            } => vec![*source, *destination],
            PassCommand::FullscreenComposite { source, .. } => vec![*source],
        }
    }

    pub fn visibility_list(&self) -> Option<VisibilityListHandle> {
        match self {
            PassCommand::DrawVisibilityList { list } => Some(*list),
            _ => None,
        }
    }
}

/// Metadata about a pass in the graph
#[derive(Debug, Clone)]
pub struct PassNode {
    pub id: PassHandle,
    pub name: String,
    pub profile: ProfileId,
    pub accesses: Vec<TextureAccess>,
    pub visibility: Option<VisibilityListHandle>,
    pub viewport: Option<Viewport>,
    pub allow_renderer_list_culling: bool,
    pub command: PassCommand,
}

impl PassNode {
    pub fn reads_resource(&self, resource: TextureHandle) -> bool {
        self.accesses
            .iter()
            .any(|a| a.handle == resource && a.mode.is_read())
    }

    pub fn writes_resource(&self, resource: TextureHandle) -> bool {
        self.accesses
            .iter()
            .any(|a| a.handle == resource && a.mode.is_write())
    }

    /// Color attachments ordered by slot
    pub fn color_attachments(&self) -> Vec<TextureHandle> {
        let mut colors: Vec<(usize, TextureHandle)> = self
            .accesses
            .iter()
            .filter_map(|a| match a.usage {
                AccessUsage::ColorAttachment(slot) => Some((slot, a.handle)),
                _ => None,
            })
            .collect();
        colors.sort_by_key(|(slot, _)| *slot);
        colors.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn depth_attachment(&self) -> Option<TextureAccess> {
        self.accesses
            .iter()
            .find(|a| a.usage == AccessUsage::DepthAttachment)
            .copied()
    }
}

/// Stages one pass's declarations.
///
/// Nothing reaches the graph until the owning scope commits the builder, so a
/// failed declaration leaves no trace.
pub struct PassBuilder<'a> {
    name: &'a str,
    registry: &'a ResourceRegistry,
    written: &'a HashSet<TextureHandle>,
    visibility_list_count: usize,
    accesses: Vec<TextureAccess>,
    viewport: Option<Viewport>,
    visibility: Option<VisibilityListHandle>,
    allow_renderer_list_culling: bool,
}

impl<'a> PassBuilder<'a> {
    pub(crate) fn new(
        name: &'a str,
        registry: &'a ResourceRegistry,
        written: &'a HashSet<TextureHandle>,
        visibility_list_count: usize,
    ) -> Self {
        Self {
            name,
            registry,
            written,
            visibility_list_count,
            accesses: Vec::new(),
            viewport: None,
            visibility: None,
            allow_renderer_list_culling: true,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Sample a texture written by an earlier pass
    pub fn read_texture(&mut self, handle: TextureHandle) -> GraphResult<TextureHandle> {
        let texture = self.lookup(handle)?;
        self.check_initialized(texture, AccessMode::Read)?;
        self.accesses.push(TextureAccess {
            handle,
            mode: AccessMode::Read,
            usage: AccessUsage::Sampled,
        });
        Ok(handle)
    }

    /// Bind a color texture to attachment `slot`
    pub fn use_color_attachment(
        &mut self,
        handle: TextureHandle,
        slot: usize,
        mode: AccessMode,
    ) -> GraphResult<TextureHandle> {
        let texture = self.lookup(handle)?;
        if texture.kind != TextureKind::Color {
            return Err(GraphBuildError::AttachmentKindMismatch {
                pass: self.name.to_string(),
                texture: texture.name().to_string(),
                expected: TextureKind::Color,
            });
        }
        if slot >= MAX_MRT_COUNT {
            return Err(GraphBuildError::ColorSlotOutOfRange {
                pass: self.name.to_string(),
                slot,
                max: MAX_MRT_COUNT,
            });
        }
        if self
            .accesses
            .iter()
            .any(|a| a.usage == AccessUsage::ColorAttachment(slot))
        {
            return Err(GraphBuildError::DuplicateColorSlot {
                pass: self.name.to_string(),
                slot,
            });
        }
        self.check_sample_count(texture)?;
        self.check_initialized(texture, mode)?;

        self.accesses.push(TextureAccess {
            handle,
            mode,
            usage: AccessUsage::ColorAttachment(slot),
        });
        Ok(handle)
    }

    /// Bind a depth texture as the depth attachment
    pub fn use_depth_attachment(
        &mut self,
        handle: TextureHandle,
        mode: AccessMode,
    ) -> GraphResult<TextureHandle> {
        let texture = self.lookup(handle)?;
        if texture.kind != TextureKind::Depth {
            return Err(GraphBuildError::AttachmentKindMismatch {
                pass: self.name.to_string(),
                texture: texture.name().to_string(),
                expected: TextureKind::Depth,
            });
        }
        if self
            .accesses
            .iter()
            .any(|a| a.usage == AccessUsage::DepthAttachment)
        {
            return Err(GraphBuildError::DuplicateDepthAttachment {
                pass: self.name.to_string(),
            });
        }
        self.check_sample_count(texture)?;
        self.check_initialized(texture, mode)?;

        self.accesses.push(TextureAccess {
            handle,
            mode,
            usage: AccessUsage::DepthAttachment,
        });
        Ok(handle)
    }

    /// Draw list the pass renders; must come from the same scope
    pub fn use_visibility_list(&mut self, list: VisibilityListHandle) -> GraphResult<()> {
        if list.scope != self.registry.scope() || list.index as usize >= self.visibility_list_count
        {
            return Err(GraphBuildError::InvalidVisibilityList {
                pass: self.name.to_string(),
            });
        }
        self.visibility = Some(list);
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    /// Whether the engine may skip the pass when its renderer list is empty
    pub fn allow_renderer_list_culling(&mut self, allow: bool) {
        self.allow_renderer_list_culling = allow;
    }

    /// Validate the command against the declarations and produce the node
    pub(crate) fn build(
        mut self,
        id: PassHandle,
        profile: ProfileId,
        command: PassCommand,
    ) -> GraphResult<PassNode> {
        for handle in command.textures() {
            if !self.accesses.iter().any(|a| a.handle == handle) {
                return Err(GraphBuildError::InvalidHandle {
                    pass: self.name.to_string(),
                    handle,
                });
            }
        }

        // Drawing a list implies using it
        if let Some(list) = command.visibility_list() {
            if self.visibility.is_some_and(|declared| declared != list) {
                return Err(GraphBuildError::InvalidVisibilityList {
                    pass: self.name.to_string(),
                });
            }
            self.use_visibility_list(list)?;
        }

        Ok(PassNode {
            id,
            name: self.name.to_string(),
            profile,
            accesses: self.accesses,
            visibility: self.visibility,
            viewport: self.viewport,
            allow_renderer_list_culling: self.allow_renderer_list_culling,
            command,
        })
    }

    fn lookup(&self, handle: TextureHandle) -> GraphResult<&'a VirtualTexture> {
        self.registry
            .get(handle)
            .ok_or_else(|| GraphBuildError::InvalidHandle {
                pass: self.name.to_string(),
                handle,
            })
    }

    /// Reads need a producer: an earlier write, an import, or a clear on first
    /// use for read-write attachments
    fn check_initialized(&self, texture: &VirtualTexture, mode: AccessMode) -> GraphResult<()> {
        if !mode.is_read() || texture.is_imported() || self.written.contains(&texture.handle) {
            return Ok(());
        }
        if mode == AccessMode::ReadWrite && texture.desc.clear {
            return Ok(());
        }
        Err(GraphBuildError::ReadBeforeWrite {
            pass: self.name.to_string(),
            texture: texture.name().to_string(),
        })
    }

    fn check_sample_count(&self, texture: &VirtualTexture) -> GraphResult<()> {
        let samples = texture.desc.msaa_samples.count();
        for access in self.accesses.iter().filter(|a| a.usage.is_attachment()) {
            if let Some(bound) = self.registry.get(access.handle) {
                let expected = bound.desc.msaa_samples.count();
                if expected != samples {
                    return Err(GraphBuildError::SampleCountMismatch {
                        pass: self.name.to_string(),
                        texture: texture.name().to_string(),
                        expected,
                        found: samples,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(name: &str, format: TextureFormat, msaa: MsaaSamples, clear: bool) -> TextureDescriptor {
        TextureDescriptor {
            name: name.into(),
            width: 16,
            height: 16,
            format,
            depth_bits: if format.is_depth() {
                DepthBits::Depth32
            } else {
                DepthBits::None
            },
            msaa_samples: msaa,
            clear,
            ..Default::default()
        }
    }

    struct Fixture {
        registry: ResourceRegistry,
        written: HashSet<TextureHandle>,
        color: TextureHandle,
        depth: TextureHandle,
        msaa_color: TextureHandle,
    }

    fn fixture() -> Fixture {
        let mut registry = ResourceRegistry::new(7);
        let color = registry.create(
            desc("Color", TextureFormat::Rgba8Unorm, MsaaSamples::None, true),
            TextureOrigin::Transient,
        );
        let depth = registry.create(
            desc("Depth", TextureFormat::Depth32Float, MsaaSamples::None, true),
            TextureOrigin::Transient,
        );
        let msaa_color = registry.create(
            desc("ColorMSAA", TextureFormat::Rgba8Unorm, MsaaSamples::X4, true),
            TextureOrigin::Transient,
        );
        Fixture {
            registry,
            written: HashSet::new(),
            color,
            depth,
            msaa_color,
        }
    }

    #[test]
    fn test_kind_mismatch() {
        let f = fixture();
        let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
        assert!(matches!(
            builder.use_color_attachment(f.depth, 0, AccessMode::Write),
            Err(GraphBuildError::AttachmentKindMismatch {
                expected: TextureKind::Color,
                ..
            })
        ));
        assert!(matches!(
            builder.use_depth_attachment(f.color, AccessMode::Write),
            Err(GraphBuildError::AttachmentKindMismatch {
                expected: TextureKind::Depth,
                ..
            })
        ));
    }

    #[test]
    fn test_color_slot_rules() {
        let f = fixture();
        let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
        assert!(matches!(
            builder.use_color_attachment(f.color, MAX_MRT_COUNT, AccessMode::Write),
            Err(GraphBuildError::ColorSlotOutOfRange { slot: 8, .. })
        ));
        builder
            .use_color_attachment(f.color, 0, AccessMode::Write)
            .unwrap();
        assert!(matches!(
            builder.use_color_attachment(f.color, 0, AccessMode::Write),
            Err(GraphBuildError::DuplicateColorSlot { slot: 0, .. })
        ));
    }

    #[test]
    fn test_second_depth_attachment() {
        let f = fixture();
        let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
        builder
            .use_depth_attachment(f.depth, AccessMode::Write)
            .unwrap();
        assert!(matches!(
            builder.use_depth_attachment(f.depth, AccessMode::Write),
            Err(GraphBuildError::DuplicateDepthAttachment { .. })
        ));
    }

    #[test]
    fn test_sample_count_mismatch() {
        let f = fixture();
        let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
        builder
            .use_depth_attachment(f.depth, AccessMode::Write)
            .unwrap();
        assert!(matches!(
            builder.use_color_attachment(f.msaa_color, 0, AccessMode::Write),
            Err(GraphBuildError::SampleCountMismatch {
                expected: 1,
                found: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_read_before_write() {
        let mut f = fixture();
        {
            let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
            assert!(matches!(
                builder.read_texture(f.color),
                Err(GraphBuildError::ReadBeforeWrite { .. })
            ));
            // Clear on first use gives read-write attachments their initial content
            builder
                .use_depth_attachment(f.depth, AccessMode::ReadWrite)
                .unwrap();
        }

        f.written.insert(f.color);
        let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
        assert_eq!(builder.read_texture(f.color), Ok(f.color));
    }

    #[test]
    fn test_command_must_use_declared_textures() {
        let f = fixture();
        let builder = PassBuilder::new("Test", &f.registry, &f.written, 0);
        let result = builder.build(
            PassHandle(0),
            ProfileId::FinalPost,
            PassCommand::FullscreenComposite {
                material: MaterialHandle(1),
                property: "_InputTexture",
                source: f.color,
            },
        );
        assert!(matches!(result, Err(GraphBuildError::InvalidHandle { .. })));
    }

    #[test]
    fn test_draw_pass_node() {
        let mut f = fixture();
        let normals = f.registry.create(
            desc("Normals", TextureFormat::Rgba8Unorm, MsaaSamples::None, true),
            TextureOrigin::Transient,
        );
        let mut builder = PassBuilder::new("Test", &f.registry, &f.written, 1);
        builder
            .use_depth_attachment(f.depth, AccessMode::ReadWrite)
            .unwrap();
        builder
            .use_color_attachment(normals, 1, AccessMode::Write)
            .unwrap();
        builder
            .use_color_attachment(f.color, 0, AccessMode::Write)
            .unwrap();
        let list = VisibilityListHandle { scope: 7, index: 0 };
        let node = builder
            .build(
                PassHandle(0),
                ProfileId::GBuffer,
                PassCommand::DrawVisibilityList { list },
            )
            .unwrap();
        assert_eq!(node.color_attachments(), vec![f.color, normals]);
        assert_eq!(node.visibility, Some(list));
        assert!(node.writes_resource(f.depth));
        assert!(node.reads_resource(f.depth));
        assert!(!node.reads_resource(normals));
    }
}
