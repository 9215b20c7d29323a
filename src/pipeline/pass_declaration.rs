//! Pass declaration helper
//!
//! Every pipeline pass goes through [`declare_pass`], which applies the
//! pipeline-wide pass policy (explicit camera viewport, no renderer-list
//! culling) and hands the stage a [`PassResources`] that can only declare
//! texture accesses.

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::Viewport;
use crate::error::GraphResult;
use crate::render_graph::{
    AccessMode, PassBuilder, PassCommand, PassHandle, ProfileId, RecordingScope, TextureHandle,
    VisibilityListHandle,
};
use crate::scene::Camera;

/// Static description of a pass
#[derive(Debug, Clone, Copy)]
pub struct PassInfo {
    pub name: &'static str,
    pub profile: ProfileId,
    pub viewport: Viewport,
    pub visibility: Option<VisibilityListHandle>,
}

impl PassInfo {
    /// Pass covering the camera's pixel rect
    pub fn new(name: &'static str, profile: ProfileId, camera: &Camera) -> Self {
        Self {
            name,
            profile,
            viewport: Viewport::from_pixel_rect(camera.pixel_rect),
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, list: VisibilityListHandle) -> Self {
        self.visibility = Some(list);
        self
    }
}

/// Texture access declarations available while configuring a pass
pub struct PassResources<'b, 'a> {
    builder: &'b mut PassBuilder<'a>,
}

impl<'b, 'a> PassResources<'b, 'a> {
    pub fn read_texture(&mut self, handle: TextureHandle) -> GraphResult<TextureHandle> {
        self.builder.read_texture(handle)
    }

    /// Write `handle` as color attachment `slot`
    pub fn write_color_texture(
        &mut self,
        handle: TextureHandle,
        slot: usize,
    ) -> GraphResult<TextureHandle> {
        self.builder
            .use_color_attachment(handle, slot, AccessMode::Write)
    }

    pub fn write_depth_texture(
        &mut self,
        handle: TextureHandle,
        mode: AccessMode,
    ) -> GraphResult<TextureHandle> {
        self.builder.use_depth_attachment(handle, mode)
    }
}

/// Declare a pass in `scope`.
///
/// `configure` declares the pass's textures and returns its command. On any
/// error nothing is added to the graph.
pub fn declare_pass<B, F>(
    scope: &mut RecordingScope<B>,
    info: PassInfo,
    configure: F,
) -> GraphResult<PassHandle>
where
    B: GraphicsBackend,
    F: FnOnce(&mut PassResources) -> GraphResult<PassCommand>,
{
    scope.add_pass(info.name, info.profile, |builder| {
        builder.allow_renderer_list_culling(false);
        builder.set_viewport(info.viewport);
        if let Some(list) = info.visibility {
            builder.use_visibility_list(list)?;
        }
        configure(&mut PassResources { builder })
    })
}
