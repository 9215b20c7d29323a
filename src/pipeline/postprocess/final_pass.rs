//! Final composite into the camera target

use crate::backend::traits::*;
use crate::error::{GraphResult, RenderResult};
use crate::pipeline::pass_declaration::{declare_pass, PassInfo};
use crate::pipeline::prepass::PrepassOutput;
use crate::render_graph::{PassCommand, ProfileId, RecordingScope, TextureHandle};
use crate::scene::Camera;

/// Shader used by the final composite
pub const FINAL_PASS_SHADER: &str = "Hidden/DeferredPipeline/FinalPass";

/// Material property the composite source is bound to
pub const INPUT_TEXTURE_PROPERTY: &str = "_InputTexture";

/// Material owned by the pipeline for the final composite.
///
/// Created once with the pipeline and released by [`FinalPassMaterial::destroy`].
#[derive(Debug)]
pub struct FinalPassMaterial {
    handle: MaterialHandle,
}

impl FinalPassMaterial {
    pub fn new<B: GraphicsBackend>(backend: &mut B, shader: &str) -> RenderResult<Self> {
        let handle = backend.create_material(shader)?;
        log::debug!("{}: created final pass material from {:?}", backend.name(), shader);
        Ok(Self { handle })
    }

    pub fn handle(&self) -> MaterialHandle {
        self.handle
    }

    pub fn destroy<B: GraphicsBackend>(self, backend: &mut B) {
        backend.destroy_material(self.handle);
    }
}

/// Declare "Final Pass": sample G-buffer slot 0 onto `backbuffer`.
///
/// Slot 0 stands in for lit scene color until a lighting stage produces one.
/// Returns `backbuffer` unchanged so later stages can keep chaining.
pub fn composite<B: GraphicsBackend>(
    scope: &mut RecordingScope<B>,
    camera: &Camera,
    prepass: &PrepassOutput,
    backbuffer: TextureHandle,
    material: MaterialHandle,
) -> GraphResult<TextureHandle> {
    let source = prepass.gbuffer()[0];
    let info = PassInfo::new("Final Pass", ProfileId::FinalPost, camera);

    declare_pass(scope, info, |resources| {
        resources.read_texture(source)?;
        resources.write_color_texture(backbuffer, 0)?;
        Ok(PassCommand::FullscreenComposite {
            material,
            property: INPUT_TEXTURE_PROPERTY,
            source,
        })
    })?;

    Ok(backbuffer)
}
