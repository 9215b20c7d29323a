//! Dummy GPU backend for testing and development.
//!
//! Nothing here touches a GPU. The backend hands out ids and remembers which
//! textures and materials are alive, the command buffer stores every command
//! it is given, and the render context keeps a copy of each executed buffer so
//! tests can inspect exactly what a frame would have drawn.

use std::collections::{HashMap, HashSet};

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::scene::{
    Camera, CameraUniformData, CullingResults, ShaderTag, VisibilityList, VisibleRenderer,
};

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: u64,
    textures: HashMap<GpuTexture, TextureDescriptor>,
    materials: HashMap<MaterialHandle, String>,
    surfaces: HashMap<SurfaceRef, GpuTexture>,
    unsupported_formats: HashSet<TextureFormat>,
    unsupported_names: HashSet<String>,
    created_textures: usize,
    destroyed_textures: usize,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report textures of `format` as unsupported
    pub fn with_unsupported_format(mut self, format: TextureFormat) -> Self {
        self.unsupported_formats.insert(format);
        self
    }

    /// Report textures named `name` as unsupported, whatever their format
    pub fn with_unsupported_texture(mut self, name: &str) -> Self {
        self.unsupported_names.insert(name.to_string());
        self
    }

    /// Textures currently alive
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Textures created over the backend's lifetime
    pub fn created_texture_count(&self) -> usize {
        self.created_textures
    }

    /// Textures destroyed over the backend's lifetime
    pub fn destroyed_texture_count(&self) -> usize {
        self.destroyed_textures
    }

    pub fn live_material_count(&self) -> usize {
        self.materials.len()
    }

    /// Descriptor a live texture was created with
    pub fn texture_descriptor(&self, texture: GpuTexture) -> Option<&TextureDescriptor> {
        self.textures.get(&texture)
    }

    /// Texture standing in for an external surface, if it was ever resolved
    pub fn surface_texture(&self, surface: SurfaceRef) -> Option<GpuTexture> {
        self.surfaces.get(&surface).copied()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for DummyBackend {
    type CommandBuffer = DummyCommandBuffer;

    fn name(&self) -> &str {
        "Dummy Backend"
    }

    fn create_command_buffer(&mut self, label: &str) -> DummyCommandBuffer {
        DummyCommandBuffer::new(label)
    }

    fn supports_texture(&self, desc: &TextureDescriptor) -> bool {
        !self.unsupported_formats.contains(&desc.format)
            && !self.unsupported_names.contains(&desc.name)
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<GpuTexture> {
        if !self.supports_texture(desc) {
            return Err(BackendError::TextureCreationFailed(format!(
                "{} uses unsupported format {:?}",
                desc.name, desc.format
            )));
        }

        let texture = GpuTexture(self.allocate_id());
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {:?}, {} samples)",
            desc.name,
            desc.width,
            desc.height,
            desc.format,
            desc.msaa_samples.count()
        );
        self.textures.insert(texture, desc.clone());
        self.created_textures += 1;
        Ok(texture)
    }

    fn resolve_surface(&mut self, surface: SurfaceRef) -> BackendResult<GpuTexture> {
        if let Some(texture) = self.surfaces.get(&surface) {
            return Ok(*texture);
        }
        let texture = GpuTexture(self.allocate_id());
        log::trace!("DummyBackend: binding surface {:?} to {:?}", surface, texture);
        self.surfaces.insert(surface, texture);
        Ok(texture)
    }

    fn create_material(&mut self, shader: &str) -> BackendResult<MaterialHandle> {
        let material = MaterialHandle(self.allocate_id());
        log::trace!("DummyBackend: creating material for shader {:?}", shader);
        self.materials.insert(material, shader.to_string());
        Ok(material)
    }

    fn destroy_texture(&mut self, texture: GpuTexture) {
        if self.textures.remove(&texture).is_some() {
            log::trace!("DummyBackend: destroying texture {:?}", texture);
            self.destroyed_textures += 1;
        } else {
            log::warn!("DummyBackend: destroying unknown texture {:?}", texture);
        }
    }

    fn destroy_material(&mut self, material: MaterialHandle) {
        if self.materials.remove(&material).is_none() {
            log::warn!("DummyBackend: destroying unknown material {:?}", material);
        }
    }
}

/// A command recorded by [`DummyCommandBuffer`]
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCommand {
    BeginSample(String),
    EndSample(String),
    SetRenderTargets {
        colors: Vec<GpuTexture>,
        depth: Option<GpuTexture>,
    },
    ClearRenderTarget {
        target: GpuTexture,
        value: ClearValue,
    },
    SetViewport(Viewport),
    DrawVisibilityList {
        pass_tag: ShaderTag,
        renderers: Vec<u64>,
    },
    SetTexture {
        material: MaterialHandle,
        name: String,
        texture: GpuTexture,
    },
    DrawProcedural {
        material: MaterialHandle,
        shader_pass: u32,
        topology: PrimitiveTopology,
        vertex_count: u32,
        instance_count: u32,
    },
    ResolveTexture {
        source: GpuTexture,
        destination: GpuTexture,
    },
}

/// Command buffer that stores what it is asked to record
#[derive(Debug, Clone, Default)]
pub struct DummyCommandBuffer {
    label: String,
    commands: Vec<DummyCommand>,
}

impl DummyCommandBuffer {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            commands: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn commands(&self) -> &[DummyCommand] {
        &self.commands
    }
}

impl CommandBuffer for DummyCommandBuffer {
    fn begin_sample(&mut self, name: &str) {
        self.commands.push(DummyCommand::BeginSample(name.to_string()));
    }

    fn end_sample(&mut self, name: &str) {
        self.commands.push(DummyCommand::EndSample(name.to_string()));
    }

    fn set_render_targets(&mut self, colors: &[GpuTexture], depth: Option<GpuTexture>) {
        self.commands.push(DummyCommand::SetRenderTargets {
            colors: colors.to_vec(),
            depth,
        });
    }

    fn clear_render_target(&mut self, target: GpuTexture, value: ClearValue) {
        self.commands
            .push(DummyCommand::ClearRenderTarget { target, value });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DummyCommand::SetViewport(viewport));
    }

    fn draw_visibility_list(&mut self, list: &VisibilityList) {
        self.commands.push(DummyCommand::DrawVisibilityList {
            pass_tag: list.desc.pass_tag,
            renderers: list.renderers.clone(),
        });
    }

    fn set_texture(&mut self, material: MaterialHandle, name: &str, texture: GpuTexture) {
        self.commands.push(DummyCommand::SetTexture {
            material,
            name: name.to_string(),
            texture,
        });
    }

    fn draw_procedural(
        &mut self,
        material: MaterialHandle,
        shader_pass: u32,
        topology: PrimitiveTopology,
        vertex_count: u32,
        instance_count: u32,
    ) {
        self.commands.push(DummyCommand::DrawProcedural {
            material,
            shader_pass,
            topology,
            vertex_count,
            instance_count,
        });
    }

    fn resolve_texture(&mut self, source: GpuTexture, destination: GpuTexture) {
        self.commands.push(DummyCommand::ResolveTexture {
            source,
            destination,
        });
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Render context that records what the driver asked of it
#[derive(Debug, Default)]
pub struct DummyContext {
    /// Culling output returned for every camera
    pub culling: CullingResults,
    /// Names of cameras whose globals were uploaded, in order
    pub camera_setups: Vec<String>,
    /// Copy of each executed command buffer, in order
    pub executed: Vec<Vec<DummyCommand>>,
    pub submit_count: usize,
}

impl DummyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose culling returns `renderers` for every camera
    pub fn with_renderers(renderers: Vec<VisibleRenderer>) -> Self {
        Self {
            culling: CullingResults::new(renderers),
            ..Default::default()
        }
    }
}

impl RenderContext<DummyCommandBuffer> for DummyContext {
    fn cull(&mut self, _camera: &Camera) -> CullingResults {
        self.culling.clone()
    }

    fn setup_camera_properties(&mut self, camera: &Camera, _uniforms: &CameraUniformData) {
        self.camera_setups.push(camera.name.clone());
    }

    fn execute_command_buffer(&mut self, command_buffer: &DummyCommandBuffer) {
        log::trace!(
            "DummyContext: executing {:?} with {} commands",
            command_buffer.label(),
            command_buffer.commands().len()
        );
        self.executed.push(command_buffer.commands().to_vec());
    }

    fn submit(&mut self) {
        self.submit_count += 1;
    }
}
