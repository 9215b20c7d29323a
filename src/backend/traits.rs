//! Core backend abstraction traits
//!
//! These traits define what the render graph and the frame driver need from a
//! graphics device: physical textures, materials, a command buffer to record
//! into, and a render context that culls, uploads camera state and submits.

use crate::backend::types::*;
use crate::scene::{Camera, CameraUniformData, CullingResults, VisibilityList};
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create material: {0}")]
    MaterialCreationFailed(String),
    #[error("Failed to resolve surface: {0}")]
    SurfaceUnavailable(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a physical GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuTexture(pub u64);

/// Handle to a material (shader plus its property block)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Command buffer type recorded by this backend
    type CommandBuffer: CommandBuffer;

    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Create an empty command buffer
    fn create_command_buffer(&mut self, label: &str) -> Self::CommandBuffer;

    // Resource creation

    /// Whether the device can allocate a texture matching `desc`
    fn supports_texture(&self, desc: &TextureDescriptor) -> bool;

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<GpuTexture>;

    /// Look up the texture backing an externally owned surface
    fn resolve_surface(&mut self, surface: SurfaceRef) -> BackendResult<GpuTexture>;

    /// Create a material from a shader name
    fn create_material(&mut self, shader: &str) -> BackendResult<MaterialHandle>;

    // Resource cleanup

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: GpuTexture);

    /// Destroy a material
    fn destroy_material(&mut self, material: MaterialHandle);
}

/// A recorded stream of GPU commands
pub trait CommandBuffer {
    /// Open a named profiling sample
    fn begin_sample(&mut self, name: &str);

    /// Close the most recent sample with this name
    fn end_sample(&mut self, name: &str);

    /// Bind color attachments (in slot order) and an optional depth attachment
    fn set_render_targets(&mut self, colors: &[GpuTexture], depth: Option<GpuTexture>);

    /// Clear a bound render target
    fn clear_render_target(&mut self, target: GpuTexture, value: ClearValue);

    /// Set viewport
    fn set_viewport(&mut self, viewport: Viewport);

    /// Draw every renderer in a resolved visibility list
    fn draw_visibility_list(&mut self, list: &VisibilityList);

    /// Bind a texture to a named material property
    fn set_texture(&mut self, material: MaterialHandle, name: &str, texture: GpuTexture);

    /// Draw without vertex or index buffers
    fn draw_procedural(
        &mut self,
        material: MaterialHandle,
        shader_pass: u32,
        topology: PrimitiveTopology,
        vertex_count: u32,
        instance_count: u32,
    );

    /// Resolve a multisampled texture into a single-sample one
    fn resolve_texture(&mut self, source: GpuTexture, destination: GpuTexture);

    /// Drop every recorded command
    fn clear(&mut self);

    fn is_empty(&self) -> bool;
}

/// Per-frame host context: culling, camera globals and submission
pub trait RenderContext<C: CommandBuffer> {
    /// Cull the scene for a camera
    fn cull(&mut self, camera: &Camera) -> CullingResults;

    /// Upload camera-global shader state
    fn setup_camera_properties(&mut self, camera: &Camera, uniforms: &CameraUniformData);

    /// Queue a command buffer for execution
    fn execute_command_buffer(&mut self, command_buffer: &C);

    /// Submit everything queued so far
    fn submit(&mut self);
}
