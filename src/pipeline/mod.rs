//! Deferred rendering pipeline
//!
//! Per camera, the pipeline declares:
//! 1. Depth prepass - Opaque depth into the camera depth buffer
//! 2. Depth resolve - MSAA cameras only, into a single-sample depth buffer
//! 3. G-Buffer pass - Albedo and normals against the resolved depth
//! 4. Final pass - Fullscreen composite of the G-buffer into the camera target

pub mod descriptors;
pub mod pass_declaration;
pub mod postprocess;
pub mod prepass;

pub use descriptors::*;
pub use pass_declaration::{declare_pass, PassInfo, PassResources};
pub use postprocess::{composite, FinalPassMaterial, FINAL_PASS_SHADER, INPUT_TEXTURE_PROPERTY};
pub use prepass::{render_prepass, GBufferOutput, PrepassAccumulator, PrepassOutput};

use crate::backend::types::MsaaSamples;

/// Configuration for the Deferred pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Label used for command buffers and logs
    pub name: String,
    /// Sample count for cameras that allow MSAA
    pub msaa_samples: MsaaSamples,
    /// Shader the final composite material is created from
    pub final_pass_shader: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "Deferred Pipeline".to_string(),
            msaa_samples: MsaaSamples::X4,
            final_pass_shader: FINAL_PASS_SHADER.to_string(),
        }
    }
}
