//! Shared helpers for the pipeline integration tests.
//!
//! Everything runs on the dummy backend, so tests inspect the recorded
//! command streams instead of reading pixels back.

#![allow(dead_code)]

use deferred_pipeline::backend::dummy::*;
use deferred_pipeline::backend::*;
use deferred_pipeline::scene::*;
use deferred_pipeline::{EditorFrameCounter, PipelineConfig, RenderPipeline};

pub fn init_logging() {
    deferred_pipeline::init_logging();
}

pub fn pipeline() -> RenderPipeline<DummyBackend> {
    pipeline_with(PipelineConfig::default(), DummyBackend::new())
}

pub fn pipeline_with(config: PipelineConfig, backend: DummyBackend) -> RenderPipeline<DummyBackend> {
    init_logging();
    RenderPipeline::new(config, backend, Box::new(EditorFrameCounter::new()))
        .expect("dummy pipeline should initialize")
}

pub fn camera(name: &str, width: u32, height: u32) -> Camera {
    Camera::new(name, PixelRect::sized(width, height))
}

/// A few opaque renderers plus one transparent and one motion-vector renderer
pub fn scene_renderers() -> Vec<VisibleRenderer> {
    let both = [ShaderTag::DEPTH_ONLY, ShaderTag::GBUFFER];
    vec![
        VisibleRenderer::new(1, RenderQueue::GEOMETRY, &both).with_distance(10.0),
        VisibleRenderer::new(2, RenderQueue::GEOMETRY, &both).with_distance(2.0),
        VisibleRenderer::new(3, RenderQueue::ALPHA_TEST, &[ShaderTag::GBUFFER]),
        VisibleRenderer::new(4, RenderQueue::TRANSPARENT, &both),
        VisibleRenderer::new(5, RenderQueue::GEOMETRY, &both).with_motion_vectors(true),
    ]
}

/// Texture the final composite binds as its input
pub fn composite_source(commands: &[DummyCommand]) -> Option<GpuTexture> {
    commands.iter().find_map(|command| match command {
        DummyCommand::SetTexture { texture, .. } => Some(*texture),
        _ => None,
    })
}

/// Every `(source, destination)` pair of the stream's resolves
pub fn resolves(commands: &[DummyCommand]) -> Vec<(GpuTexture, GpuTexture)> {
    commands
        .iter()
        .filter_map(|command| match command {
            DummyCommand::ResolveTexture {
                source,
                destination,
            } => Some((*source, *destination)),
            _ => None,
        })
        .collect()
}

/// Every render target binding of the stream, in order
pub fn render_targets(commands: &[DummyCommand]) -> Vec<(Vec<GpuTexture>, Option<GpuTexture>)> {
    commands
        .iter()
        .filter_map(|command| match command {
            DummyCommand::SetRenderTargets { colors, depth } => Some((colors.clone(), *depth)),
            _ => None,
        })
        .collect()
}

/// Renderer lists drawn by the stream, keyed by pass tag
pub fn draws(commands: &[DummyCommand]) -> Vec<(ShaderTag, Vec<u64>)> {
    commands
        .iter()
        .filter_map(|command| match command {
            DummyCommand::DrawVisibilityList {
                pass_tag,
                renderers,
            } => Some((*pass_tag, renderers.clone())),
            _ => None,
        })
        .collect()
}

pub fn texture_name(backend: &DummyBackend, texture: GpuTexture) -> Option<String> {
    backend.texture_descriptor(texture).map(|desc| desc.name.clone())
}
