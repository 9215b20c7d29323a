//! Deferred Pipeline - Per-frame composition of a deferred renderer on a render graph
//!
//! For every camera the pipeline records a render graph:
//! - Depth prepass into the camera depth buffer
//! - Depth resolve for MSAA cameras
//! - G-buffer pass writing albedo and normals
//! - Final fullscreen composite into the camera target
//!
//! # Features
//! - Render graph with declaration-time validation and dependency ordering
//! - Transient texture pool shared by all cameras of a frame
//! - Per-camera failure isolation
//! - Backend-agnostic: any [`backend::GraphicsBackend`] can drive it
//! - `dummy` backend for tests and headless runs

pub mod backend;
pub mod engine;
pub mod error;
pub mod frame_index;
pub mod pipeline;
pub mod render_graph;
pub mod scene;

pub use engine::{CameraReport, FrameReport, RenderObserver, RenderPipeline};
pub use error::{GraphBuildError, RenderError, RenderResult};
pub use frame_index::{EditorFrameCounter, EngineFrameCounter, FrameIndexProvider};
pub use pipeline::PipelineConfig;

#[cfg(feature = "dummy")]
pub use backend::dummy::DummyBackend;

/// Install `env_logger` as the `log` backend.
///
/// Honors `RUST_LOG` and defaults to `info`. Calling it again is a no-op.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
