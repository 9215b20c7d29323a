//! Frame driver
//!
//! [`RenderPipeline`] renders a list of cameras per call. Every camera gets
//! its own recording scope; a camera whose graph fails to build is logged,
//! reported and skipped, and the rest of the frame carries on.

use crate::backend::traits::*;
use crate::error::{RenderError, RenderResult};
use crate::frame_index::FrameIndexProvider;
use crate::pipeline::{composite, render_prepass, FinalPassMaterial, PipelineConfig};
use crate::render_graph::{ExecutionReport, ProfileId, RecordingParams, RenderGraph};
use crate::scene::{Camera, CullingResults};

/// Outcome of one camera in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct CameraReport {
    pub camera: String,
    /// Pass names in execution order; empty when recording failed
    pub executed_passes: Vec<String>,
    pub error: Option<RenderError>,
}

impl CameraReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one `render` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub cameras: Vec<CameraReport>,
}

impl FrameReport {
    pub fn camera(&self, name: &str) -> Option<&CameraReport> {
        self.cameras.iter().find(|report| report.camera == name)
    }
}

/// Hooks called by the driver after each camera and each frame
pub trait RenderObserver {
    fn on_camera_rendered(&mut self, _report: &CameraReport) {}

    fn on_frame_rendered(&mut self, _report: &FrameReport) {}
}

/// Deferred pipeline driver
pub struct RenderPipeline<B: GraphicsBackend> {
    config: PipelineConfig,
    backend: B,
    graph: RenderGraph,
    command_buffer: B::CommandBuffer,
    frame_index_provider: Box<dyn FrameIndexProvider>,
    final_pass: Option<FinalPassMaterial>,
    observers: Vec<Box<dyn RenderObserver>>,
}

impl<B: GraphicsBackend> RenderPipeline<B> {
    pub fn new(
        config: PipelineConfig,
        mut backend: B,
        frame_index_provider: Box<dyn FrameIndexProvider>,
    ) -> RenderResult<Self> {
        let final_pass = FinalPassMaterial::new(&mut backend, &config.final_pass_shader)?;
        let command_buffer = backend.create_command_buffer(&config.name);
        log::info!(
            "{} initialized on {} ({} MSAA samples)",
            config.name,
            backend.name(),
            config.msaa_samples.count()
        );

        Ok(Self {
            config,
            backend,
            graph: RenderGraph::new(),
            command_buffer,
            frame_index_provider,
            final_pass: Some(final_pass),
            observers: Vec::new(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn RenderObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn render_graph(&self) -> &RenderGraph {
        &self.graph
    }

    /// Index of the last rendered frame
    pub fn frame_index(&self) -> u64 {
        self.frame_index_provider.current()
    }

    pub fn is_disposed(&self) -> bool {
        self.final_pass.is_none()
    }

    /// Render `cameras` in order.
    ///
    /// Per-camera failures end up in the returned report. Only configuration
    /// errors abort the call.
    pub fn render<C>(&mut self, context: &mut C, cameras: &[Camera]) -> RenderResult<FrameReport>
    where
        C: RenderContext<B::CommandBuffer>,
    {
        if self.is_disposed() {
            return Err(RenderError::Configuration(format!(
                "{} rendered after dispose",
                self.config.name
            )));
        }

        let frame_index = self.frame_index_provider.begin_frame(cameras);
        let mut frame = FrameReport {
            frame_index,
            cameras: Vec::with_capacity(cameras.len()),
        };

        for camera in cameras {
            let culling = context.cull(camera);
            context.setup_camera_properties(camera, &camera.uniform_data());

            let report = match self.record_camera(camera, &culling, frame_index) {
                Ok(execution) => CameraReport {
                    camera: camera.name.clone(),
                    executed_passes: execution.executed_passes,
                    error: None,
                },
                Err(err) if err.is_fatal() => {
                    self.command_buffer.clear();
                    return Err(err);
                }
                Err(err) => {
                    log::error!("render graph build failed for camera {:?}: {}", camera.name, err);
                    self.command_buffer.clear();
                    CameraReport {
                        camera: camera.name.clone(),
                        executed_passes: Vec::new(),
                        error: Some(err),
                    }
                }
            };

            context.execute_command_buffer(&self.command_buffer);
            context.submit();
            self.command_buffer.clear();

            for observer in &mut self.observers {
                observer.on_camera_rendered(&report);
            }
            frame.cameras.push(report);
        }

        self.graph.end_frame(&mut self.backend);
        for observer in &mut self.observers {
            observer.on_frame_rendered(&frame);
        }
        Ok(frame)
    }

    /// Record and execute one camera's graph inside a profiling sample
    fn record_camera(
        &mut self,
        camera: &Camera,
        culling: &CullingResults,
        frame_index: u64,
    ) -> RenderResult<ExecutionReport> {
        let material = match &self.final_pass {
            Some(material) => material.handle(),
            None => {
                return Err(RenderError::Configuration(
                    "final pass material missing".to_string(),
                ))
            }
        };

        let msaa = self.config.msaa_samples;
        let sample = ProfileId::RecordRenderGraph.name();
        self.command_buffer.begin_sample(sample);

        let params = RecordingParams {
            frame_index,
            label: &camera.name,
            culling,
        };
        let result = self
            .graph
            .begin_recording(params, &mut self.backend, &mut self.command_buffer)
            .and_then(|mut scope| {
                let backbuffer = scope.import_backbuffer(
                    camera.target,
                    camera.pixel_rect.width,
                    camera.pixel_rect.height,
                )?;
                let prepass = render_prepass(&mut scope, camera, msaa)?;
                composite(&mut scope, camera, &prepass, backbuffer, material)?;
                scope.execute()
            });

        self.command_buffer.end_sample(sample);
        result
    }

    /// Release pooled textures and the final pass material
    pub fn dispose(&mut self) {
        if let Some(material) = self.final_pass.take() {
            self.graph.cleanup(&mut self.backend);
            material.destroy(&mut self.backend);
            log::info!("{} disposed", self.config.name);
        }
    }
}
