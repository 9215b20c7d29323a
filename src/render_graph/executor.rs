//! Render graph executor

use std::collections::{HashMap, HashSet};

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{GraphBuildError, RenderResult};
use crate::render_graph::graph::*;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;

/// Depth value written when a depth attachment is cleared
const DEPTH_CLEAR_VALUE: f32 = 1.0;

/// A physical texture owned by the transient pool
#[derive(Debug)]
struct PooledTexture {
    key: TextureKey,
    texture: GpuTexture,
    in_use: bool,
    used_this_frame: bool,
}

/// What one execution did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Pass names in execution order
    pub executed_passes: Vec<String>,
    /// Physical textures the backend had to create
    pub created_textures: usize,
    /// Physical textures taken from the pool
    pub reused_textures: usize,
}

/// Executor for running the compiled render graph
pub struct RenderGraphExecutor {
    pool: Vec<PooledTexture>,
}

impl RenderGraphExecutor {
    pub fn new() -> Self {
        Self { pool: Vec::new() }
    }

    pub fn pooled_texture_count(&self) -> usize {
        self.pool.len()
    }

    /// Execute the render graph into `command_buffer`.
    ///
    /// Transient textures are taken from the pool at their first use and
    /// returned after their last use, so textures with disjoint lifetimes and
    /// matching allocation keys share memory.
    pub fn execute<B: GraphicsBackend>(
        &mut self,
        graph: &RecordedGraph,
        compiled: &CompiledGraph,
        backend: &mut B,
        command_buffer: &mut B::CommandBuffer,
    ) -> RenderResult<ExecutionReport> {
        let mut report = ExecutionReport::default();
        let result = self.run(graph, compiled, backend, command_buffer, &mut report);

        // Nothing outlives a single execution
        for entry in &mut self.pool {
            entry.in_use = false;
        }

        result.map(|_| report)
    }

    fn run<B: GraphicsBackend>(
        &mut self,
        graph: &RecordedGraph,
        compiled: &CompiledGraph,
        backend: &mut B,
        command_buffer: &mut B::CommandBuffer,
        report: &mut ExecutionReport,
    ) -> RenderResult<()> {
        let mut physical: HashMap<TextureHandle, GpuTexture> = HashMap::new();

        for (step, &id) in compiled.pass_order.iter().enumerate() {
            let Some(node) = graph.pass(id) else {
                continue;
            };

            let mut first_use: HashSet<TextureHandle> = HashSet::new();
            for access in &node.accesses {
                if physical.contains_key(&access.handle) {
                    continue;
                }
                let texture = graph.registry.get(access.handle).ok_or_else(|| {
                    GraphBuildError::InvalidHandle {
                        pass: node.name.clone(),
                        handle: access.handle,
                    }
                })?;
                let gpu = match texture.origin {
                    TextureOrigin::Imported(gpu) => gpu,
                    TextureOrigin::Transient => {
                        first_use.insert(access.handle);
                        self.acquire(&texture.desc, backend, report)?
                    }
                };
                physical.insert(access.handle, gpu);
            }

            self.dispatch(graph, node, &physical, &first_use, command_buffer)?;
            report.executed_passes.push(node.name.clone());

            for access in &node.accesses {
                let last_use = compiled
                    .resource_lifetimes
                    .get(&access.handle)
                    .map(|l| l.last_use);
                let transient = graph
                    .registry
                    .get(access.handle)
                    .is_some_and(|t| !t.is_imported());
                if transient && last_use == Some(step) {
                    if let Some(&gpu) = physical.get(&access.handle) {
                        self.release(gpu);
                    }
                }
            }
        }

        Ok(())
    }

    /// Translate one pass into command buffer calls
    fn dispatch<C: CommandBuffer>(
        &self,
        graph: &RecordedGraph,
        node: &PassNode,
        physical: &HashMap<TextureHandle, GpuTexture>,
        first_use: &HashSet<TextureHandle>,
        command_buffer: &mut C,
    ) -> RenderResult<()> {
        let resolve = |handle: TextureHandle| {
            physical
                .get(&handle)
                .copied()
                .ok_or_else(|| GraphBuildError::InvalidHandle {
                    pass: node.name.clone(),
                    handle,
                })
        };

        let colors = node
            .color_attachments()
            .into_iter()
            .map(resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let depth = node
            .depth_attachment()
            .map(|access| resolve(access.handle))
            .transpose()?;

        let mut clears = Vec::new();
        for access in node.accesses.iter().filter(|a| a.usage.is_attachment()) {
            let Some(texture) = graph.registry.get(access.handle) else {
                continue;
            };
            if texture.desc.clear && first_use.contains(&access.handle) {
                let value = if texture.kind == TextureKind::Depth {
                    ClearValue::Depth(DEPTH_CLEAR_VALUE)
                } else {
                    ClearValue::Color(texture.desc.clear_color)
                };
                clears.push((resolve(access.handle)?, value));
            }
        }

        let sample = node.profile.name();
        command_buffer.begin_sample(sample);

        if !colors.is_empty() || depth.is_some() {
            command_buffer.set_render_targets(&colors, depth);
        }
        if let Some(viewport) = node.viewport {
            command_buffer.set_viewport(viewport);
        }
        for (target, value) in clears {
            command_buffer.clear_render_target(target, value);
        }

        match &node.command {
            PassCommand::DrawVisibilityList { list } => {
                let list = graph.visibility_list(*list).ok_or_else(|| {
                    GraphBuildError::InvalidVisibilityList {
                        pass: node.name.clone(),
                    }
                })?;
                if list.is_empty() && node.allow_renderer_list_culling {
                    log::trace!("{}: empty renderer list culled", node.name);
                } else {
                    command_buffer.draw_visibility_list(list);
                }
            }
            PassCommand::ResolveDepth {
                source,
                destination,
            } => {
                command_buffer.resolve_texture(resolve(*source)?, resolve(*destination)?);
            }
            PassCommand::FullscreenComposite {
                material,
                property,
                source,
            } => {
                command_buffer.set_texture(*material, property, resolve(*source)?);
                // One oversized triangle covers the viewport
                command_buffer.draw_procedural(*material, 0, PrimitiveTopology::TriangleList, 3, 1);
            }
        }

        command_buffer.end_sample(sample);
        Ok(())
    }

    fn acquire<B: GraphicsBackend>(
        &mut self,
        desc: &TextureDescriptor,
        backend: &mut B,
        report: &mut ExecutionReport,
    ) -> RenderResult<GpuTexture> {
        let key = desc.allocation_key();
        if let Some(entry) = self.pool.iter_mut().find(|e| !e.in_use && e.key == key) {
            entry.in_use = true;
            entry.used_this_frame = true;
            report.reused_textures += 1;
            log::trace!("RenderGraphExecutor: reusing {:?} for {:?}", entry.texture, desc.name);
            return Ok(entry.texture);
        }

        let texture = backend.create_texture(desc)?;
        self.pool.push(PooledTexture {
            key,
            texture,
            in_use: true,
            used_this_frame: true,
        });
        report.created_textures += 1;
        Ok(texture)
    }

    fn release(&mut self, texture: GpuTexture) {
        if let Some(entry) = self.pool.iter_mut().find(|e| e.texture == texture) {
            entry.in_use = false;
        }
    }

    /// Destroy pooled textures that were not used since the previous call.
    /// Returns how many were destroyed.
    pub fn end_frame<B: GraphicsBackend>(&mut self, backend: &mut B) -> usize {
        let before = self.pool.len();
        self.pool.retain_mut(|entry| {
            if entry.used_this_frame {
                entry.used_this_frame = false;
                true
            } else {
                backend.destroy_texture(entry.texture);
                false
            }
        });
        before - self.pool.len()
    }

    /// Clean up allocated resources
    pub fn cleanup<B: GraphicsBackend>(&mut self, backend: &mut B) {
        for entry in self.pool.drain(..) {
            backend.destroy_texture(entry.texture);
        }
    }
}

impl Default for RenderGraphExecutor {
    fn default() -> Self {
        Self::new()
    }
}
