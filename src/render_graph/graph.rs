//! Render graph recording and compilation

use std::collections::{BTreeSet, HashMap, HashSet};

use glam::Vec4;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{GraphBuildError, GraphResult, RenderError, RenderResult};
use crate::render_graph::executor::*;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::scene::{CullingResults, VisibilityList, VisibilityListDesc};

/// Per-scope inputs supplied when recording starts
#[derive(Debug, Clone, Copy)]
pub struct RecordingParams<'a> {
    pub frame_index: u64,
    /// Diagnostic label, usually the camera name
    pub label: &'a str,
    /// Culling output the scope's visibility lists are built from
    pub culling: &'a CullingResults,
}

/// Passes, textures and visibility lists recorded in one scope
#[derive(Debug, Clone)]
pub struct RecordedGraph {
    pub registry: ResourceRegistry,
    pub passes: Vec<PassNode>,
    pub visibility_lists: Vec<VisibilityList>,
}

impl RecordedGraph {
    pub fn new(scope: u64) -> Self {
        Self {
            registry: ResourceRegistry::new(scope),
            passes: Vec::new(),
            visibility_lists: Vec::new(),
        }
    }

    pub fn pass(&self, id: PassHandle) -> Option<&PassNode> {
        self.passes.get(id.index())
    }

    pub fn visibility_list(&self, handle: VisibilityListHandle) -> Option<&VisibilityList> {
        if handle.scope != self.registry.scope() {
            return None;
        }
        self.visibility_lists.get(handle.index as usize)
    }

    /// Compile the graph: dependency edges, execution order and resource
    /// lifetimes.
    ///
    /// Edges follow read-after-write, write-after-read and write-after-write
    /// hazards in recording order. Among passes whose dependencies are all
    /// satisfied the earliest recorded runs first, so a legal recording order
    /// is kept as is.
    pub fn compile(&self) -> GraphResult<CompiledGraph> {
        let count = self.passes.len();
        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
        let mut last_writer: HashMap<TextureHandle, usize> = HashMap::new();
        let mut readers: HashMap<TextureHandle, Vec<usize>> = HashMap::new();

        for (index, node) in self.passes.iter().enumerate() {
            for access in node.accesses.iter().filter(|a| a.mode.is_read()) {
                if let Some(&writer) = last_writer.get(&access.handle) {
                    if writer != index {
                        dependencies[index].insert(writer);
                    }
                }
            }

            for access in node.accesses.iter().filter(|a| a.mode.is_write()) {
                if let Some(&writer) = last_writer.get(&access.handle) {
                    if writer != index {
                        dependencies[index].insert(writer);
                    }
                }
                if let Some(previous) = readers.remove(&access.handle) {
                    dependencies[index].extend(previous.into_iter().filter(|&r| r != index));
                }
                last_writer.insert(access.handle, index);
            }

            for access in node.accesses.iter().filter(|a| a.mode.is_read()) {
                readers.entry(access.handle).or_default().push(index);
            }
        }

        // Topological sort using Kahn's algorithm
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, deps) in dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(index);
            }
        }
        let mut in_degree: Vec<usize> = dependencies.iter().map(|d| d.len()).collect();
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            order.push(index);
            for &dependent in &dependents[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != count {
            let stuck = (0..count).find(|&i| in_degree[i] > 0).unwrap_or_default();
            return Err(GraphBuildError::CyclicDependency {
                pass: self.passes[stuck].name.clone(),
            });
        }

        // Determine resource lifetimes
        let mut resource_lifetimes: HashMap<TextureHandle, ResourceLifetime> = HashMap::new();
        for (step, &index) in order.iter().enumerate() {
            for access in &self.passes[index].accesses {
                resource_lifetimes
                    .entry(access.handle)
                    .or_insert(ResourceLifetime {
                        first_use: step,
                        last_use: step,
                    })
                    .last_use = step;
            }
        }

        Ok(CompiledGraph {
            pass_order: order.into_iter().map(|i| PassHandle(i as u32)).collect(),
            resource_lifetimes,
        })
    }
}

/// Resource lifetime in terms of pass execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

/// Compiled render graph with execution order and resource lifetimes
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub pass_order: Vec<PassHandle>,
    pub resource_lifetimes: HashMap<TextureHandle, ResourceLifetime>,
}

impl CompiledGraph {
    /// Check if a resource is alive at a given execution step
    pub fn is_resource_alive(&self, resource: TextureHandle, step: usize) -> bool {
        if let Some(lifetime) = self.resource_lifetimes.get(&resource) {
            step >= lifetime.first_use && step <= lifetime.last_use
        } else {
            false
        }
    }
}

/// Descriptor substituted when a `fallback_to_black` texture is unsupported:
/// a single-sample, black-cleared color texture of the same size
pub fn fallback_texture_desc(desc: &TextureDescriptor) -> TextureDescriptor {
    TextureDescriptor {
        name: format!("{} (Fallback)", desc.name),
        width: desc.width,
        height: desc.height,
        format: TextureFormat::Rgba8Unorm,
        clear: true,
        clear_color: Vec4::ZERO,
        ..Default::default()
    }
}

/// The render graph engine.
///
/// Owns the transient texture pool, which outlives individual recordings.
/// Each [`RecordingScope`] builds and executes one graph; handles it issues
/// are useless once it ends.
pub struct RenderGraph {
    executor: RenderGraphExecutor,
    next_scope: u64,
    completed_frames: u64,
    disposed: bool,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            executor: RenderGraphExecutor::new(),
            next_scope: 1,
            completed_frames: 0,
            disposed: false,
        }
    }

    /// Open a recording scope. Dropping the scope without calling
    /// [`RecordingScope::execute`] discards everything recorded in it.
    pub fn begin_recording<'a, B: GraphicsBackend>(
        &'a mut self,
        params: RecordingParams<'a>,
        backend: &'a mut B,
        command_buffer: &'a mut B::CommandBuffer,
    ) -> RenderResult<RecordingScope<'a, B>> {
        if self.disposed {
            return Err(RenderError::Configuration(
                "render graph used after cleanup".to_string(),
            ));
        }

        let scope = self.next_scope;
        self.next_scope += 1;
        log::trace!(
            "RenderGraph: begin recording {:?} (frame {}, scope {})",
            params.label,
            params.frame_index,
            scope
        );

        Ok(RecordingScope {
            executor: &mut self.executor,
            backend,
            command_buffer,
            params,
            graph: RecordedGraph::new(scope),
            written: HashSet::new(),
            finished: false,
        })
    }

    /// Frame boundary: destroy pooled textures nobody used this frame
    pub fn end_frame<B: GraphicsBackend>(&mut self, backend: &mut B) {
        let destroyed = self.executor.end_frame(backend);
        self.completed_frames += 1;
        if destroyed > 0 {
            log::debug!("RenderGraph: released {} idle pooled textures", destroyed);
        }
    }

    /// Destroy every pooled texture; the graph cannot record afterwards
    pub fn cleanup<B: GraphicsBackend>(&mut self, backend: &mut B) {
        self.executor.cleanup(backend);
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of [`end_frame`](Self::end_frame) calls so far
    pub fn completed_frames(&self) -> u64 {
        self.completed_frames
    }

    pub fn pooled_texture_count(&self) -> usize {
        self.executor.pooled_texture_count()
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// One graph being recorded against a backend and command buffer
pub struct RecordingScope<'a, B: GraphicsBackend> {
    executor: &'a mut RenderGraphExecutor,
    backend: &'a mut B,
    command_buffer: &'a mut B::CommandBuffer,
    params: RecordingParams<'a>,
    graph: RecordedGraph,
    written: HashSet<TextureHandle>,
    finished: bool,
}

impl<'a, B: GraphicsBackend> RecordingScope<'a, B> {
    pub fn frame_index(&self) -> u64 {
        self.params.frame_index
    }

    pub fn label(&self) -> &str {
        self.params.label
    }

    /// Register a transient texture.
    ///
    /// Unsupported descriptors that allow it are replaced by a black fallback;
    /// anything else the backend cannot provide is
    /// [`RenderError::ResourceUnavailable`].
    pub fn create_texture(&mut self, desc: &TextureDescriptor) -> RenderResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GraphBuildError::InvalidResolution {
                width: desc.width,
                height: desc.height,
            }
            .into());
        }

        if self.backend.supports_texture(desc) {
            return Ok(self
                .graph
                .registry
                .create(desc.clone(), TextureOrigin::Transient));
        }

        if !desc.fallback_to_black {
            return Err(RenderError::ResourceUnavailable {
                name: desc.name.clone(),
                reason: format!(
                    "{} cannot allocate {:?} with {} samples",
                    self.backend.name(),
                    desc.format,
                    desc.msaa_samples.count()
                ),
            });
        }

        let fallback = fallback_texture_desc(desc);
        if !self.backend.supports_texture(&fallback) {
            return Err(RenderError::ResourceUnavailable {
                name: desc.name.clone(),
                reason: format!("{} cannot allocate a fallback texture", self.backend.name()),
            });
        }

        log::warn!(
            "{}: {:?} is not supported by {}, using {:?}",
            self.params.label,
            desc.name,
            self.backend.name(),
            fallback.name
        );
        Ok(self
            .graph
            .registry
            .create(fallback, TextureOrigin::Transient))
    }

    /// Import the texture behind an external surface as a graph resource
    pub fn import_backbuffer(
        &mut self,
        surface: SurfaceRef,
        width: u32,
        height: u32,
    ) -> RenderResult<TextureHandle> {
        let texture = self.backend.resolve_surface(surface)?;
        let desc = TextureDescriptor {
            name: "Backbuffer".to_string(),
            width,
            height,
            format: TextureFormat::Bgra8UnormSrgb,
            ..Default::default()
        };
        Ok(self
            .graph
            .registry
            .create(desc, TextureOrigin::Imported(texture)))
    }

    /// Build a visibility list from the scope's culling results
    pub fn create_visibility_list(&mut self, desc: VisibilityListDesc) -> VisibilityListHandle {
        let handle = VisibilityListHandle {
            scope: self.graph.registry.scope(),
            index: self.graph.visibility_lists.len() as u32,
        };
        self.graph
            .visibility_lists
            .push(VisibilityList::build(self.params.culling, desc));
        handle
    }

    /// Descriptor a handle was registered with
    pub fn descriptor(&self, handle: TextureHandle) -> Option<&TextureDescriptor> {
        self.graph.registry.get(handle).map(|t| &t.desc)
    }

    /// Declare a pass.
    ///
    /// `setup` stages accesses on a [`PassBuilder`] and returns the pass's
    /// command. The node is appended only if `setup` and the final validation
    /// both succeed.
    pub fn add_pass<F>(&mut self, name: &str, profile: ProfileId, setup: F) -> GraphResult<PassHandle>
    where
        F: FnOnce(&mut PassBuilder) -> GraphResult<PassCommand>,
    {
        let id = PassHandle(self.graph.passes.len() as u32);
        let mut builder = PassBuilder::new(
            name,
            &self.graph.registry,
            &self.written,
            self.graph.visibility_lists.len(),
        );

        let node = setup(&mut builder).and_then(|command| builder.build(id, profile, command));
        match node {
            Ok(node) => {
                self.written.extend(
                    node.accesses
                        .iter()
                        .filter(|a| a.mode.is_write())
                        .map(|a| a.handle),
                );
                self.graph.passes.push(node);
                Ok(id)
            }
            Err(err) => {
                log::debug!("{}: discarding pass {:?}: {}", self.params.label, name, err);
                Err(err)
            }
        }
    }

    pub fn pass_count(&self) -> usize {
        self.graph.passes.len()
    }

    pub fn passes(&self) -> &[PassNode] {
        &self.graph.passes
    }

    pub fn graph(&self) -> &RecordedGraph {
        &self.graph
    }

    /// Close the scope: compile, then execute into the command buffer
    pub fn execute(mut self) -> RenderResult<ExecutionReport> {
        self.finished = true;
        let compiled = self.graph.compile()?;
        log::debug!(
            "{}: executing {} passes: {:?}",
            self.params.label,
            compiled.pass_order.len(),
            compiled
                .pass_order
                .iter()
                .filter_map(|&id| self.graph.pass(id))
                .map(|node| node.name.as_str())
                .collect::<Vec<_>>()
        );

        self.executor.execute(
            &self.graph,
            &compiled,
            &mut *self.backend,
            &mut *self.command_buffer,
        )
    }
}

impl<'a, B: GraphicsBackend> Drop for RecordingScope<'a, B> {
    fn drop(&mut self) {
        if !self.finished && !self.graph.passes.is_empty() {
            log::debug!(
                "{}: discarding {} recorded passes",
                self.params.label,
                self.graph.passes.len()
            );
        }
    }
}
