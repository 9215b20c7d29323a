//! Culling results and visibility lists
//!
//! Culling itself happens in the host [`RenderContext`](crate::backend::RenderContext);
//! this module only describes its output and how a pass filters it into the
//! list of renderers it draws.

use std::fmt;

/// Shader pass tag that selects which pass of a material a list draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderTag(pub &'static str);

impl ShaderTag {
    pub const DEPTH_ONLY: ShaderTag = ShaderTag("DepthOnly");
    pub const GBUFFER: ShaderTag = ShaderTag("GBuffer");

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ShaderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Well-known render queue values
pub struct RenderQueue;

impl RenderQueue {
    pub const BACKGROUND: i32 = 1000;
    pub const GEOMETRY: i32 = 2000;
    pub const ALPHA_TEST: i32 = 2450;
    pub const GEOMETRY_LAST: i32 = 2500;
    pub const TRANSPARENT: i32 = 3000;
    pub const OVERLAY: i32 = 4000;
}

/// Inclusive range of render queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderQueueRange {
    pub lower: i32,
    pub upper: i32,
}

impl RenderQueueRange {
    /// Background through the last geometry queue
    pub const OPAQUE: RenderQueueRange = RenderQueueRange {
        lower: RenderQueue::BACKGROUND,
        upper: RenderQueue::GEOMETRY_LAST,
    };

    pub fn contains(&self, queue: i32) -> bool {
        (self.lower..=self.upper).contains(&queue)
    }
}

/// Draw ordering applied to a visibility list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortingCriteria {
    #[default]
    None,
    /// Ascending render queue, then ascending distance
    CommonOpaque,
    /// Ascending render queue, then descending distance
    CommonTransparent,
}

/// A renderer that survived culling
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRenderer {
    pub id: u64,
    pub render_queue: i32,
    /// Shader passes the renderer's material provides
    pub pass_tags: Vec<ShaderTag>,
    /// Distance from the camera, used for sorting
    pub distance: f32,
    pub has_motion_vectors: bool,
}

impl VisibleRenderer {
    pub fn new(id: u64, render_queue: i32, pass_tags: &[ShaderTag]) -> Self {
        Self {
            id,
            render_queue,
            pass_tags: pass_tags.to_vec(),
            distance: 0.0,
            has_motion_vectors: false,
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_motion_vectors(mut self, has_motion_vectors: bool) -> Self {
        self.has_motion_vectors = has_motion_vectors;
        self
    }
}

/// Output of culling one camera
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullingResults {
    pub renderers: Vec<VisibleRenderer>,
}

impl CullingResults {
    pub fn new(renderers: Vec<VisibleRenderer>) -> Self {
        Self { renderers }
    }
}

/// Filter and sort settings for a visibility list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityListDesc {
    pub pass_tag: ShaderTag,
    pub queue_range: RenderQueueRange,
    pub sorting: SortingCriteria,
    pub exclude_motion_vectors: bool,
}

impl VisibilityListDesc {
    /// Opaque geometry drawn with `pass_tag`, sorted front to back, skipping
    /// renderers that draw their own motion vectors
    pub fn opaque(pass_tag: ShaderTag) -> Self {
        Self {
            pass_tag,
            queue_range: RenderQueueRange::OPAQUE,
            sorting: SortingCriteria::CommonOpaque,
            exclude_motion_vectors: true,
        }
    }
}

/// Renderer ids a pass draws, in draw order
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityList {
    pub desc: VisibilityListDesc,
    pub renderers: Vec<u64>,
}

impl VisibilityList {
    /// Filter culling output through `desc`
    pub fn build(culling: &CullingResults, desc: VisibilityListDesc) -> Self {
        let mut visible: Vec<&VisibleRenderer> = culling
            .renderers
            .iter()
            .filter(|r| r.pass_tags.contains(&desc.pass_tag))
            .filter(|r| desc.queue_range.contains(r.render_queue))
            .filter(|r| !(desc.exclude_motion_vectors && r.has_motion_vectors))
            .collect();

        match desc.sorting {
            SortingCriteria::None => {}
            SortingCriteria::CommonOpaque => visible.sort_by(|a, b| {
                a.render_queue
                    .cmp(&b.render_queue)
                    .then(a.distance.total_cmp(&b.distance))
            }),
            SortingCriteria::CommonTransparent => visible.sort_by(|a, b| {
                a.render_queue
                    .cmp(&b.render_queue)
                    .then(b.distance.total_cmp(&a.distance))
            }),
        }

        Self {
            desc,
            renderers: visible.iter().map(|r| r.id).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}
