//! Error types for graph building and frame rendering.

use thiserror::Error;

use crate::backend::traits::BackendError;
use crate::render_graph::{TextureHandle, TextureKind};

/// Declaration-time failure while building one camera's graph.
///
/// Recovered at the per-camera boundary: the camera is skipped for the frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphBuildError {
    #[error("invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("pass {pass:?}: handle {handle:?} does not belong to the current recording scope")]
    InvalidHandle { pass: String, handle: TextureHandle },
    #[error("pass {pass:?}: visibility list does not belong to the current recording scope")]
    InvalidVisibilityList { pass: String },
    #[error("G-buffer already holds {capacity} render targets")]
    MrtOverflow { capacity: usize },
    #[error("pass {pass:?}: color slot {slot} is out of range (max {max})")]
    ColorSlotOutOfRange { pass: String, slot: usize, max: usize },
    #[error("pass {pass:?}: color slot {slot} is bound twice")]
    DuplicateColorSlot { pass: String, slot: usize },
    #[error("pass {pass:?}: more than one depth attachment")]
    DuplicateDepthAttachment { pass: String },
    #[error("pass {pass:?}: {texture:?} cannot be bound as a {expected:?} attachment")]
    AttachmentKindMismatch {
        pass: String,
        texture: String,
        expected: TextureKind,
    },
    #[error("pass {pass:?}: {texture:?} has {found} samples, other attachments have {expected}")]
    SampleCountMismatch {
        pass: String,
        texture: String,
        expected: u32,
        found: u32,
    },
    #[error("pass {pass:?}: {texture:?} is read before any pass writes it")]
    ReadBeforeWrite { pass: String, texture: String },
    #[error("{texture:?} is still multisampled ({samples} samples) after resolve")]
    UnresolvedMultisample { texture: String, samples: u32 },
    #[error("dependency cycle through pass {pass:?}")]
    CyclicDependency { pass: String },
}

pub type GraphResult<T> = Result<T, GraphBuildError>;

/// Any failure while rendering a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("render graph build failed: {0}")]
    GraphBuild(#[from] GraphBuildError),
    #[error("resource {name:?} unavailable: {reason}")]
    ResourceUnavailable { name: String, reason: String },
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// Structurally invalid pipeline state; surfaced to the host
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RenderError {
    /// Whether the error must abort the frame instead of just one camera
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Configuration(_))
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
