//! Frame index providers
//!
//! The frame driver asks its provider for the index of every `render` call.
//! Editors count frames themselves; standalone players follow the engine's
//! time-based frame index.

use crate::scene::{Camera, CameraType};

/// Source of the frame index for each `render` call
pub trait FrameIndexProvider {
    /// Advance for a `render` call over `cameras` and return its frame index
    fn begin_frame(&mut self, cameras: &[Camera]) -> u64;

    /// Index returned by the last `begin_frame`
    fn current(&self) -> u64;
}

/// Counts frames that render at least one non-preview camera.
///
/// Preview-only calls (material thumbnails, inspector previews) leave the
/// counter unchanged.
#[derive(Debug, Default, Clone)]
pub struct EditorFrameCounter {
    frame: u64,
}

impl EditorFrameCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameIndexProvider for EditorFrameCounter {
    fn begin_frame(&mut self, cameras: &[Camera]) -> u64 {
        if cameras
            .iter()
            .any(|camera| camera.camera_type != CameraType::Preview)
        {
            self.frame += 1;
        }
        self.frame
    }

    fn current(&self) -> u64 {
        self.frame
    }
}

/// Reads the frame index from the engine's clock
pub struct EngineFrameCounter {
    source: Box<dyn FnMut() -> u64>,
    frame: u64,
}

impl EngineFrameCounter {
    pub fn new(source: impl FnMut() -> u64 + 'static) -> Self {
        Self {
            source: Box::new(source),
            frame: 0,
        }
    }
}

impl FrameIndexProvider for EngineFrameCounter {
    fn begin_frame(&mut self, _cameras: &[Camera]) -> u64 {
        self.frame = (self.source)();
        self.frame
    }

    fn current(&self) -> u64 {
        self.frame
    }
}

impl std::fmt::Debug for EngineFrameCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineFrameCounter")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}
