//! Virtual resources for the render graph

use crate::backend::traits::GpuTexture;
use crate::backend::types::*;

/// Opaque reference to a logical texture.
///
/// Valid only inside the recording scope that created it; the graph rejects
/// handles carried over from an earlier scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle {
    pub(crate) scope: u64,
    pub(crate) index: u32,
}

impl TextureHandle {
    /// Placeholder for unused fixed-size slots; no scope issues it
    pub(crate) const NULL: TextureHandle = TextureHandle {
        scope: 0,
        index: u32::MAX,
    };

    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }
}

/// Reference to a visibility list created in a recording scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisibilityListHandle {
    pub(crate) scope: u64,
    pub(crate) index: u32,
}

/// Whether a texture binds as a color or a depth attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Color,
    Depth,
}

impl TextureKind {
    pub fn of(desc: &TextureDescriptor) -> Self {
        if desc.is_depth() {
            TextureKind::Depth
        } else {
            TextureKind::Color
        }
    }
}

/// Where the backing memory of a virtual texture comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureOrigin {
    /// Allocated from the transient pool for the lifetime of one execution
    Transient,
    /// Owned outside the graph (camera target, backbuffer)
    Imported(GpuTexture),
}

/// Virtual texture resource in the render graph
#[derive(Debug, Clone)]
pub struct VirtualTexture {
    pub handle: TextureHandle,
    pub desc: TextureDescriptor,
    pub kind: TextureKind,
    pub origin: TextureOrigin,
}

impl VirtualTexture {
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn is_imported(&self) -> bool {
        matches!(self.origin, TextureOrigin::Imported(_))
    }
}

/// Handle registry of one recording scope
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    scope: u64,
    textures: Vec<VirtualTexture>,
}

impl ResourceRegistry {
    pub fn new(scope: u64) -> Self {
        Self {
            scope,
            textures: Vec::new(),
        }
    }

    pub fn scope(&self) -> u64 {
        self.scope
    }

    /// Register a texture; the registry keeps its own copy of `desc`
    pub fn create(&mut self, desc: TextureDescriptor, origin: TextureOrigin) -> TextureHandle {
        let handle = TextureHandle {
            scope: self.scope,
            index: self.textures.len() as u32,
        };
        self.textures.push(VirtualTexture {
            handle,
            kind: TextureKind::of(&desc),
            desc,
            origin,
        });
        handle
    }

    /// Look up a handle, rejecting ones minted by another scope
    pub fn get(&self, handle: TextureHandle) -> Option<&VirtualTexture> {
        if handle.scope != self.scope {
            return None;
        }
        self.textures.get(handle.index())
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualTexture> {
        self.textures.iter()
    }
}
