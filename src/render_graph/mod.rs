//! Render Graph System
//!
//! A declarative system for defining render passes as a directed acyclic graph (DAG).
//! Passes are recorded into a scope against opaque texture handles; closing the
//! scope compiles the graph (dependency edges, pass order, resource lifetimes)
//! and executes it into a command buffer, allocating transient textures from a
//! pool that persists across scopes.

pub mod executor;
pub mod graph;
pub mod pass;
pub mod resource;

pub use executor::*;
pub use graph::*;
pub use pass::*;
pub use resource::*;
