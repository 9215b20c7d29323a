//! Backend abstraction layer
//!
//! Provides the traits a graphics device implements for the render graph and
//! the frame driver, plus the types shared with them.
//!
//! # Available Backends
//!
//! - `dummy` (default feature): in-memory backend, command buffer and render
//!   context that record everything they are asked to do

pub mod traits;
pub mod types;

#[cfg(feature = "dummy")]
pub mod dummy;

pub use traits::*;
pub use types::*;
