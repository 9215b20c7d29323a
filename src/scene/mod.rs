//! Camera and culling data consumed by the frame driver

mod camera;
mod culling;

pub use camera::*;
pub use culling::*;
