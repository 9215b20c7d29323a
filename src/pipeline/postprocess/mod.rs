//! Post-processing
//!
//! Currently a single full-screen composite into the camera target.

mod final_pass;

pub use final_pass::*;
