//! wgpu render backend for tinyscene.
//!
//! Draws the scene graph with Lambert lighting from ambient, directional and
//! spot lights, a spot-light shadow map, exp² or linear fog, a cubemap
//! skybox, the animated procedural material and line helpers.
//!
//! # Invariants
//! - The renderer never mutates the scene graph or camera.
//! - GPU copies of meshes are refreshed when the mesh revision changes.

mod frame;
mod geometry;
mod gpu;
mod shaders;
mod uniforms;

pub use frame::SurfaceFrame;
pub use gpu::{SHADOW_MAP_SIZE, WgpuRenderer};

pub fn crate_info() -> &'static str {
    "tinyscene-render-wgpu v0.1.0"
}
