//! Rendering Adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - A renderer reads the scene graph and camera; it never mutates them.
//! - One `render` call produces exactly one frame.
//!
//! The GPU backend lives in `tinyscene-render-wgpu`; `DebugTextRenderer`
//! stands in for it in the headless runner and in tests.

mod renderer;

pub use renderer::{DebugTextRenderer, Renderer};

pub fn crate_info() -> &'static str {
    "tinyscene-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
