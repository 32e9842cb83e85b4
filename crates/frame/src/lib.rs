//! Frame Loop Controller: one explicit per-session context driven by `tick()`.
//!
//! # Invariants
//! - Everything the loop mutates lives in `FrameContext` or the scene graph
//!   passed to `tick`; there is no hidden global state.
//! - Background loads are joined only at the start of a tick, so the scene
//!   graph has a single writer per tick.
//! - Each tick renders exactly once.
//! - Picking is a linear scan over every visible mesh; a highlight is never
//!   cleared by the loop.

pub mod builder;
pub mod config;
pub mod context;
pub mod frame_loop;
pub mod params;

pub use builder::{TrackedObjects, build_tutorial_scene};
pub use config::{AssetPaths, ConfigError, SceneConfig, WindowConfig};
pub use context::{Diagnostic, FrameContext, FrameSummary, LoadPurpose};
pub use frame_loop::{BOUNCE_AMPLITUDE, bounce_offset, tick};
pub use params::{NUMERIC_PARAMS, ParamError, ParamSpec, ParamValue, SceneParams};

pub fn crate_info() -> &'static str {
    "tinyscene-frame v0.1.0"
}
