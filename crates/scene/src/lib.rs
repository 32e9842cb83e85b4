//! Scene graph: renderable nodes, lights, fog, background, camera and picking.
//!
//! # Invariants
//! - Node iteration order is deterministic (BTreeMap keyed by `ObjectId`).
//! - Attaching a model is all-or-nothing: a rejected model leaves the graph untouched.
//! - Picking tests every visible mesh node; there is no spatial index.

mod camera;
mod graph;
mod light;
mod raycast;

pub use camera::OrbitCamera;
pub use graph::{Material, MaterialKind, Node, NodeKind, SceneError, SceneGraph};
pub use light::{AmbientLight, Background, DirectionalLight, Fog, Lights, SpotLight};
pub use raycast::{Hit, Ray, intersect_scene};

pub fn crate_info() -> &'static str {
    "tinyscene-scene v0.1.0"
}
