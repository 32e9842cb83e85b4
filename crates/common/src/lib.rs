//! Shared types for the tinyscene workspace.
//!
//! # Invariants
//! - `ObjectId` values are never reused within a session.
//! - `Transform` rotation is stored as XYZ Euler angles and never wrapped.

mod color;
mod types;

pub use color::{Color, ColorParseError};
pub use types::{ObjectId, Transform};

pub fn crate_info() -> &'static str {
    "tinyscene-common v0.1.0"
}
