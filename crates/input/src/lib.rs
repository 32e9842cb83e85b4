//! Host input mapped to a small action vocabulary.
//!
//! # Invariants
//! - Hosts (desktop window, headless CLI) produce the same `Action`s; the frame
//!   loop never sees raw window events.
//! - Pointer positions are stored in normalized device coordinates; only the
//!   most recent one is kept.

pub mod action;
pub mod pointer;

pub use action::Action;
pub use pointer::{PointerPosition, pointer_to_ndc};

pub fn crate_info() -> &'static str {
    "tinyscene-input v0.1.0"
}
