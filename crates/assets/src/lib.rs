//! Asset data for the scene: geometry, textures, cubemaps and imported models.
//!
//! The renderer consumes assets by [`AssetId`], never by raw file paths.
//! Textures and cubemaps are content-addressed; meshes get a fresh id on
//! registration because the frame loop edits their vertices in place.
//!
//! Loading from disk happens off the frame loop through [`AssetLoader`];
//! completed loads are collected by the loop at the start of a tick.

mod gltf;
mod loader;
mod mesh;
mod store;
mod texture;

use std::path::PathBuf;

pub use gltf::{ModelData, ModelPrimitive, import_model, parse_glb, parse_gltf};
pub use loader::{AssetLoader, LoadOutcome, LoadRequest, LoadTicket, LoadedAsset};
pub use mesh::{MeshData, box_mesh, plane_mesh, sphere_mesh};
pub use store::{Asset, AssetId, AssetStore};
pub use texture::{CubemapData, TextureData, decode_texture, load_cubemap, load_texture};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("glTF parse error: {0}")]
    GltfParse(String),
    #[error("unsupported asset content: {0}")]
    Unsupported(String),
    #[error("invalid cubemap: {0}")]
    InvalidCubemap(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("load job panicked: {0}")]
    Panicked(String),
}

pub(crate) fn read_file(path: &std::path::Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn crate_info() -> &'static str {
    "tinyscene-assets v0.1.0"
}
