use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::mesh::MeshData;
use crate::texture::{CubemapData, TextureData};

/// Handle to an asset held in an [`AssetStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

/// An asset entry in the store.
#[derive(Debug, Clone)]
pub enum Asset {
    Mesh(MeshData),
    Texture(TextureData),
    Cubemap(CubemapData),
}

/// Asset registry shared by the scene graph and the renderer.
///
/// Textures and cubemaps are content-addressed, so registering the same
/// image twice yields the same id. Meshes are salted with a registration
/// counter because their vertex data is mutable.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    assets: BTreeMap<AssetId, Asset>,
    next_id: u64,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh and return its asset ID.
    pub fn register_mesh(&mut self, mesh: MeshData) -> AssetId {
        let mut hasher = Sha256::new();
        hasher.update(b"mesh");
        hasher.update(mesh.name.as_bytes());
        hasher.update(self.next_id.to_le_bytes());
        self.next_id += 1;
        let id = finish(hasher);
        self.assets.insert(id, Asset::Mesh(mesh));
        id
    }

    /// Register a texture and return its content-addressed ID.
    pub fn register_texture(&mut self, texture: TextureData) -> AssetId {
        let mut hasher = Sha256::new();
        hasher.update(b"texture");
        hash_texture(&mut hasher, &texture);
        let id = finish(hasher);
        self.assets.insert(id, Asset::Texture(texture));
        id
    }

    /// Register a cubemap and return its content-addressed ID.
    pub fn register_cubemap(&mut self, cubemap: CubemapData) -> AssetId {
        let mut hasher = Sha256::new();
        hasher.update(b"cubemap");
        for face in &cubemap.faces {
            hash_texture(&mut hasher, face);
        }
        let id = finish(hasher);
        self.assets.insert(id, Asset::Cubemap(cubemap));
        id
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    pub fn get_mesh(&self, id: AssetId) -> Option<&MeshData> {
        match self.assets.get(&id) {
            Some(Asset::Mesh(m)) => Some(m),
            _ => None,
        }
    }

    /// Mutable mesh access. The mesh revision is bumped so the GPU copy
    /// is refreshed on the next frame.
    pub fn mesh_mut(&mut self, id: AssetId) -> Option<&mut MeshData> {
        match self.assets.get_mut(&id) {
            Some(Asset::Mesh(m)) => {
                m.touch();
                Some(m)
            }
            _ => None,
        }
    }

    pub fn get_texture(&self, id: AssetId) -> Option<&TextureData> {
        match self.assets.get(&id) {
            Some(Asset::Texture(t)) => Some(t),
            _ => None,
        }
    }

    pub fn get_cubemap(&self, id: AssetId) -> Option<&CubemapData> {
        match self.assets.get(&id) {
            Some(Asset::Cubemap(c)) => Some(c),
            _ => None,
        }
    }

    /// Iterate meshes in id order.
    pub fn meshes(&self) -> impl Iterator<Item = (AssetId, &MeshData)> {
        self.assets.iter().filter_map(|(id, a)| match a {
            Asset::Mesh(m) => Some((*id, m)),
            _ => None,
        })
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn hash_texture(hasher: &mut Sha256, texture: &TextureData) {
    hasher.update(texture.width.to_le_bytes());
    hasher.update(texture.height.to_le_bytes());
    hasher.update(&texture.rgba);
}

fn finish(hasher: Sha256) -> AssetId {
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    AssetId(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{box_mesh, plane_mesh};

    #[test]
    fn register_mesh() {
        let mut store = AssetStore::new();
        let id = store.register_mesh(box_mesh(1.0, 1.0, 1.0));
        assert!(store.get_mesh(id).is_some());
        assert!(store.get_texture(id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn identical_meshes_get_distinct_ids() {
        let mut store = AssetStore::new();
        let a = store.register_mesh(box_mesh(1.0, 1.0, 1.0));
        let b = store.register_mesh(box_mesh(1.0, 1.0, 1.0));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn textures_are_content_addressed() {
        let mut store = AssetStore::new();
        let a = store.register_texture(TextureData::solid([1, 2, 3, 4]));
        let b = store.register_texture(TextureData::solid([1, 2, 3, 4]));
        let c = store.register_texture(TextureData::solid([9, 9, 9, 9]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn mesh_mut_bumps_revision() {
        let mut store = AssetStore::new();
        let id = store.register_mesh(plane_mesh(1.0, 1.0, 1, 1));
        store.mesh_mut(id).unwrap().positions[0] = [9.0, 9.0, 9.0];
        let mesh = store.get_mesh(id).unwrap();
        assert_eq!(mesh.revision(), 1);
        assert_eq!(mesh.positions[0], [9.0, 9.0, 9.0]);
    }

    #[test]
    fn cubemap_lookup() {
        let mut store = AssetStore::new();
        let faces = (0..6).map(|i| TextureData::solid([i, 0, 0, 255])).collect();
        let cube = CubemapData::from_faces(faces).unwrap();
        let id = store.register_cubemap(cube);
        assert_eq!(store.get_cubemap(id).unwrap().faces.len(), 6);
        assert!(store.get_mesh(id).is_none());
    }
}
