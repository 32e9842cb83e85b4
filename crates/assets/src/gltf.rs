//! Minimal glTF 2.0 importer for static triangle meshes.
//!
//! Reads `.glb` containers and `.gltf` JSON with external `.bin` buffers.
//! Only float vertex attributes and u8/u16/u32 indices are supported.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::mesh::MeshData;
use crate::{AssetError, read_file};

const GLB_MAGIC: u32 = 0x4654_6c67;
const CHUNK_JSON: u32 = 0x4e4f_534a;
const CHUNK_BIN: u32 = 0x004e_4942;

const COMPONENT_U8: u32 = 5121;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;

const MODE_TRIANGLES: u32 = 4;

/// One drawable piece of an imported model.
#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub mesh: MeshData,
    pub base_color: [f32; 4],
}

/// An imported model: a flat list of primitives sharing the model's root.
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.mesh.vertex_count()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default)]
    buffers: Vec<Buffer>,
    #[serde(default)]
    buffer_views: Vec<BufferView>,
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    meshes: Vec<Mesh>,
    #[serde(default)]
    materials: Vec<Material>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    byte_length: usize,
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Mesh {
    name: Option<String>,
    primitives: Vec<Primitive>,
}

#[derive(Debug, Deserialize)]
struct Primitive {
    attributes: BTreeMap<String, usize>,
    indices: Option<usize>,
    material: Option<usize>,
    mode: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Material {
    pbr_metallic_roughness: Option<Pbr>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pbr {
    base_color_factor: Option<[f32; 4]>,
}

/// Import a `.glb` or `.gltf` file, dispatching on the extension.
pub fn import_model(path: impl AsRef<Path>) -> Result<ModelData, AssetError> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let model = match extension.as_deref() {
        Some("glb") => parse_glb(&name, &bytes)?,
        Some("gltf") => {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            parse_gltf(&name, &bytes, |uri| read_file(&base_dir.join(uri)))?
        }
        other => {
            return Err(AssetError::Unsupported(format!(
                "model extension {other:?}"
            )));
        }
    };
    tracing::debug!(
        path = %path.display(),
        primitives = model.primitives.len(),
        triangles = model.triangle_count(),
        "model imported"
    );
    Ok(model)
}

/// Parse a binary glTF container.
pub fn parse_glb(name: &str, bytes: &[u8]) -> Result<ModelData, AssetError> {
    let header = |at: usize| read_u32(bytes, at);
    if header(0)? != GLB_MAGIC {
        return Err(AssetError::GltfParse("missing glTF magic".into()));
    }
    if header(4)? != 2 {
        return Err(AssetError::Unsupported(format!(
            "glTF container version {}",
            header(4)?
        )));
    }
    let total = (header(8)? as usize).min(bytes.len());

    let mut json: Option<&[u8]> = None;
    let mut bin: Option<&[u8]> = None;
    let mut at = 12;
    while at + 8 <= total {
        let len = read_u32(bytes, at)? as usize;
        let kind = read_u32(bytes, at + 4)?;
        let start = at + 8;
        let chunk = bytes
            .get(start..start + len)
            .ok_or_else(|| AssetError::GltfParse("chunk runs past end of file".into()))?;
        match kind {
            CHUNK_JSON => json = Some(chunk),
            CHUNK_BIN => bin = Some(chunk),
            _ => {}
        }
        at = start + len;
    }

    let json = json.ok_or_else(|| AssetError::GltfParse("no JSON chunk".into()))?;
    let doc: Document = serde_json::from_slice(json)?;
    let buffers = resolve_buffers(&doc, bin, |uri| {
        Err(AssetError::Unsupported(format!(
            "external buffer {uri:?} inside a .glb"
        )))
    })?;
    build_model(name, &doc, &buffers)
}

/// Parse glTF JSON, resolving external buffers through `resolve`.
pub fn parse_gltf<F>(name: &str, json: &[u8], resolve: F) -> Result<ModelData, AssetError>
where
    F: FnMut(&str) -> Result<Vec<u8>, AssetError>,
{
    let doc: Document = serde_json::from_slice(json)?;
    let buffers = resolve_buffers(&doc, None, resolve)?;
    build_model(name, &doc, &buffers)
}

/// Buffer 0 without a uri is the embedded binary chunk of a `.glb`.
fn resolve_buffers<F>(
    doc: &Document,
    embedded: Option<&[u8]>,
    mut resolve: F,
) -> Result<Vec<Vec<u8>>, AssetError>
where
    F: FnMut(&str) -> Result<Vec<u8>, AssetError>,
{
    let mut buffers = Vec::with_capacity(doc.buffers.len());
    for (i, buffer) in doc.buffers.iter().enumerate() {
        let data = match (buffer.uri.as_deref(), embedded) {
            (Some(uri), _) if uri.starts_with("data:") => {
                return Err(AssetError::Unsupported("data URI buffers".into()));
            }
            (Some(uri), _) => resolve(uri)?,
            (None, Some(bin)) if i == 0 => bin.to_vec(),
            (None, _) => {
                return Err(AssetError::GltfParse(format!(
                    "buffer {i} has no uri and no embedded chunk"
                )));
            }
        };
        buffers.push(data);
    }
    Ok(buffers)
}

fn build_model(name: &str, doc: &Document, buffers: &[Vec<u8>]) -> Result<ModelData, AssetError> {
    for (i, (declared, data)) in doc.buffers.iter().zip(buffers).enumerate() {
        if data.len() < declared.byte_length {
            return Err(AssetError::GltfParse(format!(
                "buffer {i} holds {} bytes, declared {}",
                data.len(),
                declared.byte_length
            )));
        }
    }

    let mut primitives = Vec::new();
    for (mesh_index, mesh) in doc.meshes.iter().enumerate() {
        let mesh_name = mesh
            .name
            .clone()
            .unwrap_or_else(|| format!("{name}_{mesh_index}"));
        for (prim_index, prim) in mesh.primitives.iter().enumerate() {
            let mode = prim.mode.unwrap_or(MODE_TRIANGLES);
            if mode != MODE_TRIANGLES {
                return Err(AssetError::Unsupported(format!(
                    "primitive mode {mode} in mesh {mesh_name}"
                )));
            }
            let position = *prim
                .attributes
                .get("POSITION")
                .ok_or_else(|| AssetError::GltfParse(format!("{mesh_name}: no POSITION")))?;
            let positions: Vec<[f32; 3]> = read_floats(doc, buffers, position, 3)?
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
            let vertex_count = positions.len();

            let uvs: Vec<[f32; 2]> = match prim.attributes.get("TEXCOORD_0") {
                Some(&a) => read_floats(doc, buffers, a, 2)?
                    .chunks_exact(2)
                    .map(|c| [c[0], c[1]])
                    .collect(),
                None => vec![[0.0, 0.0]; vertex_count],
            };

            let indices = match prim.indices {
                Some(a) => read_indices(doc, buffers, a)?,
                None => (0..vertex_count as u32).collect(),
            };
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(AssetError::GltfParse(format!(
                    "{mesh_name}_{prim_index}: index {bad} out of range for {vertex_count} vertices"
                )));
            }

            let mut mesh_data = MeshData::new(
                format!("{mesh_name}_{prim_index}"),
                positions,
                Vec::new(),
                uvs,
                indices,
            );
            match prim.attributes.get("NORMAL") {
                Some(&a) => {
                    mesh_data.normals = read_floats(doc, buffers, a, 3)?
                        .chunks_exact(3)
                        .map(|c| [c[0], c[1], c[2]])
                        .collect();
                }
                None => mesh_data.compute_normals(),
            }
            if !mesh_data.is_valid() {
                return Err(AssetError::GltfParse(format!(
                    "{}: attribute counts or indices out of range",
                    mesh_data.name
                )));
            }

            let base_color = prim
                .material
                .and_then(|m| doc.materials.get(m))
                .and_then(|m| m.pbr_metallic_roughness.as_ref())
                .and_then(|pbr| pbr.base_color_factor)
                .unwrap_or([0.8, 0.8, 0.8, 1.0]);

            primitives.push(ModelPrimitive {
                mesh: mesh_data,
                base_color,
            });
        }
    }

    if primitives.is_empty() {
        return Err(AssetError::GltfParse("model contains no meshes".into()));
    }
    Ok(ModelData {
        name: name.to_string(),
        primitives,
    })
}

fn components(kind: &str) -> Result<usize, AssetError> {
    match kind {
        "SCALAR" => Ok(1),
        "VEC2" => Ok(2),
        "VEC3" => Ok(3),
        "VEC4" => Ok(4),
        other => Err(AssetError::Unsupported(format!("accessor type {other}"))),
    }
}

fn component_size(component_type: u32) -> Result<usize, AssetError> {
    match component_type {
        COMPONENT_U8 => Ok(1),
        COMPONENT_U16 => Ok(2),
        COMPONENT_U32 | COMPONENT_F32 => Ok(4),
        other => Err(AssetError::Unsupported(format!("component type {other}"))),
    }
}

/// Byte slices for each element of an accessor, honoring the view stride.
fn accessor_elements<'a>(
    doc: &Document,
    buffers: &'a [Vec<u8>],
    index: usize,
) -> Result<(u32, Vec<&'a [u8]>), AssetError> {
    let accessor = doc
        .accessors
        .get(index)
        .ok_or_else(|| AssetError::GltfParse(format!("accessor {index} missing")))?;
    let view_index = accessor
        .buffer_view
        .ok_or_else(|| AssetError::Unsupported("sparse or empty accessors".into()))?;
    let view = doc
        .buffer_views
        .get(view_index)
        .ok_or_else(|| AssetError::GltfParse(format!("bufferView {view_index} missing")))?;
    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| AssetError::GltfParse(format!("buffer {} missing", view.buffer)))?;

    let element = components(&accessor.kind)? * component_size(accessor.component_type)?;
    let stride = view.byte_stride.unwrap_or(element);
    let view_end = view.byte_offset + view.byte_length;

    let mut elements = Vec::with_capacity(accessor.count);
    for i in 0..accessor.count {
        let start = view.byte_offset + accessor.byte_offset + i * stride;
        let end = start + element;
        if end > view_end || end > buffer.len() {
            return Err(AssetError::GltfParse(format!(
                "accessor {index} element {i} out of bounds"
            )));
        }
        elements.push(&buffer[start..end]);
    }
    Ok((accessor.component_type, elements))
}

fn read_floats(
    doc: &Document,
    buffers: &[Vec<u8>],
    index: usize,
    expected_components: usize,
) -> Result<Vec<f32>, AssetError> {
    let (component_type, elements) = accessor_elements(doc, buffers, index)?;
    if component_type != COMPONENT_F32 {
        return Err(AssetError::Unsupported(format!(
            "non-float vertex attribute (accessor {index})"
        )));
    }
    let mut out = Vec::with_capacity(elements.len() * expected_components);
    for element in elements {
        if element.len() != expected_components * 4 {
            return Err(AssetError::GltfParse(format!(
                "accessor {index} has wrong component count"
            )));
        }
        out.extend(
            element
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
    }
    Ok(out)
}

fn read_indices(doc: &Document, buffers: &[Vec<u8>], index: usize) -> Result<Vec<u32>, AssetError> {
    let (component_type, elements) = accessor_elements(doc, buffers, index)?;
    elements
        .into_iter()
        .map(|b| match component_type {
            COMPONENT_U8 => Ok(b[0] as u32),
            COMPONENT_U16 => Ok(u16::from_le_bytes([b[0], b[1]]) as u32),
            COMPONENT_U32 => Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            other => Err(AssetError::Unsupported(format!("index component type {other}"))),
        })
        .collect()
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, AssetError> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| AssetError::GltfParse("truncated glb header".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One triangle: 3 float3 positions followed by 3 u16 indices (+2 pad bytes).
    fn triangle_bin() -> Vec<u8> {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        bin
    }

    fn triangle_json(uri: Option<&str>) -> String {
        let buffer = match uri {
            Some(u) => format!(r#"{{"byteLength":44,"uri":"{u}"}}"#),
            None => r#"{"byteLength":44}"#.to_string(),
        };
        format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "buffers": [{buffer}],
  "bufferViews": [
    {{"buffer":0,"byteOffset":0,"byteLength":36}},
    {{"buffer":0,"byteOffset":36,"byteLength":6}}
  ],
  "accessors": [
    {{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3"}},
    {{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}
  ],
  "materials": [{{"pbrMetallicRoughness":{{"baseColorFactor":[1.0,0.5,0.25,1.0]}}}}],
  "meshes": [{{"name":"tri","primitives":[{{"attributes":{{"POSITION":0}},"indices":1,"material":0}}]}}]
}}"#
        )
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out
    }

    #[test]
    fn parse_glb_triangle() {
        let bytes = glb(&triangle_json(None), &triangle_bin());
        let model = parse_glb("tri", &bytes).unwrap();
        assert_eq!(model.primitives.len(), 1);
        let prim = &model.primitives[0];
        assert_eq!(prim.mesh.indices, vec![0, 1, 2]);
        assert_eq!(prim.mesh.positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(prim.base_color, [1.0, 0.5, 0.25, 1.0]);
        // Normals were computed from the face.
        assert_eq!(prim.mesh.normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn import_gltf_with_external_buffer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.bin"), triangle_bin()).unwrap();
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, triangle_json(Some("tri.bin"))).unwrap();

        let model = import_model(&path).unwrap();
        assert_eq!(model.name, "tri");
        assert_eq!(model.triangle_count(), 1);
        assert_eq!(model.vertex_count(), 3);
    }

    #[test]
    fn import_glb_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monkey.glb");
        std::fs::write(&path, glb(&triangle_json(None), &triangle_bin())).unwrap();
        let model = import_model(&path).unwrap();
        assert_eq!(model.name, "monkey");
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = glb(&triangle_json(None), &triangle_bin());
        bytes[0] = 0;
        assert!(matches!(
            parse_glb("x", &bytes),
            Err(AssetError::GltfParse(_))
        ));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let bytes = glb(&triangle_json(None), &triangle_bin()[..20]);
        assert!(parse_glb("x", &bytes).is_err());
    }

    #[test]
    fn out_of_range_index_is_rejected_without_normals() {
        let mut bin = triangle_bin();
        // Third index (u16 at byte 40) points past the three vertices.
        bin[40..42].copy_from_slice(&9u16.to_le_bytes());
        let bytes = glb(&triangle_json(None), &bin);
        assert!(matches!(
            parse_glb("x", &bytes),
            Err(AssetError::GltfParse(msg)) if msg.contains("index 9")
        ));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.obj");
        std::fs::write(&path, b"v 0 0 0").unwrap();
        assert!(matches!(
            import_model(&path),
            Err(AssetError::Unsupported(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        assert!(matches!(
            import_model("/nope/monkey.glb"),
            Err(AssetError::Read { .. })
        ));
    }
}
