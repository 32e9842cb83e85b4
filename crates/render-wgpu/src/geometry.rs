use bytemuck::{Pod, Zeroable};
use tinyscene_assets::MeshData;
use tinyscene_common::Color;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Interleave mesh attributes for upload.
pub(crate) fn mesh_vertices(mesh: &MeshData) -> Vec<Vertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| Vertex {
            position,
            normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
        })
        .collect()
}

/// Red, green and blue lines along +X, +Y and +Z.
pub(crate) fn axes_lines(size: f32) -> Vec<LineVertex> {
    let mut verts = Vec::with_capacity(6);
    for (axis, color) in [
        ([size, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]),
        ([0.0, size, 0.0], [0.0, 1.0, 0.0, 1.0]),
        ([0.0, 0.0, size], [0.0, 0.0, 1.0, 1.0]),
    ] {
        verts.push(LineVertex {
            position: [0.0; 3],
            color,
        });
        verts.push(LineVertex {
            position: axis,
            color,
        });
    }
    verts
}

/// Square grid of `divisions` cells per side on the XZ plane.
pub(crate) fn grid_lines(size: f32, divisions: u32, color: Color) -> Vec<LineVertex> {
    let divisions = divisions.max(1);
    let color = color.to_rgba();
    let half = size / 2.0;
    let step = size / divisions as f32;
    let mut verts = Vec::with_capacity((divisions as usize + 1) * 4);

    for i in 0..=divisions {
        let offset = -half + i as f32 * step;
        // Lines along X
        verts.push(LineVertex {
            position: [-half, 0.0, offset],
            color,
        });
        verts.push(LineVertex {
            position: [half, 0.0, offset],
            color,
        });
        // Lines along Z
        verts.push(LineVertex {
            position: [offset, 0.0, -half],
            color,
        });
        verts.push(LineVertex {
            position: [offset, 0.0, half],
            color,
        });
    }
    verts
}

/// sRGB-encoded channel to linear, for clear colors on sRGB surfaces.
pub(crate) fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub(crate) fn clear_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: srgb_to_linear(color.r) as f64,
        g: srgb_to_linear(color.g) as f64,
        b: srgb_to_linear(color.b) as f64,
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyscene_assets::{box_mesh, plane_mesh};

    #[test]
    fn vertices_follow_mesh() {
        let mesh = box_mesh(2.0, 2.0, 2.0);
        let verts = mesh_vertices(&mesh);
        assert_eq!(verts.len(), mesh.vertex_count());
        assert_eq!(verts[3].position, mesh.positions[3]);
        assert_eq!(verts[3].uv, mesh.uvs[3]);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn grid_line_count() {
        let lines = grid_lines(30.0, 30, Color::WHITE);
        assert_eq!(lines.len(), 31 * 4);
        assert_eq!(lines[0].position, [-15.0, 0.0, -15.0]);
        assert_eq!(lines.last().unwrap().position, [15.0, 0.0, 15.0]);
    }

    #[test]
    fn axes_are_colored_per_axis() {
        let lines = axes_lines(5.0);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1].position, [5.0, 0.0, 0.0]);
        assert_eq!(lines[1].color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(lines[5].position, [0.0, 0.0, 5.0]);
    }

    #[test]
    fn srgb_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.5) < 0.5);
    }

    #[test]
    fn poked_plane_keeps_vertex_count() {
        let mut mesh = plane_mesh(10.0, 10.0, 10, 10);
        mesh.positions[0] = [1.0, 2.0, 3.0];
        let verts = mesh_vertices(&mesh);
        assert_eq!(verts.len(), 121);
        assert_eq!(verts[0].position, [1.0, 2.0, 3.0]);
    }
}
