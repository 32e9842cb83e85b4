use std::fmt::Write;

use tinyscene_scene::{Background, NodeKind, OrbitCamera, SceneGraph};

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// `&mut self` lets backends keep GPU caches between frames; the scene and
/// camera are only borrowed.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `scene` as seen from `camera`.
    fn render(&mut self, scene: &SceneGraph, camera: &OrbitCamera) -> Self::Output;
}

/// Produces a human-readable dump of the scene per frame.
///
/// Useful for CLI output, logging, and testing the render interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    frames: u64,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, scene: &SceneGraph, camera: &OrbitCamera) -> String {
        let mut out = String::new();
        let eye = camera.position();
        let _ = writeln!(out, "=== Frame {} ===", self.frames);
        let _ = writeln!(out, "Nodes: {}  Assets: {}", scene.node_count(), scene.assets().len());
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
            eye.x,
            eye.y,
            eye.z,
            camera.target.x,
            camera.target.y,
            camera.target.z,
            camera.fov.to_degrees()
        );
        if let Some(spot) = scene.lights().spot {
            let _ = writeln!(
                out,
                "Spot: angle={:.3} penumbra={:.3} intensity={:.1}",
                spot.angle, spot.penumbra, spot.intensity
            );
        }
        match scene.background() {
            Background::Color(c) => {
                let _ = writeln!(out, "Background: {c}");
            }
            Background::Cubemap(_) => {
                let _ = writeln!(out, "Background: cubemap");
            }
        }

        for (id, node) in scene.nodes() {
            let p = node.transform.position;
            let r = node.transform.rotation;
            let kind = match node.kind {
                NodeKind::Mesh(_) => "mesh",
                NodeKind::Axes(_) => "axes",
                NodeKind::Grid { .. } => "grid",
                NodeKind::Group => "group",
            };
            let _ = writeln!(
                out,
                "  [{}] {:<5} {:<12} pos=({:.2}, {:.2}, {:.2}) rot=({:.3}, {:.3}, {:.3}) color={}{}",
                id.short(),
                kind,
                node.name,
                p.x,
                p.y,
                p.z,
                r.x,
                r.y,
                r.z,
                node.material.color,
                if node.material.wireframe { " wire" } else { "" }
            );
        }

        self.frames += 1;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tinyscene_assets::box_mesh;
    use tinyscene_common::{Color, Transform};
    use tinyscene_scene::Material;

    #[test]
    fn debug_renderer_empty_scene() {
        let scene = SceneGraph::new();
        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&scene, &OrbitCamera::default());

        assert!(output.contains("Frame 0"));
        assert!(output.contains("Nodes: 0"));
        assert!(output.contains("fov=75"));
        assert_eq!(renderer.frames(), 1);
    }

    #[test]
    fn debug_renderer_lists_nodes() {
        let mut scene = SceneGraph::new();
        scene
            .add_mesh(
                "cube",
                box_mesh(1.0, 1.0, 1.0),
                Material::standard(Color::from_hex(0x00ff00)).with_wireframe(true),
                Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
            )
            .unwrap();

        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&scene, &OrbitCamera::default());
        assert!(output.contains("Nodes: 1"));
        assert!(output.contains("cube"));
        assert!(output.contains("pos=(1.00, 2.00, 3.00)"));
        assert!(output.contains("#00ff00 wire"));
    }

    #[test]
    fn frame_counter_advances() {
        let scene = SceneGraph::new();
        let mut renderer = DebugTextRenderer::new();
        renderer.render(&scene, &OrbitCamera::default());
        let second = renderer.render(&scene, &OrbitCamera::default());
        assert!(second.contains("Frame 1"));
    }
}
