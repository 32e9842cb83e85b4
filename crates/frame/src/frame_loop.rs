use tinyscene_render::Renderer;
use tinyscene_scene::{OrbitCamera, Ray, SceneGraph, intersect_scene};

use crate::context::FrameContext;

/// Peak height of the sphere bounce.
pub const BOUNCE_AMPLITUDE: f32 = 10.0;

/// Vertical bounce for a phase value: in `[0, BOUNCE_AMPLITUDE]`, period 2π.
pub fn bounce_offset(phase: f32) -> f32 {
    BOUNCE_AMPLITUDE * phase.sin().abs()
}

/// Run one tick of the frame loop and render the result.
///
/// Order: join finished loads, advance accumulators, animate, sync
/// parameters onto the scene, pick, jitter the plane, render once.
pub fn tick<R: Renderer>(
    ctx: &mut FrameContext,
    scene: &mut SceneGraph,
    camera: &OrbitCamera,
    renderer: &mut R,
) -> R::Output {
    let _span = tracing::debug_span!("tick", n = ctx.ticks()).entered();

    ctx.join_loads(scene);
    ctx.advance();
    animate(ctx, scene);
    sync_params(ctx, scene);
    pick(ctx, scene, camera);
    poke_vertices(ctx, scene);

    let output = renderer.render(scene, camera);
    ctx.finish_tick();
    output
}

fn animate(ctx: &FrameContext, scene: &mut SceneGraph) {
    let tracked = *ctx.tracked();
    if let Some(cube) = scene.get_mut(tracked.cube) {
        cube.transform.rotation.x = ctx.rotation();
        cube.transform.rotation.y = ctx.rotation();
    }
    if let Some(sphere) = scene.get_mut(tracked.sphere) {
        sphere.transform.position.y = tracked.sphere_base_y + bounce_offset(ctx.phase());
    }
}

/// Push GUI parameters into the scene. Light settings and wireframe are
/// written every tick; the sphere base color follows the panel's on-change
/// edge so a hover highlight is not overwritten.
fn sync_params(ctx: &mut FrameContext, scene: &mut SceneGraph) {
    let params = ctx.params;
    if let Some(spot) = scene.lights_mut().spot.as_mut() {
        spot.angle = params.angle;
        spot.penumbra = params.penumbra;
        spot.intensity = params.intensity;
    }

    let sphere = ctx.tracked().sphere;
    if let Some(node) = scene.get_mut(sphere) {
        node.material.wireframe = params.wireframe;
    }
    if let Some(color) = ctx.take_sphere_color_change() {
        scene.set_color(sphere, color);
    }
}

fn pick(ctx: &FrameContext, scene: &mut SceneGraph, camera: &OrbitCamera) {
    let Some(ndc) = ctx.pointer() else {
        return;
    };
    let ray = Ray::from_camera(ndc, camera);
    let hits = intersect_scene(scene, &ray);
    let tracked = ctx.tracked();

    for hit in &hits {
        if hit.object == tracked.sphere {
            scene.set_color(hit.object, ctx.params.highlight_color);
        }
        if hit.object == tracked.textured_box {
            if let Some(node) = scene.get_mut(hit.object) {
                node.transform.rotation.x = ctx.rotation();
                node.transform.rotation.y = ctx.rotation();
            }
        }
    }
    if !hits.is_empty() {
        tracing::trace!(hits = hits.len(), "pointer ray hit");
    }
}

fn poke_vertices(ctx: &mut FrameContext, scene: &mut SceneGraph) {
    let Some(mesh_id) = scene
        .get(ctx.tracked().jitter_plane)
        .and_then(|node| node.mesh_id())
    else {
        return;
    };
    let values = [
        ctx.next_random(),
        ctx.next_random(),
        ctx.next_random(),
        ctx.next_random(),
    ];
    let Some(mesh) = scene.assets_mut().mesh_mut(mesh_id) else {
        return;
    };
    if let Some(first) = mesh.positions.first_mut() {
        *first = [10.0 * values[0], 10.0 * values[1], 10.0 * values[2]];
    }
    if let Some(last) = mesh.positions.last_mut() {
        last[2] = 10.0 * values[3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_tutorial_scene;
    use crate::context::LoadPurpose;
    use crate::params::SceneParams;
    use glam::{Vec2, Vec3};
    use std::f32::consts::{PI, TAU};
    use tinyscene_assets::LoadRequest;
    use tinyscene_common::{Color, ObjectId};
    use tinyscene_input::Action;
    use tinyscene_render::DebugTextRenderer;

    /// Counts frames and remembers the scene size it was handed.
    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        last_nodes: usize,
    }

    impl Renderer for CountingRenderer {
        type Output = usize;

        fn render(&mut self, scene: &SceneGraph, _camera: &OrbitCamera) -> usize {
            self.frames += 1;
            self.last_nodes = scene.node_count();
            self.frames
        }
    }

    struct Session {
        scene: SceneGraph,
        ctx: FrameContext,
        camera: OrbitCamera,
        renderer: CountingRenderer,
    }

    impl Session {
        fn new() -> Self {
            let mut scene = SceneGraph::new();
            let params = SceneParams::default();
            let tracked = build_tutorial_scene(&mut scene, &params).unwrap();
            let mut camera = OrbitCamera::default();
            camera.set_viewport(1280, 720);
            Self {
                scene,
                ctx: FrameContext::new(tracked, params, 7),
                camera,
                renderer: CountingRenderer::default(),
            }
        }

        fn tick(&mut self) -> usize {
            tick(&mut self.ctx, &mut self.scene, &self.camera, &mut self.renderer)
        }

        fn point_at(&mut self, id: ObjectId) {
            let world = self.scene.world_matrix(id).unwrap().transform_point3(Vec3::ZERO);
            let ndc = self.camera.view_projection().project_point3(world);
            self.ctx
                .apply(Action::PointerMoved(Vec2::new(ndc.x, ndc.y)), &mut self.camera);
        }

        fn color(&self, id: ObjectId) -> Color {
            self.scene.get(id).unwrap().material.color
        }
    }

    #[test]
    fn bounce_stays_in_range() {
        let mut phase = -20.0;
        while phase < 20.0 {
            let b = bounce_offset(phase);
            assert!((0.0..=BOUNCE_AMPLITUDE).contains(&b), "phase {phase}: {b}");
            phase += 0.037;
        }
        assert_eq!(bounce_offset(0.0), 0.0);
        assert!((bounce_offset(PI / 2.0) - BOUNCE_AMPLITUDE).abs() < 1e-5);
    }

    #[test]
    fn bounce_is_periodic_and_continuous() {
        for i in 0..200 {
            let p = i as f32 * 0.1;
            assert!((bounce_offset(p) - bounce_offset(p + TAU)).abs() < 1e-3);
            let step = (bounce_offset(p + 1e-3) - bounce_offset(p)).abs();
            assert!(step <= BOUNCE_AMPLITUDE * 1e-3 + 1e-5);
        }
    }

    #[test]
    fn each_tick_renders_once() {
        let mut s = Session::new();
        for n in 1..=5 {
            assert_eq!(s.tick(), n);
        }
        assert_eq!(s.ctx.ticks(), 5);
    }

    #[test]
    fn rotation_strictly_increases() {
        let mut s = Session::new();
        let cube = s.ctx.tracked().cube;
        let mut last = s.scene.get(cube).unwrap().transform.rotation.x;
        for _ in 0..1000 {
            s.tick();
            let r = s.scene.get(cube).unwrap().transform.rotation.x;
            assert!(r > last);
            last = r;
        }
        assert!(s.ctx.rotation() > TAU, "rotation does not wrap");
    }

    #[test]
    fn phase_advances_by_bounce_speed() {
        let mut s = Session::new();
        s.ctx.params.bounce_speed = 0.05;
        s.tick();
        s.tick();
        assert!((s.ctx.phase() - 0.1).abs() < 1e-6);
        let sphere = s.scene.get(s.ctx.tracked().sphere).unwrap();
        let expected = s.ctx.tracked().sphere_base_y + bounce_offset(0.1);
        assert!((sphere.transform.position.y - expected).abs() < 1e-5);
    }

    #[test]
    fn hovering_sphere_highlights_within_one_tick() {
        let mut s = Session::new();
        let sphere = s.ctx.tracked().sphere;
        s.point_at(sphere);
        s.tick();
        assert_eq!(s.color(sphere), s.ctx.params.highlight_color);
    }

    #[test]
    fn highlight_is_not_cleared_when_pointer_leaves() {
        let mut s = Session::new();
        let sphere = s.ctx.tracked().sphere;
        s.point_at(sphere);
        s.tick();

        s.ctx
            .apply(Action::PointerMoved(Vec2::new(0.99, -0.99)), &mut s.camera);
        for _ in 0..3 {
            s.tick();
        }
        assert_eq!(s.color(sphere), s.ctx.params.highlight_color);
    }

    #[test]
    fn pointer_elsewhere_leaves_color_alone() {
        let mut s = Session::new();
        let sphere = s.ctx.tracked().sphere;
        let before = s.color(sphere);
        s.ctx
            .apply(Action::PointerMoved(Vec2::new(0.99, -0.99)), &mut s.camera);
        s.tick();
        assert_eq!(s.color(sphere), before);
    }

    #[test]
    fn no_pointer_means_no_picking() {
        let mut s = Session::new();
        let sphere = s.ctx.tracked().sphere;
        s.tick();
        assert_eq!(s.color(sphere), SceneParams::default().sphere_color);
    }

    #[test]
    fn hovering_box_copies_rotation() {
        let mut s = Session::new();
        let textured_box = s.ctx.tracked().textured_box;
        s.point_at(textured_box);
        s.tick();
        let r = s.scene.get(textured_box).unwrap().transform.rotation;
        assert_eq!(r.x, s.ctx.rotation());
        assert_eq!(r.y, s.ctx.rotation());
    }

    #[test]
    fn gui_changes_apply_next_tick() {
        let mut s = Session::new();
        s.ctx.params.angle = 0.7;
        s.ctx.params.penumbra = 0.4;
        s.ctx.params.intensity = 800.0;
        s.ctx.params.wireframe = true;
        s.ctx.params.sphere_color = Color::from_hex(0x00ffff);
        s.tick();

        let spot = s.scene.lights().spot.unwrap();
        assert_eq!((spot.angle, spot.penumbra, spot.intensity), (0.7, 0.4, 800.0));
        let sphere = s.scene.get(s.ctx.tracked().sphere).unwrap();
        assert!(sphere.material.wireframe);
        assert_eq!(sphere.material.color.to_hex(), 0x00ffff);
    }

    #[test]
    fn new_sphere_color_replaces_highlight() {
        let mut s = Session::new();
        let sphere = s.ctx.tracked().sphere;
        s.point_at(sphere);
        s.tick();
        s.ctx
            .apply(Action::PointerMoved(Vec2::new(0.99, -0.99)), &mut s.camera);
        s.ctx.params.sphere_color = Color::from_hex(0x00ff00);
        s.tick();
        assert_eq!(s.color(sphere).to_hex(), 0x00ff00);
    }

    #[test]
    fn failed_load_leaves_graph_unchanged_with_one_diagnostic() {
        let mut s = Session::new();
        let nodes = s.scene.node_count();
        let assets = s.scene.assets().len();

        s.ctx.request_load(
            LoadPurpose::Model {
                offset: Vec3::new(-12.0, 4.0, 10.0),
            },
            LoadRequest::Model("/missing/monkey.glb".into()),
        );
        s.ctx.wait_for_loads();
        s.tick();
        s.tick();

        assert_eq!(s.ctx.diagnostics().len(), 1);
        assert_eq!(s.ctx.diagnostics()[0].tick, 0);
        assert_eq!(s.scene.node_count(), nodes);
        assert_eq!(s.scene.assets().len(), assets);
        assert!(s.ctx.tracked().model.is_none());
        assert_eq!(s.ctx.pending_loads(), 0);
        assert_eq!(s.renderer.last_nodes, nodes);
    }

    #[test]
    fn model_load_attaches_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let mut bin = Vec::new();
        for c in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&c.to_le_bytes());
        }
        std::fs::write(dir.path().join("tri.bin"), &bin).unwrap();
        let gltf = r#"{
  "asset": {"version": "2.0"},
  "buffers": [{"byteLength": 36, "uri": "tri.bin"}],
  "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
  "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
  "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}}]}]
}"#;
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, gltf).unwrap();

        let mut s = Session::new();
        let nodes = s.scene.node_count();
        let offset = Vec3::new(-12.0, 4.0, 10.0);
        s.ctx
            .request_load(LoadPurpose::Model { offset }, LoadRequest::Model(path));
        s.ctx.wait_for_loads();
        s.tick();

        assert!(s.ctx.diagnostics().is_empty());
        let root = s.ctx.tracked().model.unwrap();
        assert_eq!(s.scene.get(root).unwrap().transform.position, offset);
        assert_eq!(s.scene.node_count(), nodes + 2);
    }

    #[test]
    fn model_with_bad_index_reports_one_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let mut bin = Vec::new();
        for c in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&c.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 1, 9, 0]);
        std::fs::write(dir.path().join("tri.bin"), &bin).unwrap();
        let gltf = r#"{
  "asset": {"version": "2.0"},
  "buffers": [{"byteLength": 40, "uri": "tri.bin"}],
  "bufferViews": [
    {"buffer": 0, "byteOffset": 0, "byteLength": 36},
    {"buffer": 0, "byteOffset": 36, "byteLength": 3}
  ],
  "accessors": [
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
    {"bufferView": 1, "componentType": 5121, "count": 3, "type": "SCALAR"}
  ],
  "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}]
}"#;
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, gltf).unwrap();

        let mut s = Session::new();
        let nodes = s.scene.node_count();
        let assets = s.scene.assets().len();
        s.ctx.request_load(
            LoadPurpose::Model {
                offset: Vec3::new(-12.0, 4.0, 10.0),
            },
            LoadRequest::Model(path),
        );
        s.ctx.wait_for_loads();
        s.tick();
        s.tick();

        assert_eq!(s.ctx.diagnostics().len(), 1);
        assert_eq!(s.scene.node_count(), nodes);
        assert_eq!(s.scene.assets().len(), assets);
        assert!(s.ctx.tracked().model.is_none());
        assert_eq!(s.ctx.pending_loads(), 0);
    }

    #[test]
    fn jitter_plane_is_poked_every_tick() {
        let mut s = Session::new();
        let mesh_id = s
            .scene
            .get(s.ctx.tracked().jitter_plane)
            .and_then(|n| n.mesh_id())
            .unwrap();
        let before = s.scene.assets().get_mesh(mesh_id).unwrap().positions.clone();

        s.tick();
        let mesh = s.scene.assets().get_mesh(mesh_id).unwrap();
        assert_eq!(mesh.revision(), 1);
        assert_ne!(mesh.positions[0], before[0]);
        assert!(mesh.positions[0].iter().all(|v| (0.0..10.0).contains(v)));
        let last = mesh.positions.len() - 1;
        assert_eq!(mesh.positions[last][0], before[last][0]);
        assert_eq!(mesh.positions[1..last], before[1..last]);
    }

    #[test]
    fn same_seed_same_jitter() {
        let mut a = Session::new();
        let mut b = Session::new();
        a.tick();
        b.tick();
        let first = |s: &Session| {
            let id = s.scene.get(s.ctx.tracked().jitter_plane).unwrap().mesh_id().unwrap();
            s.scene.assets().get_mesh(id).unwrap().positions[0]
        };
        assert_eq!(first(&a), first(&b));
    }

    #[test]
    fn debug_renderer_output_reflects_tick() {
        let mut scene = SceneGraph::new();
        let params = SceneParams::default();
        let tracked = build_tutorial_scene(&mut scene, &params).unwrap();
        let mut ctx = FrameContext::new(tracked, params, 0);
        let mut renderer = DebugTextRenderer::new();
        let out = tick(&mut ctx, &mut scene, &OrbitCamera::default(), &mut renderer);
        assert!(out.contains("Frame 0"));
        assert!(out.contains("sphere"));
        assert!(out.contains("Spot: angle=0.200"));
    }
}
