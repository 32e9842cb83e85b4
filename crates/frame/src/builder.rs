use glam::Vec3;
use std::f32::consts::FRAC_PI_2;
use tinyscene_assets::{box_mesh, plane_mesh, sphere_mesh};
use tinyscene_common::{Color, ObjectId, Transform};
use tinyscene_scene::{Background, Fog, Lights, Material, Node, SceneError, SceneGraph, SpotLight};

use crate::params::SceneParams;

/// Ids of the nodes the frame loop animates, syncs or picks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedObjects {
    /// Spins every tick.
    pub cube: ObjectId,
    /// Bounces, follows the color/wireframe params and is highlighted on hover.
    pub sphere: ObjectId,
    /// Height the bounce offset is added to.
    pub sphere_base_y: f32,
    /// Receives the loaded texture; hovering it copies the cube's rotation.
    pub textured_box: ObjectId,
    /// Wireframe plane whose corner vertices are jittered every tick.
    pub jitter_plane: ObjectId,
    pub shader_sphere: ObjectId,
    /// Root of the loaded model, once it arrives.
    pub model: Option<ObjectId>,
}

/// Populate `scene` with the tutorial scene.
pub fn build_tutorial_scene(
    scene: &mut SceneGraph,
    params: &SceneParams,
) -> Result<TrackedObjects, SceneError> {
    let cube = scene.add_mesh(
        "cube",
        box_mesh(1.0, 1.0, 1.0),
        Material::basic(Color::from_hex(0x00ff00)),
        Transform::default(),
    )?;

    let ground = scene.add_mesh(
        "ground",
        plane_mesh(30.0, 30.0, 1, 1),
        Material::standard(Color::WHITE),
        Transform::default().with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
    )?;
    if let Some(node) = scene.get_mut(ground) {
        node.receive_shadow = true;
    }

    scene.add(Node::grid(30.0, 30));
    scene.add(Node::axes(5.0));

    let sphere_base_y = 10.0;
    let sphere = scene.add_mesh(
        "sphere",
        sphere_mesh(4.0, 50, 50),
        Material::standard(params.sphere_color).with_wireframe(params.wireframe),
        Transform::from_position(Vec3::new(-10.0, sphere_base_y, 0.0)),
    )?;
    if let Some(node) = scene.get_mut(sphere) {
        node.cast_shadow = true;
    }

    let textured_box = scene.add_mesh(
        "theBox",
        box_mesh(4.0, 4.0, 4.0),
        Material::basic(Color::WHITE),
        Transform::from_position(Vec3::new(0.0, 15.0, 10.0)),
    )?;

    let jitter_plane = scene.add_mesh(
        "jitter-plane",
        plane_mesh(10.0, 10.0, 10, 10),
        Material::basic(Color::WHITE).with_wireframe(true),
        Transform::from_position(Vec3::new(10.0, 10.0, 15.0)),
    )?;

    let shader_sphere = scene.add_mesh(
        "shader-sphere",
        sphere_mesh(4.0, 32, 16),
        Material::procedural(),
        Transform::from_position(Vec3::new(-5.0, 10.0, 10.0)),
    )?;

    *scene.lights_mut() = Lights {
        spot: Some(SpotLight {
            angle: params.angle,
            penumbra: params.penumbra,
            intensity: params.intensity,
            ..SpotLight::default()
        }),
        ..Lights::default()
    };
    scene.set_fog(Some(Fog::Exp2 {
        color: Color::WHITE,
        density: 0.01,
    }));
    scene.set_background(Background::Color(Color::from_hex(0xffea00)));

    tracing::info!(nodes = scene.node_count(), "tutorial scene built");
    Ok(TrackedObjects {
        cube,
        sphere,
        sphere_base_y,
        textured_box,
        jitter_plane,
        shader_sphere,
        model: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyscene_scene::{MaterialKind, NodeKind};

    #[test]
    fn builds_every_tracked_object() {
        let mut scene = SceneGraph::new();
        let tracked = build_tutorial_scene(&mut scene, &SceneParams::default()).unwrap();

        // cube, ground, grid, axes, sphere, box, jitter plane, shader sphere
        assert_eq!(scene.node_count(), 8);
        for id in [
            tracked.cube,
            tracked.sphere,
            tracked.textured_box,
            tracked.jitter_plane,
            tracked.shader_sphere,
        ] {
            assert!(matches!(scene.get(id).unwrap().kind, NodeKind::Mesh(_)));
        }
        assert!(tracked.model.is_none());
        assert_eq!(scene.find_by_name("theBox"), Some(tracked.textured_box));
    }

    #[test]
    fn sphere_follows_initial_params() {
        let params = SceneParams {
            wireframe: true,
            sphere_color: Color::from_hex(0x123456),
            ..SceneParams::default()
        };
        let mut scene = SceneGraph::new();
        let tracked = build_tutorial_scene(&mut scene, &params).unwrap();
        let sphere = scene.get(tracked.sphere).unwrap();
        assert!(sphere.material.wireframe);
        assert_eq!(sphere.material.color.to_hex(), 0x123456);
        assert!(sphere.cast_shadow);
        assert_eq!(sphere.transform.position.y, tracked.sphere_base_y);
    }

    #[test]
    fn environment_is_set_up() {
        let mut scene = SceneGraph::new();
        let tracked = build_tutorial_scene(&mut scene, &SceneParams::default()).unwrap();
        let spot = scene.lights().spot.unwrap();
        assert_eq!(spot.angle, 0.2);
        assert_eq!(spot.intensity, 150.0);
        assert!(matches!(scene.fog(), Some(Fog::Exp2 { .. })));
        assert_eq!(
            scene.get(tracked.shader_sphere).unwrap().material.kind,
            MaterialKind::Procedural
        );
        assert!(matches!(scene.background(), Background::Color(_)));
    }
}
