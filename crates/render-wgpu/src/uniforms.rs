use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tinyscene_scene::{Fog, MaterialKind, Node, OrbitCamera, SceneGraph};

/// Per-frame values shared by every pipeline. Layout matches `Globals` in
/// the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz camera position, w seconds since the renderer started.
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    /// rgb premultiplied by intensity, w enabled.
    pub dir_color: [f32; 4],
    pub dir_direction: [f32; 4],
    /// rgb premultiplied by intensity, w enabled.
    pub spot_color: [f32; 4],
    /// xyz position, w decay exponent.
    pub spot_position: [f32; 4],
    /// xyz direction, w cosine of the outer cone.
    pub spot_direction: [f32; 4],
    /// x cosine of the inner cone, y shadows enabled.
    pub spot_cone: [f32; 4],
    /// rgb fog color, w mode (0 off, 1 linear, 2 exp²).
    pub fog_color: [f32; 4],
    /// x density, y near, z far.
    pub fog_params: [f32; 4],
}

impl Globals {
    pub fn new(scene: &SceneGraph, camera: &OrbitCamera, time: f32) -> Self {
        let lights = scene.lights();
        let eye = camera.position();
        let scaled = |c: tinyscene_common::Color, i: f32, on: bool| {
            [c.r * i, c.g * i, c.b * i, if on { 1.0 } else { 0.0 }]
        };

        let mut g = Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            light_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [eye.x, eye.y, eye.z, time],
            ambient: scaled(lights.ambient.color, lights.ambient.intensity, true),
            ..Self::zeroed()
        };

        if let Some(dir) = lights.directional {
            g.dir_color = scaled(dir.color, dir.intensity, true);
            g.dir_direction = dir.direction().extend(0.0).to_array();
        }

        if let Some(spot) = lights.spot {
            g.spot_color = scaled(spot.color, spot.intensity, true);
            g.spot_position = spot.position.extend(spot.decay).to_array();
            g.spot_direction = spot.direction().extend(spot.cos_outer()).to_array();
            g.spot_cone = [
                spot.cos_inner(),
                if spot.cast_shadow { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ];
            g.light_view_proj = spot.shadow_view_projection().to_cols_array_2d();
        }

        match scene.fog() {
            Some(Fog::Linear { color, near, far }) => {
                g.fog_color = [color.r, color.g, color.b, 1.0];
                g.fog_params = [0.0, *near, *far, 0.0];
            }
            Some(Fog::Exp2 { color, density }) => {
                g.fog_color = [color.r, color.g, color.b, 2.0];
                g.fog_params = [*density, 0.0, 0.0, 0.0];
            }
            None => {}
        }
        g
    }
}

/// Per-node values. Layout matches `Object` in the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x lit, y receives shadows.
    pub flags: [f32; 4],
}

impl ObjectUniform {
    pub fn new(node: &Node, world: Mat4) -> Self {
        let lit = node.material.kind == MaterialKind::Standard;
        Self {
            model: world.to_cols_array_2d(),
            color: node.material.color.to_rgba(),
            flags: [
                if lit { 1.0 } else { 0.0 },
                if node.receive_shadow { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

/// Skybox pass input: inverse of the view-projection with the camera
/// translation removed, so the sky stays at infinity.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SkyUniform {
    pub inv_view_proj: [[f32; 4]; 4],
}

impl SkyUniform {
    pub fn new(camera: &OrbitCamera) -> Self {
        let rotation_only = Mat4::look_to_rh(Vec3::ZERO, camera.forward(), Vec3::Y);
        let vp = camera.projection_matrix() * rotation_only;
        Self {
            inv_view_proj: vp.inverse().to_cols_array_2d(),
        }
    }
}
