use glam::{Mat4, Vec2, Vec3};
use tinyscene_common::ObjectId;

use crate::camera::OrbitCamera;
use crate::graph::SceneGraph;

const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }

    /// Ray from the camera through a point in normalized device coordinates.
    pub fn from_camera(ndc: Vec2, camera: &OrbitCamera) -> Self {
        let inv = camera.view_projection().inverse();
        let near = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Self::new(near, far - near)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Nearest non-negative distance to a sphere surface, if any.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t0 = -b - sq;
        let t1 = -b + sq;
        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            // Origin inside the sphere.
            Some(t1)
        } else {
            None
        }
    }

    /// Möller–Trumbore. Double-sided.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        let e1 = b - a;
        let e2 = c - a;
        let p = self.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t > EPSILON).then_some(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub object: ObjectId,
    pub distance: f32,
    pub point: Vec3,
}

/// Test `ray` against every visible mesh node.
///
/// Returns at most one hit per node (its nearest triangle), sorted by
/// distance. Helpers and groups are never hit.
pub fn intersect_scene(scene: &SceneGraph, ray: &Ray) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (id, _, mesh_id) in scene.mesh_nodes() {
        let Some(mesh) = scene.assets().get_mesh(mesh_id) else {
            continue;
        };
        let Some(world) = scene.world_matrix(id) else {
            continue;
        };

        let (center, radius) = mesh.bounding_sphere();
        let world_center = world.transform_point3(center);
        let world_radius = radius * max_scale(&world);
        if ray.intersect_sphere(world_center, world_radius).is_none() {
            continue;
        }

        let nearest = mesh
            .triangles()
            .filter_map(|[a, b, c]| {
                ray.intersect_triangle(
                    world.transform_point3(a),
                    world.transform_point3(b),
                    world.transform_point3(c),
                )
            })
            .min_by(f32::total_cmp);

        if let Some(distance) = nearest {
            hits.push(Hit {
                object: id,
                distance,
                point: ray.at(distance),
            });
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

fn max_scale(m: &Mat4) -> f32 {
    m.x_axis
        .truncate()
        .length()
        .max(m.y_axis.truncate().length())
        .max(m.z_axis.truncate().length())
}
