use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Perspective camera orbiting a target point.
///
/// Position is derived from `target`, `radius`, `yaw` and `pitch`; the
/// camera always looks at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_position(Vec3::new(-10.0, 30.0, 30.0), Vec3::ZERO)
    }
}

impl OrbitCamera {
    const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

    /// Place the camera at `position` looking at `target`.
    pub fn from_position(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let radius = offset.length().max(1e-3);
        Self {
            target,
            radius,
            yaw: offset.z.atan2(offset.x),
            pitch: (offset.y / radius).clamp(-1.0, 1.0).asin(),
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            pan_speed: 0.001,
            min_radius: 1.0,
            max_radius: 500.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.target
            + self.radius
                * Vec3::new(
                    self.pitch.cos() * self.yaw.cos(),
                    self.pitch.sin(),
                    self.pitch.cos() * self.yaw.sin(),
                )
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Rotate around the target by a pointer drag in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.rotate_speed;
        self.pitch = (self.pitch + dy * self.rotate_speed).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    /// Move towards (positive) or away from (negative) the target.
    pub fn zoom(&mut self, delta: f32) {
        let scale = (1.0 - delta * self.zoom_speed).max(0.1);
        self.radius = (self.radius * scale).clamp(self.min_radius, self.max_radius);
    }

    /// Slide target and camera together in the view plane.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let right = self.right();
        let up = right.cross(self.forward());
        let scale = self.radius * self.pan_speed;
        self.target += (-right * dx + up * dy) * scale;
    }

    /// Match the projection to a new viewport size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_round_trips_position() {
        let cam = OrbitCamera::default();
        let p = cam.position();
        assert!((p - Vec3::new(-10.0, 30.0, 30.0)).length() < 1e-3);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn orbit_keeps_distance() {
        let mut cam = OrbitCamera::default();
        let r = cam.position().distance(cam.target);
        cam.orbit(120.0, -40.0);
        assert!((cam.position().distance(cam.target) - r).abs() < 1e-3);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = OrbitCamera::default();
        cam.orbit(0.0, 1.0e6);
        assert!(cam.pitch < FRAC_PI_2);
        assert!(!cam.view_matrix().col(0).x.is_nan());
    }

    #[test]
    fn zoom_respects_limits() {
        let mut cam = OrbitCamera::default();
        for _ in 0..200 {
            cam.zoom(5.0);
        }
        assert_eq!(cam.radius, cam.min_radius);
        for _ in 0..200 {
            cam.zoom(-5.0);
        }
        assert_eq!(cam.radius, cam.max_radius);
    }

    #[test]
    fn pan_moves_target() {
        let mut cam = OrbitCamera::default();
        cam.pan(100.0, 0.0);
        assert_ne!(cam.target, Vec3::ZERO);
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut cam = OrbitCamera::default();
        cam.set_viewport(1920, 1080);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        cam.set_viewport(800, 0);
        assert_eq!(cam.aspect, 800.0);
    }

    #[test]
    fn resize_keeps_unit_square_undistorted() {
        // A point one unit right and one unit up of the target projects to
        // equal pixel offsets when NDC is scaled back by the viewport size.
        let mut cam = OrbitCamera::from_position(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        for (w, h) in [(1280u32, 720u32), (600, 900)] {
            cam.set_viewport(w, h);
            let vp = cam.view_projection();
            let right = vp.project_point3(Vec3::X);
            let up = vp.project_point3(Vec3::Y);
            let px_right = right.x * w as f32 * 0.5;
            let px_up = up.y * h as f32 * 0.5;
            assert!((px_right - px_up).abs() < 1e-2, "{w}x{h}: {px_right} vs {px_up}");
        }
    }
}
