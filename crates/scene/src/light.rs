use glam::{Mat4, Vec3};
use tinyscene_assets::AssetId;
use tinyscene_common::Color;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x333333),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the light towards its target.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).try_normalize().unwrap_or(Vec3::NEG_Y)
    }
}

/// Cone light. `angle` is the half-angle of the cone in radians;
/// `penumbra` is the fraction of the cone that fades out at the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub cast_shadow: bool,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 150.0,
            position: Vec3::new(-100.0, 100.0, 0.0),
            target: Vec3::ZERO,
            angle: 0.2,
            penumbra: 0.0,
            decay: 1.0,
            cast_shadow: true,
        }
    }
}

impl SpotLight {
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).try_normalize().unwrap_or(Vec3::NEG_Y)
    }

    /// Cosine of the outer cone edge.
    pub fn cos_outer(&self) -> f32 {
        self.angle.cos()
    }

    /// Cosine of the inner, fully lit cone.
    pub fn cos_inner(&self) -> f32 {
        (self.angle * (1.0 - self.penumbra.clamp(0.0, 1.0))).cos()
    }

    /// Fraction of light reaching `point`, ignoring shadows.
    pub fn attenuation(&self, point: Vec3) -> f32 {
        let to_point = point - self.position;
        let distance = to_point.length().max(1e-4);
        let cos = (to_point / distance).dot(self.direction());
        let (outer, inner) = (self.cos_outer(), self.cos_inner());
        let cone = if inner - outer <= f32::EPSILON {
            if cos >= outer { 1.0 } else { 0.0 }
        } else {
            let t = ((cos - outer) / (inner - outer)).clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        };
        cone / distance.powf(self.decay)
    }

    /// Light-space view-projection used to render the shadow map.
    pub fn shadow_view_projection(&self) -> Mat4 {
        let up = if self.direction().abs().dot(Vec3::Y) > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(self.position, self.target, up);
        let fov = (self.angle * 2.0).clamp(0.05, 3.0);
        let proj = Mat4::perspective_rh(fov, 1.0, 1.0, 500.0);
        proj * view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: Option<DirectionalLight>,
    pub spot: Option<SpotLight>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fog {
    Linear { color: Color, near: f32, far: f32 },
    Exp2 { color: Color, density: f32 },
}

impl Fog {
    pub fn color(&self) -> Color {
        match self {
            Fog::Linear { color, .. } | Fog::Exp2 { color, .. } => *color,
        }
    }

    /// Fraction of fog color mixed in at `distance` from the camera.
    pub fn factor(&self, distance: f32) -> f32 {
        match *self {
            Fog::Linear { near, far, .. } => {
                if far <= near {
                    return if distance >= far { 1.0 } else { 0.0 };
                }
                ((distance - near) / (far - near)).clamp(0.0, 1.0)
            }
            Fog::Exp2 { density, .. } => {
                let d = density * distance;
                (1.0 - (-d * d).exp()).clamp(0.0, 1.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Color(Color),
    Cubemap(AssetId),
}

impl Default for Background {
    fn default() -> Self {
        Background::Color(Color::BLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_cone_edges() {
        let spot = SpotLight {
            position: Vec3::new(0.0, 10.0, 0.0),
            target: Vec3::ZERO,
            decay: 0.0,
            ..SpotLight::default()
        };
        // Straight below: fully lit.
        assert!((spot.attenuation(Vec3::ZERO) - 1.0).abs() < 1e-6);
        // Far outside the 0.2 rad cone.
        assert_eq!(spot.attenuation(Vec3::new(10.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn penumbra_softens_edge() {
        let spot = SpotLight {
            position: Vec3::new(0.0, 10.0, 0.0),
            target: Vec3::ZERO,
            decay: 0.0,
            angle: 0.5,
            penumbra: 1.0,
            ..SpotLight::default()
        };
        // Halfway out the cone is partially lit.
        let p = Vec3::new(10.0 * 0.25_f32.tan(), 0.0, 0.0);
        let a = spot.attenuation(p);
        assert!(a > 0.0 && a < 1.0, "attenuation {a}");
        assert!(spot.cos_inner() > spot.cos_outer());
    }

    #[test]
    fn decay_reduces_with_distance() {
        let spot = SpotLight {
            position: Vec3::new(0.0, 10.0, 0.0),
            target: Vec3::ZERO,
            ..SpotLight::default()
        };
        let near = spot.attenuation(Vec3::new(0.0, 5.0, 0.0));
        let far = spot.attenuation(Vec3::ZERO);
        assert!(near > far);
    }

    #[test]
    fn fog_exp2_grows_with_distance() {
        let fog = Fog::Exp2 {
            color: Color::WHITE,
            density: 0.01,
        };
        assert_eq!(fog.factor(0.0), 0.0);
        assert!(fog.factor(50.0) < fog.factor(100.0));
        assert!(fog.factor(10_000.0) > 0.999);
    }

    #[test]
    fn fog_linear_clamps() {
        let fog = Fog::Linear {
            color: Color::WHITE,
            near: 0.0,
            far: 200.0,
        };
        assert_eq!(fog.factor(-5.0), 0.0);
        assert_eq!(fog.factor(100.0), 0.5);
        assert_eq!(fog.factor(500.0), 1.0);
    }

    #[test]
    fn shadow_matrix_puts_target_in_view() {
        let spot = SpotLight::default();
        let clip = spot.shadow_view_projection().project_point3(spot.target);
        assert!(clip.x.abs() < 1e-3 && clip.y.abs() < 1e-3);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }
}
