use glam::Vec2;

/// A high-level input action produced by a host.
///
/// The frame context consumes actions, never raw window events, so the
/// desktop window and the headless runner drive the same loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Pointer moved; position in normalized device coordinates.
    PointerMoved(Vec2),
    /// Rotate the camera around its target by a drag in pixels.
    Orbit { dx: f32, dy: f32 },
    /// Move the camera toward (positive) or away from the target.
    Zoom(f32),
    /// Slide the camera target by a drag in pixels.
    Pan { dx: f32, dy: f32 },
    /// Render surface changed size.
    Resize { width: u32, height: u32 },
}

impl Action {
    /// True for actions that only affect the camera.
    pub fn is_camera(&self) -> bool {
        matches!(self, Action::Orbit { .. } | Action::Zoom(_) | Action::Pan { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_moved_is_constructible() {
        let a = Action::PointerMoved(Vec2::new(0.5, -0.5));
        assert!(matches!(a, Action::PointerMoved(_)));
        assert!(!a.is_camera());
    }

    #[test]
    fn camera_actions() {
        assert!(Action::Orbit { dx: 1.0, dy: 0.0 }.is_camera());
        assert!(Action::Zoom(1.0).is_camera());
        assert!(Action::Pan { dx: 0.0, dy: 1.0 }.is_camera());
        assert!(!Action::Resize { width: 1, height: 1 }.is_camera());
    }
}
