use glam::Vec2;

/// Convert a pointer position in device pixels to normalized device
/// coordinates: x grows right and y grows up, both in [-1, 1].
///
/// A zero-sized surface maps every position to the centre.
pub fn pointer_to_ndc(px: f32, py: f32, width: u32, height: u32) -> Vec2 {
    if width == 0 || height == 0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        px / width as f32 * 2.0 - 1.0,
        -(py / height as f32 * 2.0 - 1.0),
    )
}

/// Latest pointer position. Coalescing: several moves between two ticks
/// leave only the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPosition {
    latest: Option<Vec2>,
}

impl PointerPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, ndc: Vec2) {
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
            tracing::trace!(x = ndc.x, y = ndc.y, "pointer outside viewport");
        }
        self.latest = Some(ndc);
    }

    /// `None` until the pointer first moves.
    pub fn get(&self) -> Option<Vec2> {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_and_centre() {
        assert_eq!(pointer_to_ndc(0.0, 0.0, 800, 600), Vec2::new(-1.0, 1.0));
        assert_eq!(pointer_to_ndc(800.0, 600.0, 800, 600), Vec2::new(1.0, -1.0));
        assert_eq!(pointer_to_ndc(400.0, 300.0, 800, 600), Vec2::ZERO);
    }

    #[test]
    fn zero_size_maps_to_centre() {
        assert_eq!(pointer_to_ndc(10.0, 10.0, 0, 600), Vec2::ZERO);
        assert_eq!(pointer_to_ndc(10.0, 10.0, 800, 0), Vec2::ZERO);
    }

    #[test]
    fn pointer_starts_empty_and_coalesces() {
        let mut p = PointerPosition::new();
        assert!(p.get().is_none());
        p.set(Vec2::new(0.1, 0.1));
        p.set(Vec2::new(-0.3, 0.7));
        assert_eq!(p.get(), Some(Vec2::new(-0.3, 0.7)));
    }
}
