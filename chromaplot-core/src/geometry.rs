//! Axis-box geometry used to zoom and pan a diagram's view.

use serde::{Deserialize, Serialize};

/// Transform the box `[xmin, xmax] x [ymin, ymax]` around its own center.
///
/// Both axes are scaled uniformly by `scale` (1.0 is the identity), then the
/// result is translated by `(offset_x, offset_y)`, expressed in the same units
/// as the box coordinates. A scale of 0 collapses the box onto its translated
/// center.
///
/// Returns the new `(xmin, xmax, ymin, ymax)`.
pub fn transform_box(
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
) -> (f64, f64, f64, f64) {
    let center_x = (xmin + xmax) / 2.0;
    let center_y = (ymin + ymax) / 2.0;

    (
        (xmin - center_x) * scale + center_x + offset_x,
        (xmax - center_x) * scale + center_x + offset_x,
        (ymin - center_y) * scale + center_y + offset_y,
        (ymax - center_y) * scale + center_y + offset_y,
    )
}

/// Visible area of a 2D plot, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ViewBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Apply [`transform_box`] to these bounds.
    pub fn transformed(&self, scale: f64, offset_x: f64, offset_y: f64) -> Self {
        let (x_min, x_max, y_min, y_max) = transform_box(
            self.x_min, self.x_max, self.y_min, self.y_max, scale, offset_x, offset_y,
        );
        Self { x_min, x_max, y_min, y_max }
    }

    /// Finite with a strictly positive width and height.
    pub fn is_drawable(&self) -> bool {
        let finite = [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_finite());
        finite && self.width() > 0.0 && self.height() > 0.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64), tol: f64) {
        assert!((a.0 - b.0).abs() <= tol, "{:?} != {:?}", a, b);
        assert!((a.1 - b.1).abs() <= tol, "{:?} != {:?}", a, b);
        assert!((a.2 - b.2).abs() <= tol, "{:?} != {:?}", a, b);
        assert!((a.3 - b.3).abs() <= tol, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_scale_around_center() {
        let result = transform_box(0.0, 2.0, 0.0, 4.0, 0.5, 0.0, 0.0);
        assert_close(result, (0.5, 1.5, 1.0, 3.0), 1e-12);
    }

    #[test]
    fn test_offset_applies_after_scale() {
        let result = transform_box(-1.0, 1.0, -1.0, 1.0, 2.0, 0.25, -0.5);
        assert_close(result, (-1.75, 2.25, -2.5, 1.5), 1e-12);
    }

    #[test]
    fn test_zero_scale_collapses_to_center() {
        let result = transform_box(-0.1, 0.7, -0.1, 0.7, 0.0, 0.1, 0.2);
        assert_close(result, (0.4, 0.4, 0.5, 0.5), 1e-12);
    }

    #[test]
    fn test_view_bounds_transformed() {
        let bounds = ViewBounds::new(-0.1, 0.9, -0.1, 0.9);
        let zoomed = bounds.transformed(0.5, 0.0, 0.0);
        assert!((zoomed.width() - 0.5).abs() < 1e-12);
        assert!((zoomed.height() - 0.5).abs() < 1e-12);
        assert!(zoomed.contains(0.4, 0.4));
    }

    #[test]
    fn test_collapsed_bounds_are_not_drawable() {
        let bounds = ViewBounds::new(-0.1, 0.7, -0.1, 0.7);
        assert!(bounds.is_drawable());
        assert!(!bounds.transformed(0.0, 0.0, 0.0).is_drawable());
        assert!(!bounds.transformed(-1.0, 0.0, 0.0).is_drawable());
        assert!(!ViewBounds::new(0.0, f64::INFINITY, 0.0, 1.0).is_drawable());
    }

    proptest! {
        #[test]
        fn identity_transform_is_noop(
            xmin in -1e3f64..1e3, w in 0.0f64..1e3,
            ymin in -1e3f64..1e3, h in 0.0f64..1e3,
        ) {
            let boxed = (xmin, xmin + w, ymin, ymin + h);
            let result = transform_box(boxed.0, boxed.1, boxed.2, boxed.3, 1.0, 0.0, 0.0);
            assert_close(result, boxed, 1e-9);
        }

        #[test]
        fn inverse_scale_restores_box(
            xmin in -1e3f64..1e3, w in 0.0f64..1e3,
            ymin in -1e3f64..1e3, h in 0.0f64..1e3,
            scale in prop_oneof![0.01f64..100.0, -100.0f64..-0.01],
        ) {
            let (a, b, c, d) = transform_box(xmin, xmin + w, ymin, ymin + h, scale, 0.0, 0.0);
            let restored = transform_box(a, b, c, d, 1.0 / scale, 0.0, 0.0);
            assert_close(restored, (xmin, xmin + w, ymin, ymin + h), 1e-6);
        }
    }
}
