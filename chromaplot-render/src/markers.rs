//! Scatter marker shapes, named after the usual plotting marker codes.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Outline of a marker in unit coordinates: radius 1, y pointing up.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerGeometry {
    /// Closed, filled outline.
    Polygon(Vec<[f64; 2]>),
    /// Unfilled line segments.
    Strokes(Vec<([f64; 2], [f64; 2])>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Point,
    Pixel,
    #[default]
    Circle,
    TriangleDown,
    TriangleUp,
    TriangleLeft,
    TriangleRight,
    TriDown,
    TriUp,
    TriLeft,
    TriRight,
    Octagon,
    Square,
    Pentagon,
    Star,
    Hexagon1,
    Hexagon2,
    Plus,
    X,
    Diamond,
    ThinDiamond,
    Vline,
    Hline,
    PlusFilled,
    XFilled,
    TickLeft,
    TickRight,
    TickUp,
    TickDown,
    CaretLeft,
    CaretRight,
    CaretUp,
    CaretDown,
    CaretLeftBase,
    CaretRightBase,
    CaretUpBase,
    CaretDownBase,
}

impl MarkerShape {
    pub const ALL: [MarkerShape; 37] = [
        MarkerShape::Point,
        MarkerShape::Pixel,
        MarkerShape::Circle,
        MarkerShape::TriangleDown,
        MarkerShape::TriangleUp,
        MarkerShape::TriangleLeft,
        MarkerShape::TriangleRight,
        MarkerShape::TriDown,
        MarkerShape::TriUp,
        MarkerShape::TriLeft,
        MarkerShape::TriRight,
        MarkerShape::Octagon,
        MarkerShape::Square,
        MarkerShape::Pentagon,
        MarkerShape::Star,
        MarkerShape::Hexagon1,
        MarkerShape::Hexagon2,
        MarkerShape::Plus,
        MarkerShape::X,
        MarkerShape::Diamond,
        MarkerShape::ThinDiamond,
        MarkerShape::Vline,
        MarkerShape::Hline,
        MarkerShape::PlusFilled,
        MarkerShape::XFilled,
        MarkerShape::TickLeft,
        MarkerShape::TickRight,
        MarkerShape::TickUp,
        MarkerShape::TickDown,
        MarkerShape::CaretLeft,
        MarkerShape::CaretRight,
        MarkerShape::CaretUp,
        MarkerShape::CaretDown,
        MarkerShape::CaretLeftBase,
        MarkerShape::CaretRightBase,
        MarkerShape::CaretUpBase,
        MarkerShape::CaretDownBase,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MarkerShape::Point => "point",
            MarkerShape::Pixel => "pixel",
            MarkerShape::Circle => "circle",
            MarkerShape::TriangleDown => "triangle_down",
            MarkerShape::TriangleUp => "triangle_up",
            MarkerShape::TriangleLeft => "triangle_left",
            MarkerShape::TriangleRight => "triangle_right",
            MarkerShape::TriDown => "tri_down",
            MarkerShape::TriUp => "tri_up",
            MarkerShape::TriLeft => "tri_left",
            MarkerShape::TriRight => "tri_right",
            MarkerShape::Octagon => "octagon",
            MarkerShape::Square => "square",
            MarkerShape::Pentagon => "pentagon",
            MarkerShape::Star => "star",
            MarkerShape::Hexagon1 => "hexagon1",
            MarkerShape::Hexagon2 => "hexagon2",
            MarkerShape::Plus => "plus",
            MarkerShape::X => "x",
            MarkerShape::Diamond => "diamond",
            MarkerShape::ThinDiamond => "thin_diamond",
            MarkerShape::Vline => "vline",
            MarkerShape::Hline => "hline",
            MarkerShape::PlusFilled => "plus_filled",
            MarkerShape::XFilled => "x_filled",
            MarkerShape::TickLeft => "tick_left",
            MarkerShape::TickRight => "tick_right",
            MarkerShape::TickUp => "tick_up",
            MarkerShape::TickDown => "tick_down",
            MarkerShape::CaretLeft => "caret_left",
            MarkerShape::CaretRight => "caret_right",
            MarkerShape::CaretUp => "caret_up",
            MarkerShape::CaretDown => "caret_down",
            MarkerShape::CaretLeftBase => "caret_left_base",
            MarkerShape::CaretRightBase => "caret_right_base",
            MarkerShape::CaretUpBase => "caret_up_base",
            MarkerShape::CaretDownBase => "caret_down_base",
        }
    }

    /// Short marker code (`o`, `^`, `*`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            MarkerShape::Point => ".",
            MarkerShape::Pixel => ",",
            MarkerShape::Circle => "o",
            MarkerShape::TriangleDown => "v",
            MarkerShape::TriangleUp => "^",
            MarkerShape::TriangleLeft => "<",
            MarkerShape::TriangleRight => ">",
            MarkerShape::TriDown => "1",
            MarkerShape::TriUp => "2",
            MarkerShape::TriLeft => "3",
            MarkerShape::TriRight => "4",
            MarkerShape::Octagon => "8",
            MarkerShape::Square => "s",
            MarkerShape::Pentagon => "p",
            MarkerShape::Star => "*",
            MarkerShape::Hexagon1 => "h",
            MarkerShape::Hexagon2 => "H",
            MarkerShape::Plus => "+",
            MarkerShape::X => "x",
            MarkerShape::Diamond => "D",
            MarkerShape::ThinDiamond => "d",
            MarkerShape::Vline => "|",
            MarkerShape::Hline => "_",
            MarkerShape::PlusFilled => "P",
            MarkerShape::XFilled => "X",
            MarkerShape::TickLeft => "tickleft",
            MarkerShape::TickRight => "tickright",
            MarkerShape::TickUp => "tickup",
            MarkerShape::TickDown => "tickdown",
            MarkerShape::CaretLeft => "caretleft",
            MarkerShape::CaretRight => "caretright",
            MarkerShape::CaretUp => "caretup",
            MarkerShape::CaretDown => "caretdown",
            MarkerShape::CaretLeftBase => "caretleftbase",
            MarkerShape::CaretRightBase => "caretrightbase",
            MarkerShape::CaretUpBase => "caretupbase",
            MarkerShape::CaretDownBase => "caretdownbase",
        }
    }

    pub fn geometry(&self) -> MarkerGeometry {
        use MarkerGeometry::{Polygon, Strokes};
        match self {
            MarkerShape::Point => Polygon(scale(&regular_polygon(24, 0.0), 0.5)),
            MarkerShape::Pixel => Polygon(scale(&regular_polygon(4, 45.0), 0.2)),
            MarkerShape::Circle => Polygon(regular_polygon(24, 0.0)),
            MarkerShape::TriangleUp => Polygon(regular_polygon(3, 0.0)),
            MarkerShape::TriangleDown => Polygon(regular_polygon(3, 180.0)),
            MarkerShape::TriangleLeft => Polygon(regular_polygon(3, 90.0)),
            MarkerShape::TriangleRight => Polygon(regular_polygon(3, -90.0)),
            MarkerShape::TriDown => Strokes(spokes(&regular_polygon(3, 180.0))),
            MarkerShape::TriUp => Strokes(spokes(&regular_polygon(3, 0.0))),
            MarkerShape::TriLeft => Strokes(spokes(&regular_polygon(3, 90.0))),
            MarkerShape::TriRight => Strokes(spokes(&regular_polygon(3, -90.0))),
            MarkerShape::Octagon => Polygon(regular_polygon(8, 22.5)),
            MarkerShape::Square => Polygon(regular_polygon(4, 45.0)),
            MarkerShape::Pentagon => Polygon(regular_polygon(5, 0.0)),
            MarkerShape::Star => Polygon(star(5, 0.38)),
            MarkerShape::Hexagon1 => Polygon(regular_polygon(6, 0.0)),
            MarkerShape::Hexagon2 => Polygon(regular_polygon(6, 30.0)),
            MarkerShape::Plus => {
                Strokes(vec![([-1.0, 0.0], [1.0, 0.0]), ([0.0, -1.0], [0.0, 1.0])])
            }
            MarkerShape::X => Strokes(rotate_strokes(
                &[([-1.0, 0.0], [1.0, 0.0]), ([0.0, -1.0], [0.0, 1.0])],
                45.0,
            )),
            MarkerShape::Diamond => Polygon(regular_polygon(4, 0.0)),
            MarkerShape::ThinDiamond => {
                Polygon(regular_polygon(4, 0.0).into_iter().map(|[x, y]| [x * 0.6, y]).collect())
            }
            MarkerShape::Vline => Strokes(vec![([0.0, -1.0], [0.0, 1.0])]),
            MarkerShape::Hline => Strokes(vec![([-1.0, 0.0], [1.0, 0.0])]),
            MarkerShape::PlusFilled => Polygon(filled_cross()),
            MarkerShape::XFilled => Polygon(rotate(&filled_cross(), 45.0)),
            MarkerShape::TickLeft => Strokes(vec![([0.0, 0.0], [-1.0, 0.0])]),
            MarkerShape::TickRight => Strokes(vec![([0.0, 0.0], [1.0, 0.0])]),
            MarkerShape::TickUp => Strokes(vec![([0.0, 0.0], [0.0, 1.0])]),
            MarkerShape::TickDown => Strokes(vec![([0.0, 0.0], [0.0, -1.0])]),
            MarkerShape::CaretUp => Polygon(caret(false)),
            MarkerShape::CaretLeft => Polygon(rotate(&caret(false), 90.0)),
            MarkerShape::CaretDown => Polygon(rotate(&caret(false), 180.0)),
            MarkerShape::CaretRight => Polygon(rotate(&caret(false), -90.0)),
            MarkerShape::CaretUpBase => Polygon(caret(true)),
            MarkerShape::CaretLeftBase => Polygon(rotate(&caret(true), 90.0)),
            MarkerShape::CaretDownBase => Polygon(rotate(&caret(true), 180.0)),
            MarkerShape::CaretRightBase => Polygon(rotate(&caret(true), -90.0)),
        }
    }
}

impl fmt::Display for MarkerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MarkerShape {
    type Err = RenderError;

    /// Accepts a label (`triangle_up`) or a marker code (`^`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MarkerShape::ALL
            .iter()
            .find(|m| m.label().eq_ignore_ascii_case(wanted))
            .or_else(|| MarkerShape::ALL.iter().find(|m| m.code() == wanted))
            .copied()
            .ok_or_else(|| RenderError::InvalidOption {
                name: "marker".to_string(),
                reason: format!("unknown marker shape '{}'", s),
            })
    }
}

/// Marker radius in pixels for a scatter size given as an area in points².
pub fn marker_radius_px(size: f64, dpi: f64) -> f64 {
    size.max(0.0).sqrt() / 2.0 * dpi / 72.0
}

fn regular_polygon(sides: usize, rotation_deg: f64) -> Vec<[f64; 2]> {
    (0..sides)
        .map(|k| {
            let angle = (90.0 + rotation_deg).to_radians() + 2.0 * PI * k as f64 / sides as f64;
            [angle.cos(), angle.sin()]
        })
        .collect()
}

fn star(points: usize, inner: f64) -> Vec<[f64; 2]> {
    (0..points * 2)
        .map(|k| {
            let radius = if k % 2 == 0 { 1.0 } else { inner };
            let angle = PI / 2.0 + PI * k as f64 / points as f64;
            [radius * angle.cos(), radius * angle.sin()]
        })
        .collect()
}

fn filled_cross() -> Vec<[f64; 2]> {
    let t = 1.0 / 3.0;
    vec![
        [-t, 1.0],
        [t, 1.0],
        [t, t],
        [1.0, t],
        [1.0, -t],
        [t, -t],
        [t, -1.0],
        [-t, -1.0],
        [-t, -t],
        [-1.0, -t],
        [-1.0, t],
        [-t, t],
    ]
}

fn caret(base_at_center: bool) -> Vec<[f64; 2]> {
    let shift = if base_at_center { 0.6 } else { 0.0 };
    vec![[0.0, 0.6 + shift], [-0.75, -0.6 + shift], [0.75, -0.6 + shift]]
}

fn spokes(tips: &[[f64; 2]]) -> Vec<([f64; 2], [f64; 2])> {
    tips.iter().map(|tip| ([0.0, 0.0], *tip)).collect()
}

fn scale(points: &[[f64; 2]], factor: f64) -> Vec<[f64; 2]> {
    points.iter().map(|[x, y]| [x * factor, y * factor]).collect()
}

fn rotate_point(p: [f64; 2], degrees: f64) -> [f64; 2] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [p[0] * cos - p[1] * sin, p[0] * sin + p[1] * cos]
}

fn rotate(points: &[[f64; 2]], degrees: f64) -> Vec<[f64; 2]> {
    points.iter().map(|p| rotate_point(*p, degrees)).collect()
}

fn rotate_strokes(strokes: &[([f64; 2], [f64; 2])], degrees: f64) -> Vec<([f64; 2], [f64; 2])> {
    strokes
        .iter()
        .map(|(a, b)| (rotate_point(*a, degrees), rotate_point(*b, degrees)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_codes_are_unique() {
        let mut labels: Vec<_> = MarkerShape::ALL.iter().map(|m| m.label()).collect();
        let mut codes: Vec<_> = MarkerShape::ALL.iter().map(|m| m.code()).collect();
        labels.sort();
        labels.dedup();
        codes.sort();
        codes.dedup();
        assert_eq!(labels.len(), MarkerShape::ALL.len());
        assert_eq!(codes.len(), MarkerShape::ALL.len());
    }

    #[test]
    fn test_parse_label_or_code() {
        assert_eq!("o".parse::<MarkerShape>().unwrap(), MarkerShape::Circle);
        assert_eq!("triangle_up".parse::<MarkerShape>().unwrap(), MarkerShape::TriangleUp);
        assert_eq!("X".parse::<MarkerShape>().unwrap(), MarkerShape::XFilled);
        assert_eq!("x".parse::<MarkerShape>().unwrap(), MarkerShape::X);
        assert!("blob".parse::<MarkerShape>().is_err());
    }

    #[test]
    fn test_geometry_within_unit_radius() {
        for marker in MarkerShape::ALL {
            let points: Vec<[f64; 2]> = match marker.geometry() {
                MarkerGeometry::Polygon(points) => points,
                MarkerGeometry::Strokes(strokes) => {
                    strokes.into_iter().flat_map(|(a, b)| [a, b]).collect()
                }
            };
            assert!(!points.is_empty(), "{}", marker);
            for [x, y] in points {
                assert!((x * x + y * y).sqrt() <= 1.5, "{} escapes its box", marker);
            }
        }
    }

    #[test]
    fn test_triangle_up_points_up() {
        let MarkerGeometry::Polygon(points) = MarkerShape::TriangleUp.geometry() else {
            panic!("triangle is a polygon");
        };
        assert!((points[0][0]).abs() < 1e-12);
        assert!((points[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_radius_from_area() {
        assert!((marker_radius_px(25.0, 72.0) - 2.5).abs() < 1e-12);
    }
}
