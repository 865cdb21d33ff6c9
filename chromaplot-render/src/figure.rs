//! In-memory figure model produced by the diagram functions and consumed by
//! the SVG and PNG exporters.

use chromaplot_core::ViewBounds;

use crate::markers::MarkerShape;
use crate::paint::Paint;
use crate::style::PlotStyle;

/// Something drawn inside the axes, in world (diagram) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Filled cells, each `(x, y, width, height)` with its own colour.
    Cells {
        cells: Vec<([f64; 4], Paint)>,
    },
    /// Open or closed line. One paint per segment, or a single paint reused.
    Polyline {
        points: Vec<[f64; 2]>,
        paints: Vec<Paint>,
        width: f64,
        closed: bool,
    },
    Scatter {
        points: Vec<[f64; 2]>,
        /// One paint per point, or a single paint reused.
        paints: Vec<Paint>,
        /// Marker area in points².
        size: f64,
        marker: MarkerShape,
    },
    Text {
        position: [f64; 2],
        text: String,
        paint: Paint,
    },
}

impl Element {
    /// Paint of the `index`-th item, reusing the last paint when fewer are given.
    pub fn paint_at(paints: &[Paint], index: usize) -> Paint {
        paints
            .get(index)
            .or_else(|| paints.last())
            .copied()
            .unwrap_or(Paint::BLACK)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub paint: Paint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axes {
    pub bounds: ViewBounds,
    pub x_label: String,
    pub y_label: String,
    pub elements: Vec<Element>,
    pub legend: Vec<LegendEntry>,
    pub show_legend: bool,
    pub show_axes: bool,
    pub show_grid: bool,
    pub grid_paint: Paint,
}

impl Axes {
    pub fn new(bounds: ViewBounds) -> Self {
        Self {
            bounds,
            x_label: String::new(),
            y_label: String::new(),
            elements: Vec::new(),
            legend: Vec::new(),
            show_legend: true,
            show_axes: true,
            show_grid: false,
            grid_paint: Paint::from_hex("#333333").unwrap_or(Paint::BLACK),
        }
    }

    pub fn bounds(&self) -> ViewBounds {
        self.bounds
    }

    /// Zoom around the center of the current view then pan, in place.
    pub fn apply_transform(&mut self, scale: f64, offset_x: f64, offset_y: f64) {
        self.bounds = self.bounds.transformed(scale, offset_x, offset_y);
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn add_legend_entry<S: Into<String>>(&mut self, label: S, paint: Paint) {
        self.legend.push(LegendEntry {
            label: label.into(),
            paint,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
    pub style: PlotStyle,
    pub transparent_background: bool,
    pub axes: Axes,
}

impl Figure {
    /// Pixels per inch used to turn the style's centimetre size into pixels.
    pub const DPI: f64 = 72.0;

    /// Square figure sized from `figure.size_cm` in `style`.
    pub fn new(style: PlotStyle, axes: Axes) -> Self {
        let size_cm = style.number("figure.size_cm", 25.0).clamp(1.0, 100.0);
        let side = (size_cm / 2.54 * Self::DPI).round() as u32;
        Self {
            width: side,
            height: side,
            title: None,
            style,
            transparent_background: false,
            axes,
        }
    }

    pub fn font_size(&self) -> f64 {
        self.style.number("font.size", 12.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_in_place() {
        let mut axes = Axes::new(ViewBounds::new(-0.1, 0.7, -0.1, 0.7));
        let before = axes.bounds();
        axes.apply_transform(1.0, 0.0, 0.0);
        assert_eq!(axes.bounds(), before);
        axes.apply_transform(2.0, 0.1, 0.0);
        assert!((axes.bounds().width() - 1.6).abs() < 1e-12);
        assert!((axes.bounds().x_min - (-0.5 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_figure_size_from_style() {
        let mut style = PlotStyle::empty();
        style.set("figure.size_cm", 2.54 * 10.0);
        let figure = Figure::new(style, Axes::new(ViewBounds::new(0.0, 1.0, 0.0, 1.0)));
        assert_eq!(figure.width, 720);
        assert_eq!(figure.height, 720);
    }

    #[test]
    fn test_paint_reuse() {
        let paints = [Paint::WHITE];
        assert_eq!(Element::paint_at(&paints, 5), Paint::WHITE);
        assert_eq!(Element::paint_at(&[], 0), Paint::BLACK);
    }
}
