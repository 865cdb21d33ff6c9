// ----- CPU PNG export -----
//
// Rasterizes the figure's geometry (background, diagram elements, axes
// frame, ticks, grid, legend swatches). Text is only emitted by the SVG
// exporter.

use std::io::Cursor;
use std::ops::Range;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::figure::{Element, Figure};
use crate::markers::{marker_radius_px, MarkerGeometry};
use crate::paint::Paint;
use crate::style::PlotStyle;
use crate::vector_export::{check_view, nice_ticks_world, PlotArea, VectorExporter};
use crate::RenderError;

struct Canvas {
    image: RgbaImage,
    /// Inclusive pixel rectangle `(x0, y0, x1, y1)` drawing is limited to.
    clip: Option<(i32, i32, i32, i32)>,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Paint) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(background.to_rgba8())),
            clip: None,
        }
    }

    fn blend(&mut self, x: i32, y: i32, paint: Paint) {
        if let Some((x0, y0, x1, y1)) = self.clip {
            if x < x0 || y < y0 || x > x1 || y > y1 {
                return;
            }
        }
        if x < 0 || y < 0 || x as u32 >= self.image.width() || y as u32 >= self.image.height() {
            return;
        }
        let [r, g, b, a] = paint.to_rgba8();
        let src_a = a as f32 / 255.0;
        if src_a <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        let mix = |s: u8, d: u8| -> u8 {
            let value = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        *dst = Rgba([
            mix(r, dst[0]),
            mix(g, dst[1]),
            mix(b, dst[2]),
            (out_a * 255.0).round() as u8,
        ]);
    }

    /// Inclusive pixel rectangle that can be written: the clip intersected
    /// with the canvas, or `None` when nothing is visible.
    fn limits(&self) -> Option<(i32, i32, i32, i32)> {
        let (mut x0, mut y0) = (0, 0);
        let (mut x1, mut y1) = (self.image.width() as i32 - 1, self.image.height() as i32 - 1);
        if let Some((cx0, cy0, cx1, cy1)) = self.clip {
            x0 = x0.max(cx0);
            y0 = y0.max(cy0);
            x1 = x1.min(cx1);
            y1 = y1.min(cy1);
        }
        (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
    }

    fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, paint: Paint) {
        let Some((lx0, ly0, lx1, ly1)) = self.limits() else {
            return;
        };
        let xs = clamp_span(x0.min(x1).round(), x0.max(x1).round(), lx0, lx1);
        let ys = clamp_span(y0.min(y1).round(), y0.max(y1).round(), ly0, ly1);
        for y in ys {
            for x in xs.clone() {
                self.blend(x, y, paint);
            }
        }
    }

    // Bresenham line drawing, thickened across the minor axis
    fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, width: f64, paint: Paint) {
        let Some((lx0, ly0, lx1, ly1)) = self.limits() else {
            return;
        };
        let thickness = width.round().max(1.0) as i32;
        let margin = (thickness + 1) as f64;
        let rect = [
            lx0 as f64 - margin,
            ly0 as f64 - margin,
            lx1 as f64 + margin,
            ly1 as f64 + margin,
        ];
        let Some(([x0, y0], [x1, y1])) = clip_segment([x0, y0], [x1, y1], rect) else {
            return;
        };
        let horizontal = (x1 - x0).abs() >= (y1 - y0).abs();
        for k in 0..thickness {
            let o = k - thickness / 2;
            let (ox, oy) = if horizontal { (0, o) } else { (o, 0) };
            let (mut x, mut y) = (x0.round() as i32 + ox, y0.round() as i32 + oy);
            let (xe, ye) = (x1.round() as i32 + ox, y1.round() as i32 + oy);
            let dx = (xe - x).abs();
            let sx = if x < xe { 1 } else { -1 };
            let dy = -(ye - y).abs();
            let sy = if y < ye { 1 } else { -1 };
            let mut err = dx + dy;
            loop {
                self.blend(x, y, paint);
                if x == xe && y == ye {
                    break;
                }
                let e2 = 2 * err;
                if e2 >= dy {
                    err += dy;
                    x += sx;
                }
                if e2 <= dx {
                    err += dx;
                    y += sy;
                }
            }
        }
    }

    /// Even-odd scanline fill.
    fn fill_polygon(&mut self, points: &[[f64; 2]], paint: Paint) {
        if points.len() < 3 || !points.iter().flatten().all(|v| v.is_finite()) {
            return;
        }
        let Some((lx0, ly0, lx1, ly1)) = self.limits() else {
            return;
        };
        let min_y = points.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min).floor();
        let max_y = points.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max).ceil();
        let mut crossings = Vec::new();
        for y in clamp_span(min_y, max_y + 1.0, ly0, ly1) {
            let scan = y as f64 + 0.5;
            crossings.clear();
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                if (a[1] > scan) != (b[1] > scan) {
                    crossings.push(a[0] + (scan - a[1]) / (b[1] - a[1]) * (b[0] - a[0]));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                for x in clamp_span(pair[0].round(), pair[1].round(), lx0, lx1) {
                    self.blend(x, y, paint);
                }
            }
        }
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, paint: Paint) {
        let Some((lx0, ly0, lx1, ly1)) = self.limits() else {
            return;
        };
        let r = radius.max(0.5);
        let xs = clamp_span((cx - r).floor(), (cx + r).ceil() + 1.0, lx0, lx1);
        let ys = clamp_span((cy - r).floor(), (cy + r).ceil() + 1.0, ly0, ly1);
        for y in ys {
            for x in xs.clone() {
                let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
                if dx * dx + dy * dy <= r * r {
                    self.blend(x, y, paint);
                }
            }
        }
    }
}

/// Pixel range `start..end` restricted to `lo..=hi`. Non-finite ends give an
/// empty range.
fn clamp_span(start: f64, end: f64, lo: i32, hi: i32) -> Range<i32> {
    if !start.is_finite() || !end.is_finite() {
        return 0..0;
    }
    let a = start.max(lo as f64) as i32;
    let b = end.min(hi as f64 + 1.0) as i32;
    a..b.max(a)
}

/// Liang-Barsky clipping of the segment `a`-`b` to `[x_min, y_min, x_max, y_max]`.
fn clip_segment(a: [f64; 2], b: [f64; 2], rect: [f64; 4]) -> Option<([f64; 2], [f64; 2])> {
    if !a.iter().chain(b.iter()).all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let edges = [
        (-dx, a[0] - rect[0]),
        (dx, rect[2] - a[0]),
        (-dy, a[1] - rect[1]),
        (dy, rect[3] - a[1]),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some(([a[0] + t0 * dx, a[1] + t0 * dy], [a[0] + t1 * dx, a[1] + t1 * dy]))
}

impl VectorExporter {
    /// Rasterize the figure into an RGBA image.
    pub fn render_png(&self, figure: &Figure) -> Result<RgbaImage, RenderError> {
        check_view(figure)?;
        let style = PlotStyle::dark().merged(&figure.style);
        let background = if figure.transparent_background {
            Paint::BLACK.with_alpha(0.0)
        } else {
            style.paint("figure.facecolor", Paint::BLACK)
        };
        let mut canvas = Canvas::new(figure.width, figure.height, background);
        let area = PlotArea::for_figure(figure);
        let bounds = figure.axes.bounds();
        let to_px = |p: [f64; 2]| -> (f64, f64) {
            (area.world_to_px_x(p[0], &bounds), area.world_to_px_y(p[1], &bounds))
        };

        canvas.fill_rect(
            area.left,
            area.top,
            area.right,
            area.bottom,
            style.paint("axes.facecolor", Paint::BLACK),
        );

        canvas.clip = Some((
            area.left.round() as i32,
            area.top.round() as i32,
            area.right.round() as i32,
            area.bottom.round() as i32,
        ));
        for element in &figure.axes.elements {
            match element {
                Element::Cells { cells } => {
                    for ([x, y, w, h], paint) in cells {
                        let (xa, ya) = to_px([*x, *y]);
                        let (xb, yb) = to_px([x + w, y + h]);
                        canvas.fill_rect(xa, ya, xb, yb, *paint);
                    }
                }
                Element::Polyline {
                    points,
                    paints,
                    width,
                    closed,
                } => {
                    if points.len() < 2 {
                        continue;
                    }
                    let segments = if *closed { points.len() } else { points.len() - 1 };
                    for i in 0..segments {
                        let (xa, ya) = to_px(points[i]);
                        let (xb, yb) = to_px(points[(i + 1) % points.len()]);
                        canvas.draw_line(xa, ya, xb, yb, *width, Element::paint_at(paints, i));
                    }
                }
                Element::Scatter {
                    points,
                    paints,
                    size,
                    marker,
                } => {
                    let radius = marker_radius_px(*size, Figure::DPI);
                    let geometry = marker.geometry();
                    for (i, p) in points.iter().enumerate() {
                        let (cx, cy) = to_px(*p);
                        let paint = Element::paint_at(paints, i);
                        match &geometry {
                            MarkerGeometry::Polygon(outline) => {
                                let px: Vec<[f64; 2]> = outline
                                    .iter()
                                    .map(|[ux, uy]| [cx + ux * radius, cy - uy * radius])
                                    .collect();
                                if outline.len() >= 16 {
                                    let r = radius * polygon_extent(outline);
                                    canvas.fill_circle(cx, cy, r, paint);
                                } else {
                                    canvas.fill_polygon(&px, paint);
                                }
                            }
                            MarkerGeometry::Strokes(strokes) => {
                                for (a, b) in strokes {
                                    canvas.draw_line(
                                        cx + a[0] * radius,
                                        cy - a[1] * radius,
                                        cx + b[0] * radius,
                                        cy - b[1] * radius,
                                        1.0,
                                        paint,
                                    );
                                }
                            }
                        }
                    }
                }
                // text is not rasterized
                Element::Text { .. } => {}
            }
        }
        canvas.clip = None;

        if figure.axes.show_axes {
            let edge = style.paint("axes.edgecolor", Paint::WHITE);
            canvas.draw_line(area.left, area.top, area.right, area.top, 1.0, edge);
            canvas.draw_line(area.right, area.top, area.right, area.bottom, 1.0, edge);
            canvas.draw_line(area.right, area.bottom, area.left, area.bottom, 1.0, edge);
            canvas.draw_line(area.left, area.bottom, area.left, area.top, 1.0, edge);
            let xtick = style.paint("xtick.color", edge);
            for w in nice_ticks_world(bounds.x_min, bounds.x_max, 8) {
                let x = area.world_to_px_x(w, &bounds);
                canvas.draw_line(x, area.bottom, x, area.bottom + 5.0, 1.0, xtick);
            }
            let ytick = style.paint("ytick.color", edge);
            for w in nice_ticks_world(bounds.y_min, bounds.y_max, 8) {
                let y = area.world_to_px_y(w, &bounds);
                canvas.draw_line(area.left - 5.0, y, area.left, y, 1.0, ytick);
            }
        }

        if figure.axes.show_grid {
            let paint = figure.axes.grid_paint;
            for w in nice_ticks_world(bounds.x_min, bounds.x_max, 8) {
                let x = area.world_to_px_x(w, &bounds);
                canvas.draw_line(x, area.top, x, area.bottom, 1.0, paint);
            }
            for w in nice_ticks_world(bounds.y_min, bounds.y_max, 8) {
                let y = area.world_to_px_y(w, &bounds);
                canvas.draw_line(area.left, y, area.right, y, 1.0, paint);
            }
        }

        if figure.axes.show_legend && !figure.axes.legend.is_empty() {
            let font = figure.font_size();
            let row = font * 1.6;
            let longest = figure
                .axes
                .legend
                .iter()
                .map(|e| e.label.chars().count())
                .max()
                .unwrap_or(0);
            let legend_w = 40.0 + longest as f64 * font * 0.6;
            let legend_x = area.right - legend_w - 10.0;
            let legend_y = area.top + 10.0;
            let legend_h = row * figure.axes.legend.len() as f64 + 10.0;
            canvas.fill_rect(
                legend_x,
                legend_y,
                legend_x + legend_w,
                legend_y + legend_h,
                style.paint("legend.facecolor", Paint::BLACK),
            );
            for (i, entry) in figure.axes.legend.iter().enumerate() {
                let y = legend_y + 5.0 + row * (i as f64 + 0.5);
                canvas.draw_line(legend_x + 8.0, y, legend_x + 28.0, y, 2.0, entry.paint);
            }
        }

        Ok(canvas.image)
    }

    /// Encode the rasterized figure as PNG bytes.
    pub fn to_png_bytes(&self, figure: &Figure) -> Result<Vec<u8>, RenderError> {
        let image = self.render_png(figure)?;
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }

    /// Simple CPU-based PNG export.
    pub fn export_png<P: AsRef<Path>>(&self, figure: &Figure, path: P) -> Result<(), RenderError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_png_bytes(figure)?)?;
        log::info!("Wrote PNG figure to {}", path.display());
        Ok(())
    }
}

fn polygon_extent(outline: &[[f64; 2]]) -> f64 {
    outline
        .iter()
        .map(|[x, y]| (x * x + y * y).sqrt())
        .fold(0.0, f64::max)
}
