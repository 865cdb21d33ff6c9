/*!
# Vector Export

Serializes a [`Figure`] to SVG with axes, ticks, optional grid, legend and a
configuration footer. Output is deterministic for identical figures unless
the timestamped footer is enabled.
*/

use std::path::Path;

use chromaplot_core::ViewBounds;

use crate::figure::{Element, Figure};
use crate::markers::{marker_radius_px, MarkerGeometry, MarkerShape};
use crate::paint::Paint;
use crate::style::PlotStyle;
use crate::RenderError;

/// Export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub show_footer: bool,
    pub font_family: String,
    pub provenance_comment: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            show_footer: false,
            font_family: "Arial, sans-serif".to_string(),
            provenance_comment: None,
        }
    }
}

/// Writes figures to SVG (and PNG, see `raster`).
pub struct VectorExporter {
    pub(crate) config: ExportConfig,
}

impl VectorExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn to_svg_string(&self, figure: &Figure) -> Result<String, RenderError> {
        check_view(figure)?;
        let mut svg = SvgBuilder::new(&self.config, figure);

        svg.add_background(figure.transparent_background);

        if let Some(comment) = &self.config.provenance_comment {
            svg.add_comment(comment);
        }

        svg.render_elements(&figure.axes.elements);

        if figure.axes.show_axes {
            svg.add_axes(&figure.axes.x_label, &figure.axes.y_label);
        }

        // drawn last so the grid stays visible over the diagram colours
        if figure.axes.show_grid {
            svg.add_grid(figure.axes.grid_paint);
        }

        if let Some(title) = &figure.title {
            svg.add_title(title);
        }

        if figure.axes.show_legend && !figure.axes.legend.is_empty() {
            svg.add_legend(figure);
        }

        if self.config.show_footer {
            svg.add_footer();
        }

        Ok(svg.finish())
    }

    /// Export to SVG format
    pub fn export_svg<P: AsRef<Path>>(&self, figure: &Figure, path: P) -> Result<(), RenderError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_svg_string(figure)?)?;
        log::info!("Wrote SVG figure to {}", path.display());
        Ok(())
    }
}

/// Reject views that cannot be mapped to pixels.
pub(crate) fn check_view(figure: &Figure) -> Result<(), RenderError> {
    let bounds = figure.axes.bounds();
    if bounds.is_drawable() {
        return Ok(());
    }
    Err(RenderError::DegenerateView {
        x_min: bounds.x_min,
        x_max: bounds.x_max,
        y_min: bounds.y_min,
        y_max: bounds.y_max,
    })
}

/// Inner plotting rectangle of a figure, in pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlotArea {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PlotArea {
    pub fn for_figure(figure: &Figure) -> Self {
        let font = figure.font_size();
        Self {
            left: 30.0 + font * 3.0,
            right: figure.width as f64 - 20.0,
            top: 20.0 + font * 2.0,
            bottom: figure.height as f64 - 20.0 - font * 2.5,
        }
    }

    pub fn world_to_px_x(&self, world_x: f64, bounds: &ViewBounds) -> f64 {
        self.left + (world_x - bounds.x_min) / bounds.width() * (self.right - self.left)
    }

    pub fn world_to_px_y(&self, world_y: f64, bounds: &ViewBounds) -> f64 {
        let norm = (world_y - bounds.y_min) / bounds.height();
        // Invert Y so that larger values are higher on the canvas
        self.bottom - norm * (self.bottom - self.top)
    }
}

/// SVG builder for vector graphics
struct SvgBuilder {
    config: ExportConfig,
    style: PlotStyle,
    elements: Vec<String>,
    width: f64,
    height: f64,
    font_size: f64,
    area: PlotArea,
    bounds: ViewBounds,
    top_comments: Vec<String>,
}

impl SvgBuilder {
    fn new(config: &ExportConfig, figure: &Figure) -> Self {
        Self {
            config: config.clone(),
            style: PlotStyle::dark().merged(&figure.style),
            elements: Vec::new(),
            width: figure.width as f64,
            height: figure.height as f64,
            font_size: figure.font_size(),
            area: PlotArea::for_figure(figure),
            bounds: figure.axes.bounds(),
            top_comments: Vec::new(),
        }
    }

    fn add_background(&mut self, transparent: bool) {
        if !transparent {
            let paint = self.style.paint("figure.facecolor", Paint::BLACK);
            self.elements.push(format!(
                r#"<rect width="{}" height="{}" {}/>"#,
                self.width,
                self.height,
                fill_attrs(paint)
            ));
        }
        let axes_paint = self.style.paint("axes.facecolor", Paint::BLACK);
        let a = self.area;
        self.elements.push(format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" {}/>"#,
            a.left,
            a.top,
            a.right - a.left,
            a.bottom - a.top,
            fill_attrs(axes_paint)
        ));
        self.elements.push(format!(
            r#"<defs><clipPath id="plot-area"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}"/></clipPath></defs>"#,
            a.left,
            a.top,
            a.right - a.left,
            a.bottom - a.top
        ));
    }

    fn add_comment(&mut self, text: &str) {
        self.top_comments.push(text.to_string());
    }

    fn add_title(&mut self, title: &str) {
        let paint = self.style.paint("text.color", Paint::WHITE);
        self.elements.push(format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" text-anchor="middle" font-weight="bold" {}>{}</text>"#,
            self.width / 2.0,
            self.font_size + 10.0,
            self.config.font_family,
            self.font_size + 2.0,
            fill_attrs(paint),
            escape_xml(title)
        ));
    }

    fn x(&self, world_x: f64) -> f64 {
        self.area.world_to_px_x(world_x, &self.bounds)
    }

    fn y(&self, world_y: f64) -> f64 {
        self.area.world_to_px_y(world_y, &self.bounds)
    }

    fn points_attr(&self, points: &[[f64; 2]]) -> String {
        points
            .iter()
            .map(|p| format!("{:.2},{:.2}", self.x(p[0]), self.y(p[1])))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render_elements(&mut self, elements: &[Element]) {
        self.elements.push(r#"<g clip-path="url(#plot-area)">"#.to_string());
        for element in elements {
            match element {
                Element::Cells { cells } => {
                    for ([x, y, w, h], paint) in cells {
                        let (left, top) = (self.x(*x), self.y(y + h));
                        let (right, bottom) = (self.x(x + w), self.y(*y));
                        self.elements.push(format!(
                            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" {}/>"#,
                            left,
                            top,
                            right - left,
                            bottom - top,
                            fill_attrs(*paint)
                        ));
                    }
                }
                Element::Polyline {
                    points,
                    paints,
                    width,
                    closed,
                } => self.render_polyline(points, paints, *width, *closed),
                Element::Scatter {
                    points,
                    paints,
                    size,
                    marker,
                } => self.render_scatter(points, paints, *size, *marker),
                Element::Text {
                    position,
                    text,
                    paint,
                } => {
                    self.elements.push(format!(
                        r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" text-anchor="middle" dominant-baseline="middle" {}>{}</text>"#,
                        self.x(position[0]),
                        self.y(position[1]),
                        self.config.font_family,
                        self.font_size - 2.0,
                        fill_attrs(*paint),
                        escape_xml(text)
                    ));
                }
            }
        }
        self.elements.push("</g>".to_string());
    }

    fn render_polyline(&mut self, points: &[[f64; 2]], paints: &[Paint], width: f64, closed: bool) {
        if points.len() < 2 {
            return;
        }
        if paints.len() <= 1 {
            let tag = if closed { "polygon" } else { "polyline" };
            self.elements.push(format!(
                r#"<{} points="{}" fill="none" stroke-width="{}" {}/>"#,
                tag,
                self.points_attr(points),
                width,
                stroke_attrs(Element::paint_at(paints, 0))
            ));
            return;
        }
        let segments = if closed { points.len() } else { points.len() - 1 };
        for i in 0..segments {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            self.elements.push(format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-width="{}" stroke-linecap="round" {}/>"#,
                self.x(a[0]),
                self.y(a[1]),
                self.x(b[0]),
                self.y(b[1]),
                width,
                stroke_attrs(Element::paint_at(paints, i))
            ));
        }
    }

    fn render_scatter(
        &mut self,
        points: &[[f64; 2]],
        paints: &[Paint],
        size: f64,
        marker: MarkerShape,
    ) {
        let radius = marker_radius_px(size, Figure::DPI);
        let geometry = marker.geometry();
        for (i, p) in points.iter().enumerate() {
            let (cx, cy) = (self.x(p[0]), self.y(p[1]));
            let paint = Element::paint_at(paints, i);
            let element = match (&geometry, marker) {
                (_, MarkerShape::Circle) | (_, MarkerShape::Point) => {
                    let r = if marker == MarkerShape::Point { radius / 2.0 } else { radius };
                    format!(r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" {}/>"#, cx, cy, r, fill_attrs(paint))
                }
                (MarkerGeometry::Polygon(outline), _) => {
                    let pts = outline
                        .iter()
                        .map(|[ux, uy]| format!("{:.2},{:.2}", cx + ux * radius, cy - uy * radius))
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!(r#"<polygon points="{}" {}/>"#, pts, fill_attrs(paint))
                }
                (MarkerGeometry::Strokes(strokes), _) => {
                    let d = strokes
                        .iter()
                        .map(|(a, b)| {
                            format!(
                                "M {:.2} {:.2} L {:.2} {:.2}",
                                cx + a[0] * radius,
                                cy - a[1] * radius,
                                cx + b[0] * radius,
                                cy - b[1] * radius
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!(r#"<path d="{}" fill="none" stroke-width="1" {}/>"#, d, stroke_attrs(paint))
                }
            };
            self.elements.push(element);
        }
    }

    fn add_axes(&mut self, x_label: &str, y_label: &str) {
        let edge = self.style.paint("axes.edgecolor", Paint::WHITE);
        let label_paint = self.style.paint("axes.labelcolor", Paint::WHITE);
        let xtick = self.style.paint("xtick.color", label_paint);
        let ytick = self.style.paint("ytick.color", label_paint);
        let a = self.area;
        let tick_font = self.font_size - 2.0;

        self.elements.push(format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke-width="1" {}/>"#,
            a.left,
            a.top,
            a.right - a.left,
            a.bottom - a.top,
            stroke_attrs(edge)
        ));

        self.elements.push(format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" text-anchor="middle" {}>{}</text>"#,
            (a.left + a.right) / 2.0,
            self.height - 8.0,
            self.config.font_family,
            self.font_size,
            fill_attrs(label_paint),
            escape_xml(x_label)
        ));
        let y_label_x = self.font_size;
        let y_label_y = (a.top + a.bottom) / 2.0;
        self.elements.push(format!(
            r#"<text x="{:.2}" y="{:.2}" transform="rotate(-90 {:.2} {:.2})" font-family="{}" font-size="{}px" text-anchor="middle" {}>{}</text>"#,
            y_label_x,
            y_label_y,
            y_label_x,
            y_label_y,
            self.config.font_family,
            self.font_size,
            fill_attrs(label_paint),
            escape_xml(y_label)
        ));

        let x_decimals = tick_decimals(self.bounds.x_min, self.bounds.x_max, 8);
        for w in nice_ticks_world(self.bounds.x_min, self.bounds.x_max, 8) {
            let x = self.x(w);
            self.elements.push(format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-width="1" {}/>"#,
                x,
                a.bottom,
                x,
                a.bottom + 5.0,
                stroke_attrs(xtick)
            ));
            self.elements.push(format!(
                r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" text-anchor="middle" {}>{}</text>"#,
                x,
                a.bottom + 8.0 + tick_font,
                self.config.font_family,
                tick_font,
                fill_attrs(xtick),
                format_tick(w, x_decimals)
            ));
        }

        let y_decimals = tick_decimals(self.bounds.y_min, self.bounds.y_max, 8);
        for w in nice_ticks_world(self.bounds.y_min, self.bounds.y_max, 8) {
            let y = self.y(w);
            self.elements.push(format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-width="1" {}/>"#,
                a.left - 5.0,
                y,
                a.left,
                y,
                stroke_attrs(ytick)
            ));
            self.elements.push(format!(
                r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" text-anchor="end" dominant-baseline="middle" {}>{}</text>"#,
                a.left - 8.0,
                y,
                self.config.font_family,
                tick_font,
                fill_attrs(ytick),
                format_tick(w, y_decimals)
            ));
        }
    }

    fn add_grid(&mut self, paint: Paint) {
        let a = self.area;
        for w in nice_ticks_world(self.bounds.x_min, self.bounds.x_max, 8) {
            let x = self.x(w);
            self.elements.push(format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-width="1" {}/>"#,
                x,
                a.top,
                x,
                a.bottom,
                stroke_attrs(paint)
            ));
        }
        for w in nice_ticks_world(self.bounds.y_min, self.bounds.y_max, 8) {
            let y = self.y(w);
            self.elements.push(format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-width="1" {}/>"#,
                a.left,
                y,
                a.right,
                y,
                stroke_attrs(paint)
            ));
        }
    }

    fn add_legend(&mut self, figure: &Figure) {
        let entries = &figure.axes.legend;
        let face = self.style.paint("legend.facecolor", Paint::BLACK);
        let edge = self.style.paint("legend.edgecolor", Paint::BLACK);
        let text = self.style.paint("text.color", Paint::WHITE);
        let row = self.font_size * 1.6;
        let longest = entries.iter().map(|e| e.label.chars().count()).max().unwrap_or(0);
        let legend_w = 40.0 + longest as f64 * self.font_size * 0.6;
        let legend_h = row * entries.len() as f64 + 10.0;
        let legend_x = self.area.right - legend_w - 10.0;
        let legend_y = self.area.top + 10.0;

        self.elements.push(format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="3" stroke-width="1" {} {}/>"#,
            legend_x,
            legend_y,
            legend_w,
            legend_h,
            fill_attrs(face),
            stroke_attrs(edge)
        ));

        for (i, entry) in entries.iter().enumerate() {
            let y = legend_y + 5.0 + row * (i as f64 + 0.5);
            self.elements.push(format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-width="2" {}/>"#,
                legend_x + 8.0,
                y,
                legend_x + 28.0,
                y,
                stroke_attrs(entry.paint)
            ));
            self.elements.push(format!(
                r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" dominant-baseline="middle" {}>{}</text>"#,
                legend_x + 34.0,
                y,
                self.config.font_family,
                self.font_size - 1.0,
                fill_attrs(text),
                escape_xml(&entry.label)
            ));
        }
    }

    fn add_footer(&mut self) {
        let footer_text = format!(
            "chromaplot v{} | View: {:.3} to {:.3} x {:.3} to {:.3} | Generated: {}",
            env!("CARGO_PKG_VERSION"),
            self.bounds.x_min,
            self.bounds.x_max,
            self.bounds.y_min,
            self.bounds.y_max,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        self.elements.push(format!(
            r#"<text x="10" y="{:.2}" font-family="{}" font-size="{}px" fill="gray">{}</text>"#,
            self.height - 4.0,
            self.config.font_family,
            self.font_size - 4.0,
            footer_text
        ));
    }

    fn finish(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<svg width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
            self.width, self.height, self.width, self.height
        ));
        for c in &self.top_comments {
            for line in c.lines() {
                out.push_str(&format!("  <!-- {} -->\n", line.replace("--", "- -")));
            }
        }
        for element in &self.elements {
            out.push_str("  ");
            out.push_str(element);
            out.push('\n');
        }
        out.push_str("</svg>\n");
        out
    }
}

fn fill_attrs(paint: Paint) -> String {
    format!(r#"fill="{}" fill-opacity="{:.3}""#, paint.to_hex(), paint.alpha)
}

fn stroke_attrs(paint: Paint) -> String {
    format!(r#"stroke="{}" stroke-opacity="{:.3}""#, paint.to_hex(), paint.alpha)
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_tick(value: f64, decimals: usize) -> String {
    // avoid "-0.0"
    let value = if value.abs() < 1e-9 { 0.0 } else { value };
    format!("{:.*}", decimals, value)
}

/// Decimals needed to tell apart ticks spaced like `nice_ticks_world` does.
fn tick_decimals(min_world: f64, max_world: f64, desired: usize) -> usize {
    let span = max_world - min_world;
    if !(span > 0.0) || desired == 0 {
        return 1;
    }
    let step = nice_round_length(span / desired as f64);
    (-step.log10() - 1e-9).ceil().max(0.0) as usize
}

// Round a length to a "nice" number: 1, 2, or 5 × 10^k
pub(crate) fn nice_round_length(x: f64) -> f64 {
    if x <= 0.0 || !x.is_finite() {
        return 1.0;
    }
    let exp = x.log10().floor();
    let base = 10f64.powf(exp);
    let mant = x / base;
    let nice = if mant <= 1.0 {
        1.0
    } else if mant <= 2.0 {
        2.0
    } else if mant <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

// Tick positions at multiples of a nice step inside [min_world, max_world]
pub(crate) fn nice_ticks_world(min_world: f64, max_world: f64, desired: usize) -> Vec<f64> {
    let span = max_world - min_world;
    if !(span > 0.0) || desired == 0 {
        return Vec::new();
    }
    let step = nice_round_length(span / desired as f64);
    let first = (min_world / step - 1e-9).ceil() as i64;
    let last = (max_world / step + 1e-9).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}
