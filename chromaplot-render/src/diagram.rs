//! RGB chromaticity diagrams.
//!
//! Each entry point projects the pixels of an image onto one chromaticity
//! plane and assembles a [`Figure`] with the spectral locus, optional
//! gamut overlays, whitepoints and the scatter of pixel chromaticities.

use chromaplot_core::chromaticity::{
    image_to_xy, spectral_locus_contains, xy_to_display_rgb, POINTER_GAMUT, SPECTRAL_LOCUS,
};
use chromaplot_core::{srgb, Colorspace, DiagramMethod, FloatImage, TransferFunction};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::figure::{Axes, Element, Figure};
use crate::markers::MarkerShape;
use crate::paint::Paint;
use crate::style::{current_style, PlotStyle};
use crate::RenderError;

/// Background cells per axis when painting the diagram colours.
const BACKGROUND_RESOLUTION: usize = 64;

/// Wavelengths (nm) annotated along the spectral locus.
const LOCUS_LABELS: &[u16] = &[460, 470, 480, 490, 500, 510, 520, 540, 560, 580, 600, 620, 700];

/// A colorspace gamut drawn as a triangle of its primaries.
#[derive(Debug, Clone, PartialEq)]
pub struct GamutOverlay {
    pub colorspace: Colorspace,
    pub paint: Paint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramOptions {
    /// Marker area in points².
    pub scatter_size: f64,
    /// Colour each marker with its pixel's colour instead of `scatter_paint`.
    pub scatter_rgb: bool,
    pub scatter_paint: Paint,
    pub scatter_alpha: f64,
    pub marker: MarkerShape,
    pub show_spectral_locus: bool,
    pub locus_rgb: bool,
    pub locus_paint: Paint,
    pub locus_alpha: f64,
    /// Fill the inside of the spectral locus with approximate colours.
    pub show_diagram_colours: bool,
    /// Outline colour (alpha included) of Pointer's gamut, if drawn.
    pub pointer_gamut: Option<Paint>,
    pub show_whitepoints: bool,
    pub show_legend: bool,
    pub show_axes: bool,
    pub show_grid: bool,
    pub grid_paint: Paint,
    pub transparent_background: bool,
    /// Remove the colorspace transfer function from the image before projecting.
    pub decode_transfer: bool,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            scatter_size: 25.0,
            scatter_rgb: true,
            scatter_paint: Paint::from_hex("#53DD97").unwrap_or(Paint::WHITE),
            scatter_alpha: 1.0,
            marker: MarkerShape::Circle,
            show_spectral_locus: true,
            locus_rgb: true,
            locus_paint: Paint::WHITE,
            locus_alpha: 1.0,
            show_diagram_colours: false,
            pointer_gamut: None,
            show_whitepoints: true,
            show_legend: true,
            show_axes: true,
            show_grid: false,
            grid_paint: Paint::from_hex("#333333").unwrap_or(Paint::BLACK),
            transparent_background: false,
            decode_transfer: false,
        }
    }
}

impl DiagramOptions {
    fn validate(&self) -> Result<(), RenderError> {
        if !self.scatter_size.is_finite() || self.scatter_size < 0.0 {
            return Err(RenderError::InvalidOption {
                name: "scatter_size".to_string(),
                reason: format!("must be a positive number, got {}", self.scatter_size),
            });
        }
        for (name, alpha) in [
            ("scatter_alpha", self.scatter_alpha),
            ("locus_alpha", self.locus_alpha),
        ] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(RenderError::InvalidOption {
                    name: name.to_string(),
                    reason: format!("must be within [0, 1], got {}", alpha),
                });
            }
        }
        Ok(())
    }
}

pub fn plot_rgb_chromaticities_cie1931(
    image: &FloatImage,
    colorspace: &Colorspace,
    overlays: &[GamutOverlay],
    options: &DiagramOptions,
) -> Result<Figure, RenderError> {
    plot_rgb_chromaticities(DiagramMethod::Cie1931, image, colorspace, overlays, options)
}

pub fn plot_rgb_chromaticities_cie1960_ucs(
    image: &FloatImage,
    colorspace: &Colorspace,
    overlays: &[GamutOverlay],
    options: &DiagramOptions,
) -> Result<Figure, RenderError> {
    plot_rgb_chromaticities(DiagramMethod::Cie1960Ucs, image, colorspace, overlays, options)
}

pub fn plot_rgb_chromaticities_cie1976_ucs(
    image: &FloatImage,
    colorspace: &Colorspace,
    overlays: &[GamutOverlay],
    options: &DiagramOptions,
) -> Result<Figure, RenderError> {
    plot_rgb_chromaticities(DiagramMethod::Cie1976Ucs, image, colorspace, overlays, options)
}

/// Shared implementation of the three diagram entry points.
pub fn plot_rgb_chromaticities(
    method: DiagramMethod,
    image: &FloatImage,
    colorspace: &Colorspace,
    overlays: &[GamutOverlay],
    options: &DiagramOptions,
) -> Result<Figure, RenderError> {
    options.validate()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(RenderError::EmptyImage);
    }
    log::info!(
        "Plotting {}x{} pixels of {} on the {} diagram",
        image.width(),
        image.height(),
        colorspace.name(),
        method
    );

    let mut linear = image.clone();
    if options.decode_transfer {
        colorspace.decode_image(&mut linear);
    }

    let style = PlotStyle::dark().merged(&current_style());
    let text_paint = style.paint("text.color", Paint::WHITE);

    let mut axes = Axes::new(method.default_bounds());
    let (x_label, y_label) = method.axis_labels();
    axes.x_label = x_label.to_string();
    axes.y_label = y_label.to_string();
    axes.show_legend = options.show_legend;
    axes.show_axes = options.show_axes;
    axes.show_grid = options.show_grid;
    axes.grid_paint = options.grid_paint;

    if options.show_diagram_colours {
        axes.push(diagram_background(method));
    }

    if options.show_spectral_locus {
        add_spectral_locus(&mut axes, method, options, text_paint);
    }

    if let Some(paint) = options.pointer_gamut {
        let points = POINTER_GAMUT
            .iter()
            .map(|&(x, y)| method.project([x, y]))
            .collect();
        axes.push(Element::Polyline {
            points,
            paints: vec![paint],
            width: 1.5,
            closed: true,
        });
        axes.add_legend_entry("Pointer's Gamut", paint);
    }

    for overlay in overlays {
        let points = overlay
            .colorspace
            .primaries()
            .iter()
            .map(|xy| method.project(*xy))
            .collect();
        axes.push(Element::Polyline {
            points,
            paints: vec![overlay.paint],
            width: 2.0,
            closed: true,
        });
        axes.add_legend_entry(overlay.colorspace.name(), overlay.paint);
    }

    if options.show_whitepoints {
        add_whitepoints(&mut axes, method, colorspace, overlays, text_paint);
    }

    let points: Vec<[f64; 2]> = image_to_xy(&linear, colorspace)
        .into_par_iter()
        .map(|xy| method.project(xy))
        .collect();
    let paints = if options.scatter_rgb {
        display_paints(&linear, colorspace, options.scatter_alpha)
    } else {
        vec![options.scatter_paint.with_alpha(options.scatter_alpha)]
    };
    log::debug!("Scatter of {} points", points.len());
    axes.push(Element::Scatter {
        points,
        paints,
        size: options.scatter_size,
        marker: options.marker,
    });

    let mut figure = Figure::new(style, axes);
    figure.title = Some(format!(
        "{} - {} Chromaticity Diagram",
        colorspace.name(),
        method.label()
    ));
    figure.transparent_background = options.transparent_background;
    Ok(figure)
}

fn diagram_background(method: DiagramMethod) -> Element {
    let bounds = method.default_bounds();
    let cell_w = bounds.width() / BACKGROUND_RESOLUTION as f64;
    let cell_h = bounds.height() / BACKGROUND_RESOLUTION as f64;
    let cells = (0..BACKGROUND_RESOLUTION * BACKGROUND_RESOLUTION)
        .into_par_iter()
        .filter_map(|i| {
            let x = bounds.x_min + (i % BACKGROUND_RESOLUTION) as f64 * cell_w;
            let y = bounds.y_min + (i / BACKGROUND_RESOLUTION) as f64 * cell_h;
            let xy = method.unproject([x + cell_w / 2.0, y + cell_h / 2.0]);
            spectral_locus_contains(xy)
                .then(|| ([x, y, cell_w, cell_h], Paint::rgb(xy_to_display_rgb(xy))))
        })
        .collect();
    Element::Cells { cells }
}

fn add_spectral_locus(
    axes: &mut Axes,
    method: DiagramMethod,
    options: &DiagramOptions,
    text_paint: Paint,
) {
    let xy: Vec<[f64; 2]> = SPECTRAL_LOCUS.iter().map(|&(_, x, y)| [x, y]).collect();
    let paints = if options.locus_rgb {
        // one paint per segment, the last one closing the line of purples
        (0..xy.len())
            .map(|i| {
                let a = xy[i];
                let b = xy[(i + 1) % xy.len()];
                let mid = [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0];
                Paint::rgb(xy_to_display_rgb(mid)).with_alpha(options.locus_alpha)
            })
            .collect()
    } else {
        vec![options.locus_paint.with_alpha(options.locus_alpha)]
    };
    axes.push(Element::Polyline {
        points: xy.iter().map(|p| method.project(*p)).collect(),
        paints,
        width: 1.5,
        closed: true,
    });

    let center = method.project(srgb().whitepoint().xy);
    for &(wavelength, x, y) in SPECTRAL_LOCUS {
        if !LOCUS_LABELS.contains(&wavelength) {
            continue;
        }
        let point = method.project([x, y]);
        let (dx, dy) = (point[0] - center[0], point[1] - center[1]);
        let norm = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
        axes.push(Element::Text {
            position: [point[0] + dx / norm * 0.03, point[1] + dy / norm * 0.03],
            text: wavelength.to_string(),
            paint: text_paint.with_alpha(options.locus_alpha),
        });
    }
}

fn add_whitepoints(
    axes: &mut Axes,
    method: DiagramMethod,
    colorspace: &Colorspace,
    overlays: &[GamutOverlay],
    paint: Paint,
) {
    let mut seen: Vec<&str> = Vec::new();
    let whitepoints = std::iter::once(colorspace.whitepoint())
        .chain(overlays.iter().map(|o| o.colorspace.whitepoint()));
    for whitepoint in whitepoints {
        if seen.contains(&whitepoint.name.as_str()) {
            continue;
        }
        seen.push(&whitepoint.name);
        let point = method.project(whitepoint.xy);
        axes.push(Element::Scatter {
            points: vec![point],
            paints: vec![paint],
            size: 20.0,
            marker: MarkerShape::Plus,
        });
        axes.push(Element::Text {
            position: [point[0] + 0.01, point[1] + 0.01],
            text: whitepoint.name.clone(),
            paint,
        });
    }
}

/// Per-pixel display colour: linear RGB converted to sRGB, normalized to its
/// maximum component then encoded.
fn display_paints(linear: &FloatImage, colorspace: &Colorspace, alpha: f64) -> Vec<Paint> {
    let display = srgb();
    let matrix = colorspace.conversion_matrix_to(&display);
    let samples: &[f32] = linear;
    samples
        .par_chunks_exact(3)
        .map(|px| {
            let rgb = matrix * Vector3::new(px[0] as f64, px[1] as f64, px[2] as f64);
            let clipped = rgb.map(|v| v.max(0.0));
            let peak = clipped.max();
            let normalized = if peak > 0.0 { clipped / peak } else { clipped };
            Paint::rgb([
                TransferFunction::Srgb.encode(normalized[0]),
                TransferFunction::Srgb.encode(normalized[1]),
                TransferFunction::Srgb.encode(normalized[2]),
            ])
            .with_alpha(alpha)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleContext;
    use chromaplot_core::get_colorspace;
    use image::{ImageBuffer, Rgb};

    fn constant_image(value: [f32; 3]) -> FloatImage {
        ImageBuffer::from_pixel(2, 2, Rgb(value))
    }

    fn scatter_of(figure: &Figure) -> (&Vec<[f64; 2]>, &Vec<Paint>) {
        figure
            .axes
            .elements
            .iter()
            .rev()
            .find_map(|e| match e {
                Element::Scatter { points, paints, .. } if points.len() > 1 => {
                    Some((points, paints))
                }
                _ => None,
            })
            .expect("figure has a pixel scatter")
    }

    #[test]
    fn test_bounds_match_method() {
        let image = constant_image([0.5, 0.5, 0.5]);
        let options = DiagramOptions::default();
        let figure =
            plot_rgb_chromaticities_cie1976_ucs(&image, &srgb(), &[], &options).unwrap();
        assert_eq!(figure.axes.bounds(), DiagramMethod::Cie1976Ucs.default_bounds());
        assert_eq!(figure.axes.x_label, "CIE u'");
        let figure =
            plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &options).unwrap();
        assert_eq!(figure.axes.bounds(), DiagramMethod::Cie1931.default_bounds());
    }

    #[test]
    fn test_grey_projects_to_whitepoint() {
        let image = constant_image([0.5, 0.5, 0.5]);
        let figure = plot_rgb_chromaticities_cie1960_ucs(
            &image,
            &srgb(),
            &[],
            &DiagramOptions::default(),
        )
        .unwrap();
        let expected = DiagramMethod::Cie1960Ucs.project(srgb().whitepoint().xy);
        let (points, paints) = scatter_of(&figure);
        assert_eq!(points.len(), 4);
        assert_eq!(paints.len(), 4);
        for p in points {
            assert!((p[0] - expected[0]).abs() < 1e-9);
            assert!((p[1] - expected[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_decode_transfer_changes_only_scale() {
        // a pure primary keeps its chromaticity whether or not it is decoded
        let image = constant_image([0.8, 0.0, 0.0]);
        let mut options = DiagramOptions::default();
        let raw = plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &options).unwrap();
        options.decode_transfer = true;
        let decoded = plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &options).unwrap();
        let (a, _) = scatter_of(&raw);
        let (b, _) = scatter_of(&decoded);
        assert!((a[0][0] - 0.64).abs() < 1e-6);
        assert!((a[0][0] - b[0][0]).abs() < 1e-9);
    }

    #[test]
    fn test_overlays_and_pointer_gamut_in_legend() {
        let image = constant_image([0.2, 0.4, 0.6]);
        let p3 = get_colorspace("Display P3").unwrap();
        let overlays = vec![GamutOverlay {
            colorspace: p3,
            paint: Paint::from_hex("#F44336").unwrap(),
        }];
        let options = DiagramOptions {
            pointer_gamut: Some(Paint::WHITE.with_alpha(0.5)),
            ..DiagramOptions::default()
        };
        let figure = plot_rgb_chromaticities_cie1976_ucs(&image, &srgb(), &overlays, &options)
            .unwrap();
        let labels: Vec<&str> = figure.axes.legend.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Pointer's Gamut", "Display P3"]);
    }

    #[test]
    fn test_fixed_scatter_colour() {
        let image = constant_image([0.2, 0.4, 0.6]);
        let options = DiagramOptions {
            scatter_rgb: false,
            scatter_alpha: 0.5,
            ..DiagramOptions::default()
        };
        let figure = plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &options).unwrap();
        let (_, paints) = scatter_of(&figure);
        assert_eq!(paints.len(), 1);
        assert_eq!(paints[0].to_hex(), "#53DD97");
        assert_eq!(paints[0].alpha, 0.5);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let image = constant_image([0.0, 0.0, 0.0]);
        let options = DiagramOptions {
            scatter_alpha: 1.5,
            ..DiagramOptions::default()
        };
        assert!(matches!(
            plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &options),
            Err(RenderError::InvalidOption { .. })
        ));
        let empty: FloatImage = ImageBuffer::new(0, 0);
        assert!(matches!(
            plot_rgb_chromaticities_cie1931(&empty, &srgb(), &[], &DiagramOptions::default()),
            Err(RenderError::EmptyImage)
        ));
    }

    #[test]
    fn test_style_context_reaches_figure() {
        let image = constant_image([0.5, 0.5, 0.5]);
        let mut style = PlotStyle::empty();
        style.set("font.size", 20.0);
        let figure = {
            let _guard = StyleContext::enter(&style);
            plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &DiagramOptions::default())
                .unwrap()
        };
        assert_eq!(figure.font_size(), 20.0);
        // dark theme keys fill in whatever the context does not set
        assert!(figure.style.get("legend.facecolor").is_some());
    }

    #[test]
    fn test_background_cells_inside_locus() {
        let image = constant_image([0.5, 0.5, 0.5]);
        let options = DiagramOptions {
            show_diagram_colours: true,
            ..DiagramOptions::default()
        };
        let figure = plot_rgb_chromaticities_cie1931(&image, &srgb(), &[], &options).unwrap();
        let Element::Cells { cells } = &figure.axes.elements[0] else {
            panic!("background comes first");
        };
        assert!(!cells.is_empty());
        assert!(cells.len() < BACKGROUND_RESOLUTION * BACKGROUND_RESOLUTION);
    }
}
