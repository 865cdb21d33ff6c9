//! Plot command implementation - build a chromaticity diagram and export it to SVG/PNG

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use chromaplot_core::{ColorStringFormat, NamedBytes};
use chromaplot_render::vector_export::{ExportConfig, VectorExporter};
use chromaplot_render::{MarkerShape, StyleValue};
use chromaplot_session::handlers::{self, size_limit_from_env};
use chromaplot_session::{ConfigurationStore, OverlayList, OverlaySlot, Session, SourceType};

use crate::config::Config;
use crate::error::CliError;
use crate::ExportFormat;

/// Display colours given to overlays listed without one.
const OVERLAY_COLORS: &[&str] = &["#9C27B0", "#3F51B5", "#03A9F4", "#009688"];

#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Output file (SVG/PNG)
    #[arg(short, long, required = true)]
    pub out: PathBuf,

    /// Output format (auto-detected from extension)
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Single colour to plot, written in --color-format
    #[arg(long, conflicts_with = "image")]
    pub color: Option<String>,

    /// Image whose pixels are plotted
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Colorspace of the colour or image
    #[arg(long)]
    pub colorspace: Option<String>,

    /// Ignore the colorspace transfer function
    #[arg(long)]
    pub force_linear: bool,

    /// Colour string format (float_d2, float_d4, float_d8, int8, hexadecimal)
    #[arg(long)]
    pub color_format: Option<String>,

    /// Projection method (cie1931, cie1960-ucs, cie1976-ucs)
    #[arg(short, long)]
    pub method: Option<String>,

    /// Extra gamut to draw, as NAME or NAME=#RRGGBB (repeatable)
    #[arg(long)]
    pub overlay: Vec<String>,

    /// Display colour of the source colorspace gamut
    #[arg(long)]
    pub source_overlay_color: Option<String>,

    /// Scatter marker (label or marker code)
    #[arg(long)]
    pub marker: Option<String>,

    /// Marker area in points²
    #[arg(long)]
    pub scatter_size: Option<f64>,

    /// Keep one pixel every N along both image axes
    #[arg(long)]
    pub samples: Option<u32>,

    /// Zoom factor of the view, > 1 zooms out
    #[arg(long)]
    pub scale: Option<f64>,

    /// Horizontal offset of the view, in diagram units
    #[arg(long, allow_hyphen_values = true)]
    pub offset_x: Option<f64>,

    /// Vertical offset of the view, in diagram units
    #[arg(long, allow_hyphen_values = true)]
    pub offset_y: Option<f64>,

    /// Draw Pointer's gamut
    #[arg(long)]
    pub pointer_gamut: bool,

    /// Draw the axes grid
    #[arg(long)]
    pub grid: bool,

    /// Fill the spectral locus with colours
    #[arg(long)]
    pub diagram_colours: bool,

    /// Transparent figure background
    #[arg(long)]
    pub transparent: bool,

    /// Restore session options from a JSON snapshot before applying flags
    #[arg(long)]
    pub restore: Option<PathBuf>,

    /// Write the session options to a JSON snapshot after plotting
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

pub fn execute(config: &Config, args: PlotArgs) -> Result<()> {
    log::info!("Starting plot generation");
    log::info!("Output file: {}", args.out.display());

    let export_format = args.format.unwrap_or_else(|| detect_export_format(&args.out));
    log::info!("Output format: {:?}", export_format);

    let session = Session::new();
    let store = session.config();
    apply_config(config, store)?;

    if let Some(path) = &args.restore {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
        store.restore(&snapshot).map_err(CliError::from)?;
    }

    apply_source(store, &args)?;
    apply_styling(store, &args)?;

    let figure = store.generate_plot().map_err(CliError::from)?;

    let exporter = VectorExporter::new(ExportConfig {
        show_footer: config.export.footer,
        font_family: config.export.font_family.clone(),
        provenance_comment: Some(build_provenance_comment(store, &args)),
    });
    match export_format {
        ExportFormat::Svg => exporter.export_svg(&figure, &args.out),
        ExportFormat::Png => exporter.export_png(&figure, &args.out),
    }
    .map_err(|e| CliError::rendering(e.to_string()))?;

    store.post_clean();

    if let Some(path) = &args.snapshot {
        let snapshot = store.snapshot().map_err(CliError::from)?;
        let content =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        log::info!("Wrote session snapshot to {}", path.display());
    }

    log::info!("Plot written to {}", args.out.display());
    Ok(())
}

/// Seed the store with the configuration file values.
fn apply_config(config: &Config, store: &ConfigurationStore) -> Result<()> {
    let o = store.options();
    let source = &config.source;
    let diagram = &config.diagram;

    let format = parse_color_format(&source.color_format)?;
    store.set(&o.source_color_format, format);
    handlers::change_source_colorspace(store, &source.colorspace).map_err(CliError::from)?;
    handlers::change_force_linear(store, source.force_linear);
    handlers::change_image_samples(store, source.image_samples).map_err(CliError::from)?;
    report_issues(store)?;

    handlers::change_diagram_method(store, &diagram.method).map_err(CliError::from)?;
    store.set(&o.marker_style, parse_marker(&diagram.marker)?);
    store.set(&o.scatter_size, diagram.scatter_size);
    store.set(&o.scatter_color, diagram.scatter_color.clone());
    store.set(&o.scatter_color_rgb, diagram.scatter_color_rgb);
    store.set(&o.scatter_alpha, diagram.scatter_alpha);
    store.set(&o.locus_show, diagram.show_spectral_locus);
    store.set(&o.locus_color_rgb, diagram.locus_color_rgb);
    store.set(&o.locus_background_rgb, diagram.show_diagram_colours);
    store.set(&o.pointer_gamut_show, diagram.show_pointer_gamut);
    store.set(&o.pointer_gamut_alpha, diagram.pointer_gamut_alpha);
    store.set(&o.show_whitepoint, diagram.show_whitepoints);
    store.set(&o.show_legend, diagram.show_legend);
    store.set(&o.show_axes, diagram.show_axes);
    store.set(&o.show_grid, diagram.show_grid);
    store.set(&o.transparent_background, diagram.transparent_background);

    let mut style = store.get(&o.style);
    style.set("figure.size_cm", StyleValue::Number(diagram.figure_size_cm));
    style.set("font.size", StyleValue::Number(diagram.font_size));
    store.set(&o.style, style);
    Ok(())
}

fn apply_source(store: &ConfigurationStore, args: &PlotArgs) -> Result<()> {
    let o = store.options();

    // Hexadecimal is applied last so the colorspace and linear checks see the old format.
    let format = args.color_format.as_deref().map(parse_color_format).transpose()?;
    let to_hex = format == Some(ColorStringFormat::Hexadecimal);
    if let Some(format) = format.filter(|_| !to_hex) {
        handlers::change_color_format(store, format);
    }
    if let Some(name) = &args.colorspace {
        handlers::change_source_colorspace(store, name).map_err(CliError::from)?;
    }
    if args.force_linear {
        handlers::change_force_linear(store, true);
    }
    if to_hex {
        handlers::change_color_format(store, ColorStringFormat::Hexadecimal);
    }
    report_issues(store)?;

    if let Some(value) = &args.color {
        store.set(&o.source_type, SourceType::Color);
        let shown = handlers::submit_color_string(store, value);
        report_issues(store)?;
        log::info!("Source colour: {}", shown);
    }

    if let Some(path) = &args.image {
        if !path.exists() {
            return Err(CliError::file_not_found(path.clone()).into());
        }
        let upload = NamedBytes::from_path(path)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;
        let image = handlers::load_image(store, upload, size_limit_from_env())
            .map_err(CliError::from)?;
        log::info!("Source image: {}x{}", image.width(), image.height());
    }

    if let Some(samples) = args.samples {
        handlers::change_image_samples(store, samples).map_err(CliError::from)?;
    }

    Ok(())
}

fn apply_styling(store: &ConfigurationStore, args: &PlotArgs) -> Result<()> {
    let o = store.options();

    if let Some(method) = &args.method {
        handlers::change_diagram_method(store, method).map_err(CliError::from)?;
    }
    if let Some(marker) = &args.marker {
        store.set(&o.marker_style, parse_marker(marker)?);
    }
    if let Some(size) = args.scatter_size {
        if !size.is_finite() || size < 0.0 {
            let message = format!("scatter size must be positive, got {}", size);
            return Err(CliError::validation(message).into());
        }
        store.set(&o.scatter_size, size);
    }
    if args.pointer_gamut {
        store.set(&o.pointer_gamut_show, true);
    }
    if args.grid {
        store.set(&o.show_grid, true);
    }
    if args.diagram_colours {
        store.set(&o.locus_background_rgb, true);
    }
    if args.transparent {
        store.set(&o.transparent_background, true);
    }

    if !args.overlay.is_empty() || args.source_overlay_color.is_some() {
        let mut overlays = store.get(&o.figure_colorspaces);
        if let Some(color) = &args.source_overlay_color {
            overlays.set_source_color(color.clone());
        }
        for spec in &args.overlay {
            add_overlay(&mut overlays, spec)?;
        }
        store.set(&o.figure_colorspaces, overlays);
    }

    if let Some(scale) = args.scale {
        handlers::change_axes_scale(store, scale).map_err(CliError::from)?;
    }
    if let Some(offset) = args.offset_x {
        store.set(&o.axes_offset_x, offset);
    }
    if let Some(offset) = args.offset_y {
        store.set(&o.axes_offset_y, offset);
    }
    Ok(())
}

/// Fill the first deselected slot with `NAME[=#RRGGBB]`, appending a slot
/// when all are in use.
fn add_overlay(overlays: &mut OverlayList, spec: &str) -> Result<()> {
    let (name, color) = match spec.split_once('=') {
        Some((name, color)) => (name.trim(), Some(color.trim())),
        None => (spec.trim(), None),
    };
    if name.is_empty() {
        return Err(CliError::invalid_format(format!("empty overlay name in '{}'", spec)).into());
    }

    let slots = overlays.slots_mut();
    match slots.iter_mut().find(|slot| slot.colorspace.is_none()) {
        Some(slot) => {
            slot.colorspace = Some(name.to_string());
            if let Some(color) = color {
                slot.color = color.to_string();
            }
        }
        None => {
            let fallback = OVERLAY_COLORS[slots.len() % OVERLAY_COLORS.len()];
            slots.push(OverlaySlot::new(Some(name), color.unwrap_or(fallback)));
        }
    }
    Ok(())
}

fn parse_color_format(value: &str) -> Result<ColorStringFormat> {
    value
        .parse()
        .map_err(|_| CliError::invalid_format(format!("unknown color format '{}'", value)).into())
}

fn parse_marker(value: &str) -> Result<MarkerShape> {
    value
        .parse()
        .map_err(|e: chromaplot_render::RenderError| CliError::config(e.to_string()).into())
}

/// Surface the issues recorded by the input handlers as a validation error.
fn report_issues(store: &ConfigurationStore) -> Result<()> {
    let messages = handlers::take_issue_messages(store);
    if messages.is_empty() {
        return Ok(());
    }
    for message in &messages {
        log::warn!("{}", message);
    }
    Err(CliError::validation(messages.join(" ")).into())
}

fn detect_export_format(path: &Path) -> ExportFormat {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => ExportFormat::Png,
        _ => ExportFormat::Svg,
    }
}

fn build_provenance_comment(store: &ConfigurationStore, args: &PlotArgs) -> String {
    let o = store.options();
    let source = match store.get(&o.source_type) {
        SourceType::Color => format!("color={}", handlers::color_string(store)),
        SourceType::Image => format!(
            "image={}",
            args.image
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ),
    };
    format!(
        "chromaplot v{} | {} | colorspace={} | method={} | scale={} offset=({}, {})",
        env!("CARGO_PKG_VERSION"),
        source,
        store.resolved_source_colorspace().name(),
        store.get(&o.diagram_method).identifier(),
        store.get(&o.axes_scale),
        store.get(&o.axes_offset_x),
        store.get(&o.axes_offset_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_export_format() {
        assert_eq!(detect_export_format(Path::new("plot.PNG")), ExportFormat::Png);
        assert_eq!(detect_export_format(Path::new("plot.svg")), ExportFormat::Svg);
        assert_eq!(detect_export_format(Path::new("plot")), ExportFormat::Svg);
    }

    #[test]
    fn test_add_overlay_fills_free_slots() {
        let mut overlays = OverlayList::default();
        add_overlay(&mut overlays, "ACEScg").unwrap();
        add_overlay(&mut overlays, "Display P3=#FFFFFF").unwrap();
        assert_eq!(overlays.slots()[0].colorspace.as_deref(), Some("ACEScg"));
        assert_eq!(overlays.slots()[0].color, "#9C27B0");
        assert_eq!(overlays.slots()[1].color, "#FFFFFF");

        for _ in 0..3 {
            add_overlay(&mut overlays, "sRGB").unwrap();
        }
        assert_eq!(overlays.slots().len(), 5);
        assert!(add_overlay(&mut overlays, "=#FFFFFF").is_err());
    }

    #[test]
    fn test_config_is_applied_to_store() {
        let mut config = Config::default();
        config.diagram.method = "cie1931".to_string();
        config.diagram.marker = "^".to_string();
        config.diagram.font_size = 9.0;
        let session = Session::new();
        let store = session.config();
        apply_config(&config, store).unwrap();
        assert_eq!(
            store.get(&store.options().diagram_method),
            chromaplot_core::DiagramMethod::Cie1931
        );
        assert_eq!(store.get(&store.options().marker_style), MarkerShape::TriangleUp);
        assert_eq!(store.get(&store.options().style).number("font.size", 0.0), 9.0);
    }

    #[test]
    fn test_hex_with_linear_is_reported() {
        let session = Session::new();
        let store = session.config();
        handlers::change_force_linear(store, true);
        handlers::change_color_format(store, ColorStringFormat::Hexadecimal);
        assert!(report_issues(store).is_err());
        assert!(report_issues(store).is_ok());
    }
}
