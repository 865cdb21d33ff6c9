//! Per-session configuration store.
//!
//! Every option is auto-initialized to its default the first time it is read
//! or written. Derived values (resolved colorspace and colour, the image to
//! plot, the overlay colorspaces) are computed on each call and never cached,
//! so they always reflect the current options.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use chromaplot_core::image_io::decimate;
use chromaplot_core::{
    get_colorspace, srgb, ColorStringFormat, Colorspace, DiagramMethod, FloatImage, RgbColor,
};
use chromaplot_render::{
    plot_rgb_chromaticities_cie1931, plot_rgb_chromaticities_cie1960_ucs,
    plot_rgb_chromaticities_cie1976_ucs, DiagramOptions, Figure, GamutOverlay, MarkerShape,
    Paint, PlotStyle, StyleContext,
};
use image::{ImageBuffer, Rgb};

use crate::options::{
    ConfigOption, OptionType, OptionValue, OverlayList, SourceType, UserIssue,
};
use crate::SessionError;

/// Every option of a session, with its identifier and default.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub source_type: ConfigOption<SourceType>,
    pub diagram_method: ConfigOption<DiagramMethod>,
    pub locus_show: ConfigOption<bool>,
    pub locus_background_rgb: ConfigOption<bool>,
    pub locus_color_rgb: ConfigOption<bool>,
    pub locus_color: ConfigOption<String>,
    pub locus_alpha: ConfigOption<f64>,
    pub transparent_background: ConfigOption<bool>,
    pub source_color: ConfigOption<RgbColor>,
    pub source_colorspace: ConfigOption<Colorspace>,
    pub source_force_linear: ConfigOption<bool>,
    pub source_color_format: ConfigOption<ColorStringFormat>,
    pub source_error: ConfigOption<UserIssue>,
    pub scatter_size: ConfigOption<f64>,
    pub scatter_color: ConfigOption<String>,
    pub scatter_color_rgb: ConfigOption<bool>,
    pub scatter_alpha: ConfigOption<f64>,
    pub marker_style: ConfigOption<MarkerShape>,
    pub pointer_gamut_show: ConfigOption<bool>,
    pub pointer_gamut_color: ConfigOption<String>,
    pub pointer_gamut_alpha: ConfigOption<f64>,
    pub show_whitepoint: ConfigOption<bool>,
    pub figure_colorspaces: ConfigOption<OverlayList>,
    pub show_legend: ConfigOption<bool>,
    pub show_axes: ConfigOption<bool>,
    pub style: ConfigOption<PlotStyle>,
    pub show_grid: ConfigOption<bool>,
    pub grid_color: ConfigOption<String>,
    pub grid_alpha: ConfigOption<f64>,
    pub axes_scale: ConfigOption<f64>,
    pub axes_offset_x: ConfigOption<f64>,
    pub axes_offset_y: ConfigOption<f64>,
    pub image: ConfigOption<Option<Arc<FloatImage>>>,
    pub image_samples: ConfigOption<u32>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            source_type: ConfigOption::new("source_type", SourceType::Color),
            diagram_method: ConfigOption::new("diagram_method", DiagramMethod::Cie1976Ucs),
            locus_show: ConfigOption::new("locus_show", true),
            locus_background_rgb: ConfigOption::new("locus_background_rgb", false),
            locus_color_rgb: ConfigOption::new("locus_color_rgb", true),
            locus_color: ConfigOption::new("locus_color", "#FFFFFF".to_string()),
            locus_alpha: ConfigOption::new("locus_alpha", 1.0),
            transparent_background: ConfigOption::new("transparent_background", false),
            source_color: ConfigOption::new("source_color", RgbColor::black()),
            source_colorspace: ConfigOption::new("source_colorspace", srgb()),
            source_force_linear: ConfigOption::new("source_force_linear", false),
            source_color_format: ConfigOption::new(
                "source_color_format",
                ColorStringFormat::FloatD4,
            ),
            source_error: ConfigOption::new("source_error", UserIssue::empty()),
            scatter_size: ConfigOption::new("scatter_size", 25.0),
            scatter_color: ConfigOption::new("scatter_color", "#53DD97".to_string()),
            scatter_color_rgb: ConfigOption::new("scatter_color_rgb", true),
            scatter_alpha: ConfigOption::new("scatter_alpha", 1.0),
            marker_style: ConfigOption::new("marker_style", MarkerShape::Circle),
            pointer_gamut_show: ConfigOption::new("pointer_gamut_show", false),
            pointer_gamut_color: ConfigOption::new("pointer_gamut_color", "#FFFFFF".to_string()),
            pointer_gamut_alpha: ConfigOption::new("pointer_gamut_alpha", 1.0),
            show_whitepoint: ConfigOption::new("show_whitepoint", true),
            figure_colorspaces: ConfigOption::new("figure_colorspaces", OverlayList::default()),
            show_legend: ConfigOption::new("show_legend", true),
            show_axes: ConfigOption::new("show_axes", true),
            style: ConfigOption::new("style", PlotStyle::dark()),
            show_grid: ConfigOption::new("show_grid", false),
            grid_color: ConfigOption::new("grid_color", "#333333".to_string()),
            grid_alpha: ConfigOption::new("grid_alpha", 1.0),
            axes_scale: ConfigOption::new("axes_scale", 1.0),
            axes_offset_x: ConfigOption::new("axes_offset_x", 0.0),
            axes_offset_y: ConfigOption::new("axes_offset_y", 0.0),
            image: ConfigOption::new("image", None),
            image_samples: ConfigOption::new("image_samples", 10),
        }
    }
}

impl StoreOptions {
    fn default_entries(&self) -> Vec<(&'static str, OptionValue)> {
        vec![
            self.source_type.default_entry(),
            self.diagram_method.default_entry(),
            self.locus_show.default_entry(),
            self.locus_background_rgb.default_entry(),
            self.locus_color_rgb.default_entry(),
            self.locus_color.default_entry(),
            self.locus_alpha.default_entry(),
            self.transparent_background.default_entry(),
            self.source_color.default_entry(),
            self.source_colorspace.default_entry(),
            self.source_force_linear.default_entry(),
            self.source_color_format.default_entry(),
            self.source_error.default_entry(),
            self.scatter_size.default_entry(),
            self.scatter_color.default_entry(),
            self.scatter_color_rgb.default_entry(),
            self.scatter_alpha.default_entry(),
            self.marker_style.default_entry(),
            self.pointer_gamut_show.default_entry(),
            self.pointer_gamut_color.default_entry(),
            self.pointer_gamut_alpha.default_entry(),
            self.show_whitepoint.default_entry(),
            self.figure_colorspaces.default_entry(),
            self.show_legend.default_entry(),
            self.show_axes.default_entry(),
            self.style.default_entry(),
            self.show_grid.default_entry(),
            self.grid_color.default_entry(),
            self.grid_alpha.default_entry(),
            self.axes_scale.default_entry(),
            self.axes_offset_x.default_entry(),
            self.axes_offset_y.default_entry(),
            self.image.default_entry(),
            self.image_samples.default_entry(),
        ]
    }
}

/// All user-adjustable plotting parameters of one session.
///
/// Reads initialize options lazily, hence the interior mutability. The store
/// is owned by a single session and is not meant to be shared across threads.
#[derive(Debug)]
pub struct ConfigurationStore {
    options: StoreOptions,
    defaults: HashMap<&'static str, OptionValue>,
    values: RefCell<HashMap<&'static str, OptionValue>>,
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationStore {
    pub fn new() -> Self {
        let options = StoreOptions::default();
        let defaults = options.default_entries().into_iter().collect();
        Self {
            options,
            defaults,
            values: RefCell::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Identifiers of every option, in no particular order.
    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.defaults.keys().copied()
    }

    /// Whether `identifier` has been read or written since the store was built.
    pub fn is_initialized(&self, identifier: &str) -> bool {
        self.values.borrow().contains_key(identifier)
    }

    pub fn get<T: OptionType>(&self, option: &ConfigOption<T>) -> T {
        let mut values = self.values.borrow_mut();
        let value = values
            .entry(option.identifier())
            .or_insert_with(|| option.default_value().clone().into_value());
        T::from_value(value).unwrap_or_else(|| {
            log::warn!(
                "Option '{}' holds a {} value, using its default",
                option.identifier(),
                value.kind()
            );
            option.default_value().clone()
        })
    }

    pub fn set<T: OptionType>(&self, option: &ConfigOption<T>, value: T) {
        self.values
            .borrow_mut()
            .insert(option.identifier(), value.into_value());
    }

    /// Untyped read by identifier.
    pub fn get_option(&self, identifier: &str) -> Result<OptionValue, SessionError> {
        let (key, default) = self
            .defaults
            .get_key_value(identifier)
            .ok_or_else(|| SessionError::UnknownOption(identifier.to_string()))?;
        Ok(self
            .values
            .borrow_mut()
            .entry(*key)
            .or_insert_with(|| default.clone())
            .clone())
    }

    /// Untyped write by identifier. Only the value's type is checked.
    pub fn set_option(&self, identifier: &str, value: OptionValue) -> Result<(), SessionError> {
        let (key, default) = self
            .defaults
            .get_key_value(identifier)
            .ok_or_else(|| SessionError::UnknownOption(identifier.to_string()))?;
        if !default.same_kind(&value) {
            return Err(SessionError::TypeMismatch {
                identifier: identifier.to_string(),
                expected: default.kind(),
                found: value.kind(),
            });
        }
        self.values.borrow_mut().insert(*key, value);
        Ok(())
    }

    /// Source colorspace, as its linear variant when forced linear.
    pub fn resolved_source_colorspace(&self) -> Colorspace {
        let colorspace = self.get(&self.options.source_colorspace);
        if self.get(&self.options.source_force_linear) {
            colorspace.as_linear_copy()
        } else {
            colorspace
        }
    }

    /// Source colour expressed in [`Self::resolved_source_colorspace`].
    pub fn resolved_color(&self) -> RgbColor {
        self.get(&self.options.source_color)
            .with_colorspace(self.resolved_source_colorspace())
    }

    /// Image handed to the diagram renderer.
    ///
    /// Colour sources give a 2x2 constant image. Image sources are decimated
    /// by `image_samples` and decoded to linear light; a 2x2 black image
    /// stands in until an image is uploaded.
    pub fn generate_image(&self) -> FloatImage {
        match self.get(&self.options.source_type) {
            SourceType::Color => {
                let [r, g, b] = self.resolved_color().to_array();
                ImageBuffer::from_pixel(2, 2, Rgb([r as f32, g as f32, b as f32]))
            }
            SourceType::Image => {
                let Some(image) = self.get(&self.options.image) else {
                    log::debug!("No image uploaded, using placeholder");
                    return ImageBuffer::from_pixel(2, 2, Rgb([0.0, 0.0, 0.0]));
                };
                let samples = self.get(&self.options.image_samples).max(1);
                let mut image = if image.width() > samples || image.height() > samples {
                    decimate(image.as_ref(), samples, samples)
                } else {
                    image.as_ref().clone()
                };
                log::debug!(
                    "Sampled image to {}x{} with stride {}",
                    image.width(),
                    image.height(),
                    samples
                );
                let colorspace = self.resolved_source_colorspace();
                if !colorspace.is_linear() {
                    colorspace.decode_image(&mut image);
                }
                image
            }
        }
    }

    /// Overlay colorspaces with their display colours, in list order.
    ///
    /// The source entry resolves to the current resolved source colorspace.
    /// A colorspace listed twice keeps its first position and its last colour.
    pub fn resolve_overlay_colorspaces(&self) -> Result<Vec<GamutOverlay>, SessionError> {
        let overlays = self.get(&self.options.figure_colorspaces);
        let mut resolved: Vec<GamutOverlay> = Vec::with_capacity(overlays.len());

        let source = GamutOverlay {
            colorspace: self.resolved_source_colorspace(),
            paint: parse_paint("figure_colorspaces", overlays.source_color())?,
        };
        resolved.push(source);

        for slot in overlays.slots() {
            let Some(name) = &slot.colorspace else {
                continue;
            };
            let colorspace = get_colorspace(name)?;
            let paint = parse_paint("figure_colorspaces", &slot.color)?;
            match resolved.iter_mut().find(|o| o.colorspace == colorspace) {
                Some(existing) => existing.paint = paint,
                None => resolved.push(GamutOverlay { colorspace, paint }),
            }
        }
        Ok(resolved)
    }

    /// Renderer options assembled from the styling options.
    pub fn diagram_options(&self) -> Result<DiagramOptions, SessionError> {
        let o = &self.options;
        let pointer_gamut = if self.get(&o.pointer_gamut_show) {
            let color = self.get(&o.pointer_gamut_color);
            let paint = parse_paint(o.pointer_gamut_color.identifier(), &color)?;
            Some(paint.with_alpha(self.get(&o.pointer_gamut_alpha)))
        } else {
            None
        };
        let grid_paint = parse_paint(o.grid_color.identifier(), &self.get(&o.grid_color))?
            .with_alpha(self.get(&o.grid_alpha));

        Ok(DiagramOptions {
            scatter_size: self.get(&o.scatter_size),
            scatter_rgb: self.get(&o.scatter_color_rgb),
            scatter_paint: parse_paint(o.scatter_color.identifier(), &self.get(&o.scatter_color))?,
            scatter_alpha: self.get(&o.scatter_alpha),
            marker: self.get(&o.marker_style),
            show_spectral_locus: self.get(&o.locus_show),
            locus_rgb: self.get(&o.locus_color_rgb),
            locus_paint: parse_paint(o.locus_color.identifier(), &self.get(&o.locus_color))?,
            locus_alpha: self.get(&o.locus_alpha),
            show_diagram_colours: self.get(&o.locus_background_rgb),
            pointer_gamut,
            show_whitepoints: self.get(&o.show_whitepoint),
            show_legend: self.get(&o.show_legend),
            show_axes: self.get(&o.show_axes),
            show_grid: self.get(&o.show_grid),
            grid_paint,
            transparent_background: self.get(&o.transparent_background),
            // generate_image already decodes uploaded images
            decode_transfer: self.get(&o.source_type) == SourceType::Color,
        })
    }

    /// Build the chromaticity diagram for the current options.
    ///
    /// The session style is applied for the duration of the call only, and
    /// the axes view is scaled and offset afterwards.
    pub fn generate_plot(&self) -> Result<Figure, SessionError> {
        let image = self.generate_image();
        let colorspace = self.resolved_source_colorspace();
        let overlays = self.resolve_overlay_colorspaces()?;
        let options = self.diagram_options()?;
        let method = self.get(&self.options.diagram_method);
        log::info!(
            "Generating {} plot of {} with {} overlay(s)",
            method,
            colorspace.name(),
            overlays.len()
        );

        let style = self.get(&self.options.style);
        let mut figure = {
            let _style = StyleContext::enter(&style);
            match method {
                DiagramMethod::Cie1931 => {
                    plot_rgb_chromaticities_cie1931(&image, &colorspace, &overlays, &options)
                }
                DiagramMethod::Cie1960Ucs => {
                    plot_rgb_chromaticities_cie1960_ucs(&image, &colorspace, &overlays, &options)
                }
                DiagramMethod::Cie1976Ucs => {
                    plot_rgb_chromaticities_cie1976_ucs(&image, &colorspace, &overlays, &options)
                }
            }?
        };

        figure.axes.apply_transform(
            self.get(&self.options.axes_scale),
            self.get(&self.options.axes_offset_x),
            self.get(&self.options.axes_offset_y),
        );
        Ok(figure)
    }

    /// Release the uploaded image buffer once a figure has been produced.
    pub fn post_clean(&self) {
        if self.get(&self.options.image).is_some() {
            log::debug!("Releasing uploaded image buffer");
        }
        self.set(&self.options.image, None);
    }

    /// JSON object of every option except the image buffer.
    pub fn snapshot(&self) -> Result<serde_json::Value, SessionError> {
        let mut map = serde_json::Map::new();
        let mut identifiers: Vec<&'static str> = self.identifiers().collect();
        identifiers.sort_unstable();
        for identifier in identifiers {
            if let Some(json) = self.get_option(identifier)?.to_json()? {
                map.insert(identifier.to_string(), json);
            }
        }
        Ok(serde_json::Value::Object(map))
    }

    /// Apply a snapshot produced by [`Self::snapshot`]. Options absent from
    /// it keep their current value.
    pub fn restore(&self, snapshot: &serde_json::Value) -> Result<(), SessionError> {
        let map = snapshot.as_object().ok_or_else(|| SessionError::InvalidValue {
            identifier: "snapshot".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;
        let mut parsed = Vec::with_capacity(map.len());
        for (identifier, json) in map {
            let default = self
                .defaults
                .get(identifier.as_str())
                .ok_or_else(|| SessionError::UnknownOption(identifier.clone()))?;
            parsed.push((identifier.as_str(), default.from_json_like(json.clone())?));
        }
        for (identifier, value) in parsed {
            self.set_option(identifier, value)?;
        }
        log::info!("Restored {} option(s) from snapshot", map.len());
        Ok(())
    }
}

fn parse_paint(identifier: &str, hex: &str) -> Result<Paint, SessionError> {
    Paint::from_hex(hex).ok_or_else(|| SessionError::InvalidValue {
        identifier: identifier.to_string(),
        reason: format!("'{}' is not a hexadecimal color", hex),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OverlaySlot;

    #[test]
    fn test_lazy_initialization() {
        let store = ConfigurationStore::new();
        assert!(!store.is_initialized("scatter_size"));
        assert_eq!(store.get(&store.options().scatter_size), 25.0);
        assert!(store.is_initialized("scatter_size"));

        store.set(&store.options().scatter_size, 40.0);
        assert_eq!(store.get_option("scatter_size").unwrap(), OptionValue::Float(40.0));
    }

    #[test]
    fn test_set_option_checks_type_only() {
        let store = ConfigurationStore::new();
        assert!(matches!(
            store.set_option("scatter_size", OptionValue::Bool(true)),
            Err(SessionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.get_option("no_such_option"),
            Err(SessionError::UnknownOption(_))
        ));
        // no range validation at this level
        store.set_option("axes_scale", OptionValue::Float(-2.0)).unwrap();
        assert_eq!(store.get(&store.options().axes_scale), -2.0);
    }

    #[test]
    fn test_resolved_colorspace_follows_force_linear() {
        let store = ConfigurationStore::new();
        let o = store.options();
        store.set(&o.source_colorspace, get_colorspace("Display P3").unwrap());
        assert_eq!(store.resolved_source_colorspace().name(), "Display P3");
        store.set(&o.source_force_linear, true);
        let resolved = store.resolved_source_colorspace();
        assert!(resolved.is_linear());
        assert_eq!(store.resolved_color().colorspace, resolved);
    }

    #[test]
    fn test_color_mode_image_is_constant() {
        let store = ConfigurationStore::new();
        let o = store.options();
        store.set(&o.source_color, RgbColor::new(0.25, 0.5, 0.75, srgb()));
        store.set(&o.image_samples, 1);
        let image = store.generate_image();
        assert_eq!(image.dimensions(), (2, 2));
        for pixel in image.pixels() {
            assert_eq!(pixel.0, [0.25, 0.5, 0.75]);
        }
    }

    #[test]
    fn test_image_mode_samples_and_decodes() {
        let store = ConfigurationStore::new();
        let o = store.options();
        store.set(&o.source_type, SourceType::Image);
        assert_eq!(store.generate_image().dimensions(), (2, 2));

        let uploaded: FloatImage = ImageBuffer::from_pixel(25, 8, Rgb([1.0, 0.5, 0.0]));
        store.set(&o.image, Some(Arc::new(uploaded)));
        store.set(&o.image_samples, 10);
        let image = store.generate_image();
        assert_eq!(image.dimensions(), (3, 1));
        let px = image.get_pixel(0, 0);
        assert!((px[0] - 1.0).abs() < 1e-6);
        assert!((px[1] - 0.214_041).abs() < 1e-4);

        store.set(&o.source_force_linear, true);
        assert!((store.generate_image().get_pixel(0, 0)[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_overlays_resolve_dynamically() {
        let store = ConfigurationStore::new();
        let o = store.options();
        let first = store.resolve_overlay_colorspaces().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].colorspace, store.resolved_source_colorspace());

        store.set(&o.source_colorspace, get_colorspace("ACEScg").unwrap());
        let second = store.resolve_overlay_colorspaces().unwrap();
        assert_eq!(second[0].colorspace.name(), "ACEScg");
        assert_eq!(second[0].colorspace, store.resolved_source_colorspace());
    }

    #[test]
    fn test_overlay_duplicates_update_color() {
        let store = ConfigurationStore::new();
        let mut overlays = OverlayList::default();
        overlays.slots_mut()[0] = OverlaySlot::new(Some("ITU-R BT.2020"), "#9C27B0");
        overlays.slots_mut()[2] = OverlaySlot::new(Some("ITU-R BT.2020"), "#03A9F4");
        overlays.slots_mut()[3] = OverlaySlot::new(Some("sRGB"), "#009688");
        store.set(&store.options().figure_colorspaces, overlays);

        let resolved = store.resolve_overlay_colorspaces().unwrap();
        let names: Vec<&str> = resolved.iter().map(|o| o.colorspace.name()).collect();
        assert_eq!(names, vec!["sRGB", "ITU-R BT.2020"]);
        assert_eq!(resolved[0].paint.to_hex(), "#009688");
        assert_eq!(resolved[1].paint.to_hex(), "#03A9F4");
    }

    #[test]
    fn test_unknown_overlay_name_is_fatal() {
        let store = ConfigurationStore::new();
        let mut overlays = OverlayList::default();
        overlays.slots_mut()[0].colorspace = Some("Not A Colorspace".to_string());
        store.set(&store.options().figure_colorspaces, overlays);
        assert!(matches!(
            store.resolve_overlay_colorspaces(),
            Err(SessionError::Color(_))
        ));
        assert!(store.generate_plot().is_err());
    }

    #[test]
    fn test_post_clean_releases_image() {
        let store = ConfigurationStore::new();
        let o = store.options();
        store.set(&o.image, Some(Arc::new(ImageBuffer::new(4, 4))));
        store.post_clean();
        assert!(store.get(&o.image).is_none());
    }

    #[test]
    fn test_snapshot_restore() {
        let store = ConfigurationStore::new();
        let o = store.options();
        store.set(&o.diagram_method, DiagramMethod::Cie1931);
        store.set(&o.marker_style, MarkerShape::Star);
        store.set(&o.image, Some(Arc::new(ImageBuffer::new(4, 4))));

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot["diagram_method"], serde_json::json!("cie1931"));
        assert_eq!(snapshot["marker_style"], serde_json::json!("star"));
        assert!(snapshot.get("image").is_none());

        let other = ConfigurationStore::new();
        other.restore(&snapshot).unwrap();
        assert_eq!(other.get(&other.options().diagram_method), DiagramMethod::Cie1931);
        assert_eq!(other.get(&other.options().marker_style), MarkerShape::Star);
        assert!(other.get(&other.options().image).is_none());

        let bad = serde_json::json!({ "diagram_method": "cie2000" });
        assert!(other.restore(&bad).is_err());
        assert_eq!(other.get(&other.options().diagram_method), DiagramMethod::Cie1931);
    }
}
