//! Event handlers sitting between user input and the store.
//!
//! They validate raw input before it reaches the store, revert changes that
//! would leave the source options in a contradictory state, and record the
//! reason as a [`UserIssue`] for the next time messages are displayed.

use std::sync::Arc;

use chromaplot_core::{
    fix_color_str, format_color, get_colorspace, parse_color, read_image_from_bytes, srgb,
    validate_color_str, ColorStringFormat, ColorStringValidation, Colorspace, DiagramMethod,
    FloatImage, NamedBytes,
};
use chromaplot_core::rescale_image_fast;
use image::{ImageBuffer, Rgb, RgbImage};

use crate::options::{SourceType, UserIssue};
use crate::store::ConfigurationStore;
use crate::SessionError;

/// Environment variable lifting the upload dimension limit.
pub const SIZE_LIMIT_ENV: &str = "CHROMAPLOT_DISABLE_SIZE_LIMITATIONS";

/// Largest accepted width or height of an uploaded image.
pub const MAX_IMAGE_DIMENSION: u32 = 2048;

/// Upload limit in effect, `None` when disabled through [`SIZE_LIMIT_ENV`].
pub fn size_limit_from_env() -> Option<u32> {
    match std::env::var(SIZE_LIMIT_ENV) {
        Ok(value) if !value.is_empty() => None,
        _ => Some(MAX_IMAGE_DIMENSION),
    }
}

fn flag(store: &ConfigurationStore, issue: UserIssue) {
    let mut issues = store.get(&store.options().source_error);
    issues.insert(issue);
    store.set(&store.options().source_error, issues);
}

fn is_srgb(colorspace: &Colorspace) -> bool {
    colorspace.name() == srgb().name()
}

/// Text currently shown for the source colour.
pub fn color_string(store: &ConfigurationStore) -> String {
    let o = store.options();
    format_color(&store.get(&o.source_color), store.get(&o.source_color_format))
}

/// Handle a colour typed by the user and return the text to display back.
///
/// Invalid input flags [`UserIssue::VALUE_ERROR`] and keeps the previous
/// colour; fixable input is normalized before being stored.
pub fn submit_color_string(store: &ConfigurationStore, value: &str) -> String {
    let o = store.options();
    let format = store.get(&o.source_color_format);

    if validate_color_str(value, format) == ColorStringValidation::Invalid {
        log::debug!("Rejected color string '{}'", value);
        flag(store, UserIssue::VALUE_ERROR);
        return color_string(store);
    }

    let fixed = fix_color_str(value, format).unwrap_or_else(|| value.to_string());
    match parse_color(&fixed, format, store.get(&o.source_colorspace)) {
        Ok(color) => {
            store.set(&o.source_color, color);
            fixed
        }
        Err(error) => {
            log::debug!("Could not parse '{}': {}", fixed, error);
            flag(store, UserIssue::VALUE_ERROR);
            color_string(store)
        }
    }
}

/// Switch the colour string format and return the colour re-rendered in it.
///
/// Hexadecimal is only allowed for non-linear sRGB.
pub fn change_color_format(store: &ConfigurationStore, format: ColorStringFormat) -> String {
    let o = store.options();
    if format == ColorStringFormat::Hexadecimal {
        let mut rejected = false;
        if !is_srgb(&store.get(&o.source_colorspace)) {
            flag(store, UserIssue::HEX_COLORSPACE);
            rejected = true;
        }
        if store.get(&o.source_force_linear) {
            flag(store, UserIssue::HEX_FORCE_LINEAR);
            rejected = true;
        }
        if rejected {
            return color_string(store);
        }
    }
    store.set(&o.source_color_format, format);
    color_string(store)
}

/// Select the source colorspace by registry name.
///
/// Unknown names are an error; a non-sRGB choice while the hexadecimal format
/// is active is reverted and flagged.
pub fn change_source_colorspace(
    store: &ConfigurationStore,
    name: &str,
) -> Result<(), SessionError> {
    let o = store.options();
    let colorspace = get_colorspace(name)?;
    if store.get(&o.source_color_format) == ColorStringFormat::Hexadecimal && !is_srgb(&colorspace)
    {
        flag(store, UserIssue::HEX_COLORSPACE);
        return Ok(());
    }
    store.set(&o.source_colorspace, colorspace);
    Ok(())
}

/// Toggle forced-linear decoding; refused while the hexadecimal format is active.
pub fn change_force_linear(store: &ConfigurationStore, force_linear: bool) {
    let o = store.options();
    if force_linear && store.get(&o.source_color_format) == ColorStringFormat::Hexadecimal {
        flag(store, UserIssue::HEX_FORCE_LINEAR);
        return;
    }
    store.set(&o.source_force_linear, force_linear);
}

/// Select the projection method from its label or identifier.
pub fn change_diagram_method(store: &ConfigurationStore, label: &str) -> Result<(), SessionError> {
    let method: DiagramMethod = label.parse()?;
    store.set(&store.options().diagram_method, method);
    Ok(())
}

/// Set the zoom factor of the axes view. Must be strictly positive.
pub fn change_axes_scale(store: &ConfigurationStore, scale: f64) -> Result<(), SessionError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(SessionError::InvalidValue {
            identifier: store.options().axes_scale.identifier().to_string(),
            reason: format!("must be strictly positive, got {}", scale),
        });
    }
    store.set(&store.options().axes_scale, scale);
    Ok(())
}

/// Set the image sampling stride. Must be at least 1.
pub fn change_image_samples(store: &ConfigurationStore, samples: u32) -> Result<(), SessionError> {
    if samples == 0 {
        return Err(SessionError::InvalidValue {
            identifier: store.options().image_samples.identifier().to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    store.set(&store.options().image_samples, samples);
    Ok(())
}

/// Decode an uploaded file and store it as the image source.
///
/// On failure the stored image is cleared and the error returned for the
/// caller to display.
pub fn load_image(
    store: &ConfigurationStore,
    mut upload: NamedBytes,
    size_limit: Option<u32>,
) -> Result<Arc<FloatImage>, SessionError> {
    let o = store.options();
    let decoded = read_image_from_bytes(&mut upload)
        .map_err(SessionError::from)
        .and_then(|image| match size_limit {
            Some(limit) if image.width() > limit || image.height() > limit => {
                Err(SessionError::ImageTooLarge {
                    width: image.width(),
                    height: image.height(),
                    limit,
                })
            }
            _ => Ok(image),
        });

    match decoded {
        Ok(image) => {
            log::info!("Uploaded {} ({}x{})", upload.name, image.width(), image.height());
            let image = Arc::new(image);
            store.set(&o.image, Some(Arc::clone(&image)));
            store.set(&o.source_type, SourceType::Image);
            Ok(image)
        }
        Err(error) => {
            log::warn!("Can't read provided image {}: {}", upload.name, error);
            store.set(&o.image, None);
            Err(error)
        }
    }
}

/// [`load_image`], returning an sRGB preview about 200 pixels wide.
pub fn upload_image(
    store: &ConfigurationStore,
    upload: NamedBytes,
    size_limit: Option<u32>,
) -> Result<RgbImage, SessionError> {
    let image = load_image(store, upload, size_limit)?;
    Ok(image_preview(&image, &store.get(&store.options().source_colorspace), 200))
}

/// Low quality 8-bit sRGB thumbnail of an image in `colorspace`.
pub fn image_preview(image: &FloatImage, colorspace: &Colorspace, target_width: u32) -> RgbImage {
    let mut preview = rescale_image_fast(image, target_width);
    let display = srgb();
    let matrix = colorspace.conversion_matrix_to(&display);
    colorspace.decode_image(&mut preview);
    for pixel in preview.pixels_mut() {
        let linear = nalgebra::Vector3::new(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
        let rgb = matrix * linear;
        *pixel = Rgb([rgb[0] as f32, rgb[1] as f32, rgb[2] as f32]);
    }
    display.encode_image(&mut preview);
    to_rgb8(&preview)
}

/// 32x32 sRGB swatch of the source colour.
pub fn color_preview(store: &ConfigurationStore) -> RgbImage {
    let color = store.get(&store.options().source_color).as_colorspace(&srgb());
    let [r, g, b] = color.to_array().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
    ImageBuffer::from_pixel(32, 32, Rgb([r, g, b]))
}

fn to_rgb8(image: &FloatImage) -> RgbImage {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        Rgb(px.0.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

/// Messages for the issues recorded since the last call, which are cleared.
pub fn take_issue_messages(store: &ConfigurationStore) -> Vec<String> {
    let o = store.options();
    let issues = store.get(&o.source_error);
    store.set(&o.source_error, UserIssue::empty());
    issues.messages().into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromaplot_core::RgbColor;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let red = ImageBuffer::from_pixel(width, height, Rgb([255, 0, 0]));
        let image = DynamicImage::ImageRgb8(red);
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_submit_valid_and_invalid_colors() {
        let store = ConfigurationStore::new();
        assert_eq!(color_string(&store), "0.0000, 0.0000, 0.0000");

        let shown = submit_color_string(&store, "0.5, 0.25, 1");
        assert_eq!(shown, "0.5000, 0.2500, 1.0000");
        assert_eq!(store.get(&store.options().source_color).to_array(), [0.5, 0.25, 1.0]);

        let shown = submit_color_string(&store, "not a colour");
        assert_eq!(shown, "0.5000, 0.2500, 1.0000");
        assert!(store.get(&store.options().source_error).contains(UserIssue::VALUE_ERROR));
        assert_eq!(take_issue_messages(&store).len(), 1);
        assert!(take_issue_messages(&store).is_empty());
    }

    #[test]
    fn test_format_change_rerenders() {
        let store = ConfigurationStore::new();
        store.set(&store.options().source_color, RgbColor::new(1.0, 0.0, 0.5, srgb()));
        assert_eq!(change_color_format(&store, ColorStringFormat::Int8), "255, 0, 128");
        assert_eq!(change_color_format(&store, ColorStringFormat::Hexadecimal), "#FF0080");
    }

    #[test]
    fn test_hex_rejected_for_other_colorspaces() {
        let store = ConfigurationStore::new();
        change_source_colorspace(&store, "Display P3").unwrap();
        change_color_format(&store, ColorStringFormat::Hexadecimal);
        assert_eq!(store.get(&store.options().source_color_format), ColorStringFormat::FloatD4);
        assert!(store.get(&store.options().source_error).contains(UserIssue::HEX_COLORSPACE));
    }

    #[test]
    fn test_hex_blocks_colorspace_and_linear_changes() {
        let store = ConfigurationStore::new();
        change_color_format(&store, ColorStringFormat::Hexadecimal);
        change_source_colorspace(&store, "ACEScg").unwrap();
        assert_eq!(store.get(&store.options().source_colorspace).name(), "sRGB");
        change_force_linear(&store, true);
        assert!(!store.get(&store.options().source_force_linear));

        let issues = store.get(&store.options().source_error);
        assert!(issues.contains(UserIssue::HEX_COLORSPACE | UserIssue::HEX_FORCE_LINEAR));
        assert_eq!(take_issue_messages(&store).len(), 2);
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let store = ConfigurationStore::new();
        assert!(change_source_colorspace(&store, "Nope").is_err());
        assert!(change_diagram_method(&store, "CIE 2000").is_err());
        change_diagram_method(&store, "CIE 1931").unwrap();
        assert_eq!(store.get(&store.options().diagram_method), DiagramMethod::Cie1931);
    }

    #[test]
    fn test_range_checked_setters() {
        let store = ConfigurationStore::new();
        assert!(change_axes_scale(&store, 0.0).is_err());
        assert!(change_axes_scale(&store, -1.0).is_err());
        change_axes_scale(&store, 0.5).unwrap();
        assert!(change_image_samples(&store, 0).is_err());
        change_image_samples(&store, 3).unwrap();
        assert_eq!(store.get(&store.options().image_samples), 3);
    }

    #[test]
    fn test_upload_sets_image_source() {
        let store = ConfigurationStore::new();
        let upload = NamedBytes::new("red.png", png_bytes(400, 100));
        let preview = upload_image(&store, upload, Some(2048)).unwrap();
        assert_eq!(preview.width(), 200);
        assert_eq!(preview.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(store.get(&store.options().source_type), SourceType::Image);
        assert!(store.get(&store.options().image).is_some());
    }

    #[test]
    fn test_load_image_keeps_full_resolution() {
        let store = ConfigurationStore::new();
        let upload = NamedBytes::new("red.png", png_bytes(400, 100));
        let image = load_image(&store, upload, None).unwrap();
        assert_eq!(image.dimensions(), (400, 100));
        assert_eq!(image.get_pixel(399, 99).0, [1.0, 0.0, 0.0]);
        let stored = store.get(&store.options().image).unwrap();
        assert!(Arc::ptr_eq(&stored, &image));
        assert_eq!(store.get(&store.options().source_type), SourceType::Image);
    }

    #[test]
    fn test_upload_size_limit() {
        let store = ConfigurationStore::new();
        let result = upload_image(&store, NamedBytes::new("big.png", png_bytes(40, 10)), Some(32));
        assert!(matches!(result, Err(SessionError::ImageTooLarge { width: 40, .. })));
        assert!(store.get(&store.options().image).is_none());
        assert!(upload_image(&store, NamedBytes::new("big.png", png_bytes(40, 10)), None).is_ok());
    }

    #[test]
    fn test_color_preview_is_srgb() {
        let store = ConfigurationStore::new();
        store.set(&store.options().source_color, RgbColor::new(1.0, 1.0, 1.0, srgb()));
        let swatch = color_preview(&store);
        assert_eq!(swatch.dimensions(), (32, 32));
        assert_eq!(swatch.get_pixel(5, 5).0, [255, 255, 255]);
    }
}
