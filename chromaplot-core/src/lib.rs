//! Chromaplot Core Library
//!
//! Colorspaces, colour strings, chromaticity projections and the numeric
//! utilities (image ingestion, decimation, axis-box transform) shared by the
//! renderer and the session store.

pub mod chromaticity;
pub mod color;
pub mod colorspace;
pub mod geometry;
pub mod image_io;

// Re-export commonly used types and functions
pub use chromaticity::DiagramMethod;
pub use color::{
    fix_color_str, format_color, parse_color, validate_color_str, ColorStringFormat,
    ColorStringValidation, RgbColor,
};
pub use colorspace::{
    available_colorspaces, get_colorspace, srgb, ColorError, Colorspace, TransferFunction,
    Whitepoint,
};
pub use geometry::{transform_box, ViewBounds};
pub use image_io::{
    read_image_from_bytes, rescale_image_fast, FloatImage, ImageError, NamedBytes,
};

/// Version information for the chromaplot core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
