//! Chromaplot Render Library
//!
//! Builds chromaticity diagram figures from images and colorspaces, and
//! exports them to SVG or PNG.

pub mod diagram;
pub mod figure;
pub mod markers;
pub mod paint;
mod raster;
pub mod style;
pub mod vector_export;

use thiserror::Error;

// Re-export commonly used types and functions
pub use diagram::{
    plot_rgb_chromaticities, plot_rgb_chromaticities_cie1931,
    plot_rgb_chromaticities_cie1960_ucs, plot_rgb_chromaticities_cie1976_ucs, DiagramOptions,
    GamutOverlay,
};
pub use figure::{Axes, Element, Figure, LegendEntry};
pub use markers::{MarkerGeometry, MarkerShape};
pub use paint::Paint;
pub use style::{current_style, PlotStyle, StyleContext, StyleValue};
pub use vector_export::{ExportConfig, VectorExporter};

/// Errors raised while building or exporting a figure.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Cannot draw view bounds x {x_min}..{x_max}, y {y_min}..{y_max}")]
    DegenerateView {
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Version information for the chromaplot render library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = RenderError::InvalidOption {
            name: "scatter_size".to_string(),
            reason: "must be positive".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid option 'scatter_size': must be positive");
    }
}
