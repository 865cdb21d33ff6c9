//! Chromaplot Session Library
//!
//! The per-session [`ConfigurationStore`] of typed options, the plot
//! generation built on top of it, and the input handlers that guard it.

pub mod handlers;
pub mod options;
pub mod session;
pub mod store;

use chromaplot_core::{ColorError, ImageError};
use chromaplot_render::RenderError;
use thiserror::Error;

// Re-export commonly used types
pub use options::{
    ConfigOption, OptionType, OptionValue, OverlayList, OverlaySlot, SourceType, UserIssue,
};
pub use session::Session;
pub use store::{ConfigurationStore, StoreOptions};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Option '{identifier}' expects a {expected} value, got {found}")]
    TypeMismatch {
        identifier: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for '{identifier}': {reason}")]
    InvalidValue { identifier: String, reason: String },

    #[error(transparent)]
    Color(#[from] ColorError),

    #[error("Can't read provided image: {0}")]
    Image(#[from] ImageError),

    #[error("Given image has dimensions superior to {limit}x{limit}: {width}x{height}. Submit a smaller image.")]
    ImageTooLarge { width: u32, height: u32, limit: u32 },

    #[error("Plot generation failed: {0}")]
    Render(#[from] RenderError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Version information for the chromaplot session library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
