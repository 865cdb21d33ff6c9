//! Error handling for the chromaplot CLI

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chromaplot CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Unknown colorspace: {name}")]
    UnknownColorspace { name: String },

    #[error("Image error: {message}")]
    Image { message: String },

    #[error("Rendering error: {message}")]
    Rendering { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    pub fn unknown_colorspace<S: Into<String>>(name: S) -> Self {
        Self::UnknownColorspace { name: name.into() }
    }

    pub fn image<S: Into<String>>(message: S) -> Self {
        Self::Image { message: message.into() }
    }

    pub fn rendering<S: Into<String>>(message: S) -> Self {
        Self::Rendering { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<chromaplot_session::SessionError> for CliError {
    fn from(err: chromaplot_session::SessionError) -> Self {
        use chromaplot_core::ColorError;
        use chromaplot_session::SessionError;

        match err {
            SessionError::Color(ColorError::UnknownColorspace(name)) => {
                Self::unknown_colorspace(name)
            }
            SessionError::Color(other) => Self::validation(other.to_string()),
            SessionError::Image(_) | SessionError::ImageTooLarge { .. } => {
                Self::image(err.to_string())
            }
            SessionError::Render(_) => Self::rendering(err.to_string()),
            SessionError::InvalidValue { .. } | SessionError::TypeMismatch { .. } => {
                Self::validation(err.to_string())
            }
            SessionError::UnknownOption(_) | SessionError::Snapshot(_) => {
                Self::config(err.to_string())
            }
        }
    }
}

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    // Add helpful suggestions based on error type
    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::InvalidFormat { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Colour formats are float_d2, float_d4, float_d8, int8 and hexadecimal\n\
                 • Export formats are svg and png; use --format or a matching extension",
            );
        }

        CliError::UnknownColorspace { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Run 'chromaplot colorspaces' to list the available names\n\
                 • Names are matched ignoring case",
            );
        }

        CliError::Image { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Supported extensions: png, jpg, jpeg, tif, tiff, webp, hdr, exr, ico, tga, bmp, dds\n\
                 • Images larger than 2048 pixels are refused unless CHROMAPLOT_DISABLE_SIZE_LIMITATIONS is set\n\
                 • Ensure the file is not corrupted or truncated",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your chromaplot.toml configuration file\n\
                 • Use 'chromaplot config --example' to generate a sample configuration\n\
                 • Verify that all configuration values are valid",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromaplot_core::ColorError;
    use chromaplot_session::SessionError;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("photo.exr"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_session_error_conversion() {
        let err: CliError =
            SessionError::Color(ColorError::UnknownColorspace("Rec2100".to_string())).into();
        assert!(matches!(err, CliError::UnknownColorspace { ref name } if name == "Rec2100"));
        assert!(format_error_with_suggestions(&err).contains("chromaplot colorspaces"));

        let err: CliError = SessionError::ImageTooLarge {
            width: 4096,
            height: 10,
            limit: 2048,
        }
        .into();
        assert!(matches!(err, CliError::Image { .. }));
    }
}
