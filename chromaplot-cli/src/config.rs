//! Configuration handling for the chromaplot CLI
//!
//! Supports loading configuration from chromaplot.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub diagram: DiagramConfig,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of worker threads for per-pixel work (rayon default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Colorspace the source colour or image is expressed in
    #[serde(default = "default_colorspace")]
    pub colorspace: String,

    /// Ignore the colorspace transfer function
    #[serde(default)]
    pub force_linear: bool,

    /// Colour string format (float_d2, float_d4, float_d8, int8, hexadecimal)
    #[serde(default = "default_color_format")]
    pub color_format: String,

    /// Keep one pixel every N along both axes of an image
    #[serde(default = "default_image_samples")]
    pub image_samples: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Projection method (cie1931, cie1960-ucs, cie1976-ucs)
    #[serde(default = "default_method")]
    pub method: String,

    /// Scatter marker (label or marker code)
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Marker area in points²
    #[serde(default = "default_scatter_size")]
    pub scatter_size: f64,

    /// Fixed scatter colour used when `scatter_color_rgb` is disabled
    #[serde(default = "default_scatter_color")]
    pub scatter_color: String,

    /// Colour each marker with its pixel colour
    #[serde(default = "default_true")]
    pub scatter_color_rgb: bool,

    #[serde(default = "default_alpha")]
    pub scatter_alpha: f64,

    #[serde(default = "default_true")]
    pub show_spectral_locus: bool,

    #[serde(default = "default_true")]
    pub locus_color_rgb: bool,

    /// Paint the inside of the spectral locus
    #[serde(default)]
    pub show_diagram_colours: bool,

    #[serde(default)]
    pub show_pointer_gamut: bool,

    #[serde(default = "default_alpha")]
    pub pointer_gamut_alpha: f64,

    #[serde(default = "default_true")]
    pub show_whitepoints: bool,

    #[serde(default = "default_true")]
    pub show_legend: bool,

    #[serde(default = "default_true")]
    pub show_axes: bool,

    #[serde(default)]
    pub show_grid: bool,

    #[serde(default)]
    pub transparent_background: bool,

    /// Figure side length in centimetres
    #[serde(default = "default_figure_size")]
    pub figure_size_cm: f64,

    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    /// Add a footer with the export date to SVG files
    #[serde(default)]
    pub footer: bool,

    #[serde(default = "default_font_family")]
    pub font_family: String,
}

// Default value functions
fn default_colorspace() -> String { "sRGB".to_string() }
fn default_color_format() -> String { "float_d4".to_string() }
fn default_image_samples() -> u32 { 10 }
fn default_method() -> String { "cie1976-ucs".to_string() }
fn default_marker() -> String { "circle".to_string() }
fn default_scatter_size() -> f64 { 25.0 }
fn default_scatter_color() -> String { "#53DD97".to_string() }
fn default_true() -> bool { true }
fn default_alpha() -> f64 { 1.0 }
fn default_figure_size() -> f64 { 25.0 }
fn default_font_size() -> f64 { 12.0 }
fn default_font_family() -> String { "Arial, sans-serif".to_string() }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            colorspace: default_colorspace(),
            force_linear: false,
            color_format: default_color_format(),
            image_samples: default_image_samples(),
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            marker: default_marker(),
            scatter_size: default_scatter_size(),
            scatter_color: default_scatter_color(),
            scatter_color_rgb: true,
            scatter_alpha: default_alpha(),
            show_spectral_locus: true,
            locus_color_rgb: true,
            show_diagram_colours: false,
            show_pointer_gamut: false,
            pointer_gamut_alpha: default_alpha(),
            show_whitepoints: true,
            show_legend: true,
            show_axes: true,
            show_grid: false,
            transparent_background: false,
            figure_size_cm: default_figure_size(),
            font_size: default_font_size(),
        }
    }
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            footer: false,
            font_family: default_font_family(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                // Try to find chromaplot.toml in current directory
                let default_path = PathBuf::from("chromaplot.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: chromaplot.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        Self::default().to_toml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.colorspace, "sRGB");
        assert_eq!(config.diagram.method, "cie1976-ucs");
        assert_eq!(config.source.image_samples, 10);
        assert!(config.general.threads.is_none());
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.diagram.show_grid = true;
        config.source.colorspace = "ACEScg".to_string();
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded_config.source.colorspace, "ACEScg");
        assert!(loaded_config.diagram.show_grid);
        assert_eq!(config.diagram.scatter_size, loaded_config.diagram.scatter_size);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "[diagram]\nmethod = \"cie1931\"\n")?;

        let config = Config::load(Some(temp_file.path()))?;
        assert_eq!(config.diagram.method, "cie1931");
        assert_eq!(config.diagram.marker, "circle");
        assert_eq!(config.source.color_format, "float_d4");
        Ok(())
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example_toml()?;
        assert!(example.contains("[source]"));
        assert!(example.contains("[diagram]"));
        assert!(example.contains("[export]"));
        Ok(())
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "diagram = 3").unwrap();
        let err = Config::load_from_file(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }
}
