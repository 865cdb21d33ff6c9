//! RGB colorspace definitions and the registry of colorspaces available to
//! the rest of the workspace.
//!
//! A [`Colorspace`] is the triplet primaries + whitepoint + transfer function.
//! Its RGB <-> XYZ matrices are derived once at construction time, which is
//! also where degenerate primaries are rejected.

use std::sync::OnceLock;

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image_io::FloatImage;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColorError {
    #[error("Unknown colorspace: {0}")]
    UnknownColorspace(String),
    #[error("Colorspace '{0}' has degenerate primaries or whitepoint")]
    DegeneratePrimaries(String),
    #[error("Invalid color value '{value}' for format {format}")]
    InvalidColorString { value: String, format: String },
    #[error("Unknown color format: {0}")]
    UnknownColorFormat(String),
    #[error("Unsupported diagram method: {0}")]
    UnknownDiagramMethod(String),
}

/// Bradford cone response matrix.
#[rustfmt::skip]
fn bradford() -> Matrix3<f64> {
    Matrix3::new(
        0.8951, 0.2664, -0.1614,
        -0.7502, 1.7135, 0.0367,
        0.0389, -0.0685, 1.0296,
    )
}

fn bradford_inverse() -> Matrix3<f64> {
    bradford().try_inverse().unwrap_or_else(Matrix3::identity)
}

/// Nonlinear encoding applied to linear light values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFunction {
    Linear,
    /// IEC 61966-2-1 piecewise curve.
    Srgb,
    /// Pure power law, decoding with `value ^ gamma`.
    Gamma(f64),
    /// ITU-R BT.709 / BT.2020 camera curve.
    Rec709,
    /// ROMM RGB curve.
    ProPhoto,
}

impl TransferFunction {
    pub fn is_linear(&self) -> bool {
        matches!(self, TransferFunction::Linear)
    }

    /// Encoded value to linear light. Negative values are mirrored.
    pub fn decode(&self, value: f64) -> f64 {
        let sign = value.signum();
        let v = value.abs();
        let linear = match *self {
            TransferFunction::Linear => return value,
            TransferFunction::Srgb => {
                if v <= 0.04045 {
                    v / 12.92
                } else {
                    ((v + 0.055) / 1.055).powf(2.4)
                }
            }
            TransferFunction::Gamma(gamma) => v.powf(gamma),
            TransferFunction::Rec709 => {
                if v < 0.081 {
                    v / 4.5
                } else {
                    ((v + 0.099) / 1.099).powf(1.0 / 0.45)
                }
            }
            TransferFunction::ProPhoto => {
                if v < 16.0 / 512.0 {
                    v / 16.0
                } else {
                    v.powf(1.8)
                }
            }
        };
        sign * linear
    }

    /// Linear light to encoded value. Negative values are mirrored.
    pub fn encode(&self, value: f64) -> f64 {
        let sign = value.signum();
        let v = value.abs();
        let encoded = match *self {
            TransferFunction::Linear => return value,
            TransferFunction::Srgb => {
                if v <= 0.0031308 {
                    v * 12.92
                } else {
                    1.055 * v.powf(1.0 / 2.4) - 0.055
                }
            }
            TransferFunction::Gamma(gamma) => v.powf(1.0 / gamma),
            TransferFunction::Rec709 => {
                if v < 0.018 {
                    v * 4.5
                } else {
                    1.099 * v.powf(0.45) - 0.099
                }
            }
            TransferFunction::ProPhoto => {
                if v < 1.0 / 512.0 {
                    v * 16.0
                } else {
                    v.powf(1.0 / 1.8)
                }
            }
        };
        sign * encoded
    }
}

/// Reference white, as CIE 1931 xy chromaticity coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Whitepoint {
    pub name: String,
    pub xy: [f64; 2],
}

impl Whitepoint {
    pub fn new<S: Into<String>>(name: S, xy: [f64; 2]) -> Self {
        Self { name: name.into(), xy }
    }

    pub fn d50() -> Self {
        Self::new("D50", [0.3457, 0.3585])
    }

    pub fn d65() -> Self {
        Self::new("D65", [0.3127, 0.3290])
    }

    pub fn dci() -> Self {
        Self::new("DCI-P3", [0.314, 0.351])
    }

    pub fn aces() -> Self {
        Self::new("ACES", [0.32168, 0.33767])
    }

    /// XYZ tristimulus values normalized so that Y is 1.
    pub fn to_xyz(&self) -> Vector3<f64> {
        let [x, y] = self.xy;
        Vector3::new(x / y, 1.0, (1.0 - x - y) / y)
    }
}

/// Bradford chromatic adaptation from one whitepoint to another, in XYZ.
pub fn chromatic_adaptation_matrix(source: &Whitepoint, target: &Whitepoint) -> Matrix3<f64> {
    if source.xy == target.xy {
        return Matrix3::identity();
    }
    let source_cone = bradford() * source.to_xyz();
    let target_cone = bradford() * target.to_xyz();
    let gain = Matrix3::from_diagonal(&target_cone.component_div(&source_cone));
    bradford_inverse() * gain * bradford()
}

/// Plain serialized form of a [`Colorspace`]; matrices are derived on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColorspaceDefinition {
    name: String,
    primaries: [[f64; 2]; 3],
    whitepoint: Whitepoint,
    transfer: TransferFunction,
}

impl TryFrom<ColorspaceDefinition> for Colorspace {
    type Error = ColorError;

    fn try_from(def: ColorspaceDefinition) -> Result<Self, Self::Error> {
        Colorspace::new(def.name, def.primaries, def.whitepoint, def.transfer)
    }
}

impl From<Colorspace> for ColorspaceDefinition {
    fn from(colorspace: Colorspace) -> Self {
        Self {
            name: colorspace.name,
            primaries: colorspace.primaries,
            whitepoint: colorspace.whitepoint,
            transfer: colorspace.transfer,
        }
    }
}

/// A named RGB colorspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorspaceDefinition", into = "ColorspaceDefinition")]
pub struct Colorspace {
    name: String,
    primaries: [[f64; 2]; 3],
    whitepoint: Whitepoint,
    transfer: TransferFunction,
    rgb_to_xyz: Matrix3<f64>,
    xyz_to_rgb: Matrix3<f64>,
}

impl Colorspace {
    /// Build a colorspace from its red, green and blue primaries (xy).
    pub fn new<S: Into<String>>(
        name: S,
        primaries: [[f64; 2]; 3],
        whitepoint: Whitepoint,
        transfer: TransferFunction,
    ) -> Result<Self, ColorError> {
        let name = name.into();
        let rgb_to_xyz = normalised_primary_matrix(&primaries, &whitepoint)
            .ok_or_else(|| ColorError::DegeneratePrimaries(name.clone()))?;
        let xyz_to_rgb = rgb_to_xyz
            .try_inverse()
            .ok_or_else(|| ColorError::DegeneratePrimaries(name.clone()))?;
        Ok(Self {
            name,
            primaries,
            whitepoint,
            transfer,
            rgb_to_xyz,
            xyz_to_rgb,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primaries(&self) -> [[f64; 2]; 3] {
        self.primaries
    }

    pub fn whitepoint(&self) -> &Whitepoint {
        &self.whitepoint
    }

    pub fn transfer(&self) -> TransferFunction {
        self.transfer
    }

    pub fn is_linear(&self) -> bool {
        self.transfer.is_linear()
    }

    pub fn rgb_to_xyz_matrix(&self) -> Matrix3<f64> {
        self.rgb_to_xyz
    }

    pub fn xyz_to_rgb_matrix(&self) -> Matrix3<f64> {
        self.xyz_to_rgb
    }

    /// Same primaries and whitepoint, with a linear transfer function.
    pub fn as_linear_copy(&self) -> Colorspace {
        if self.is_linear() {
            return self.clone();
        }
        Colorspace {
            name: format!("{} (linear)", self.name),
            transfer: TransferFunction::Linear,
            ..self.clone()
        }
    }

    /// Linear RGB to XYZ, relative to this colorspace's whitepoint.
    pub fn linear_rgb_to_xyz(&self, rgb: [f64; 3]) -> [f64; 3] {
        let xyz = self.rgb_to_xyz * Vector3::from(rgb);
        [xyz[0], xyz[1], xyz[2]]
    }

    /// Matrix converting linear RGB in `self` to linear RGB in `target`,
    /// adapting between whitepoints.
    pub fn conversion_matrix_to(&self, target: &Colorspace) -> Matrix3<f64> {
        let adaptation = chromatic_adaptation_matrix(&self.whitepoint, &target.whitepoint);
        target.xyz_to_rgb * adaptation * self.rgb_to_xyz
    }

    /// Apply the transfer function's decoding to every sample, in place.
    pub fn decode_image(&self, image: &mut FloatImage) {
        if self.is_linear() {
            return;
        }
        let transfer = self.transfer;
        let samples: &mut [f32] = image;
        samples
            .par_iter_mut()
            .for_each(|v| *v = transfer.decode(*v as f64) as f32);
    }

    /// Apply the transfer function's encoding to every sample, in place.
    pub fn encode_image(&self, image: &mut FloatImage) {
        if self.is_linear() {
            return;
        }
        let transfer = self.transfer;
        let samples: &mut [f32] = image;
        samples
            .par_iter_mut()
            .for_each(|v| *v = transfer.encode(*v as f64) as f32);
    }
}

fn normalised_primary_matrix(
    primaries: &[[f64; 2]; 3],
    whitepoint: &Whitepoint,
) -> Option<Matrix3<f64>> {
    if whitepoint.xy[1] == 0.0 || primaries.iter().any(|p| p[1] == 0.0) {
        return None;
    }
    let column = |xy: &[f64; 2]| Vector3::new(xy[0] / xy[1], 1.0, (1.0 - xy[0] - xy[1]) / xy[1]);
    let primaries_xyz = Matrix3::from_columns(&[
        column(&primaries[0]),
        column(&primaries[1]),
        column(&primaries[2]),
    ]);
    let scale = primaries_xyz.try_inverse()? * whitepoint.to_xyz();
    Some(primaries_xyz * Matrix3::from_diagonal(&scale))
}

fn registry() -> &'static [Colorspace] {
    static REGISTRY: OnceLock<Vec<Colorspace>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let rec709 = [[0.64, 0.33], [0.30, 0.60], [0.15, 0.06]];
        let p3 = [[0.680, 0.320], [0.265, 0.690], [0.150, 0.060]];
        let definitions = vec![
            ("sRGB", rec709, Whitepoint::d65(), TransferFunction::Srgb),
            ("Display P3", p3, Whitepoint::d65(), TransferFunction::Srgb),
            ("DCI-P3", p3, Whitepoint::dci(), TransferFunction::Gamma(2.6)),
            (
                "Adobe RGB (1998)",
                [[0.64, 0.33], [0.21, 0.71], [0.15, 0.06]],
                Whitepoint::d65(),
                TransferFunction::Gamma(563.0 / 256.0),
            ),
            ("ITU-R BT.709", rec709, Whitepoint::d65(), TransferFunction::Rec709),
            (
                "ITU-R BT.2020",
                [[0.708, 0.292], [0.170, 0.797], [0.131, 0.046]],
                Whitepoint::d65(),
                TransferFunction::Rec709,
            ),
            (
                "ACEScg",
                [[0.713, 0.293], [0.165, 0.830], [0.128, 0.044]],
                Whitepoint::aces(),
                TransferFunction::Linear,
            ),
            (
                "ACES2065-1",
                [[0.7347, 0.2653], [0.0, 1.0], [0.0001, -0.0770]],
                Whitepoint::aces(),
                TransferFunction::Linear,
            ),
            (
                "ProPhoto RGB",
                [[0.734699, 0.265301], [0.159597, 0.840403], [0.036598, 0.000105]],
                Whitepoint::d50(),
                TransferFunction::ProPhoto,
            ),
        ];

        definitions
            .into_iter()
            .filter_map(|(name, primaries, whitepoint, transfer)| {
                match Colorspace::new(name, primaries, whitepoint, transfer) {
                    Ok(colorspace) => Some(colorspace),
                    Err(e) => {
                        log::error!("Skipping colorspace {}: {}", name, e);
                        None
                    }
                }
            })
            .collect()
    })
}

/// Every colorspace known to the registry, in display order.
pub fn available_colorspaces() -> Vec<Colorspace> {
    registry().to_vec()
}

/// Look a colorspace up by name, ignoring case.
pub fn get_colorspace(name: &str) -> Result<Colorspace, ColorError> {
    let wanted = name.trim();
    registry()
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| ColorError::UnknownColorspace(name.to_string()))
}

/// The sRGB colorspace, used as the default everywhere.
#[rustfmt::skip]
pub fn srgb() -> Colorspace {
    registry()
        .first()
        .cloned()
        .unwrap_or_else(|| {
            Colorspace {
                name: "sRGB".to_string(),
                primaries: [[0.64, 0.33], [0.30, 0.60], [0.15, 0.06]],
                whitepoint: Whitepoint::d65(),
                transfer: TransferFunction::Srgb,
                rgb_to_xyz: Matrix3::new(
                    0.4124564, 0.3575761, 0.1804375,
                    0.2126729, 0.7151522, 0.0721750,
                    0.0193339, 0.1191920, 0.9503041,
                ),
                xyz_to_rgb: Matrix3::new(
                    3.2404542, -1.5371385, -0.4985314,
                    -0.9692660, 1.8760108, 0.0415560,
                    0.0556434, -0.2040259, 1.0572252,
                ),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRECISION: f64 = 1e-4;

    #[test]
    fn test_srgb_matrix_matches_reference() {
        let m = srgb().rgb_to_xyz_matrix();
        assert!((m[(0, 0)] - 0.4124).abs() < TEST_PRECISION);
        assert!((m[(1, 1)] - 0.7152).abs() < TEST_PRECISION);
        assert!((m[(2, 2)] - 0.9505).abs() < TEST_PRECISION);
        // luminance row sums to one
        assert!((m[(1, 0)] + m[(1, 1)] + m[(1, 2)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_white_maps_to_whitepoint() {
        for colorspace in available_colorspaces() {
            let xyz = colorspace.linear_rgb_to_xyz([1.0, 1.0, 1.0]);
            let expected = colorspace.whitepoint().to_xyz();
            for i in 0..3 {
                assert!(
                    (xyz[i] - expected[i]).abs() < 1e-9,
                    "{} white is off",
                    colorspace.name()
                );
            }
        }
    }

    #[test]
    fn test_transfer_functions_invert() {
        let functions = [
            TransferFunction::Linear,
            TransferFunction::Srgb,
            TransferFunction::Gamma(2.2),
            TransferFunction::Rec709,
            TransferFunction::ProPhoto,
        ];
        for function in functions {
            for v in [0.0, 0.001, 0.02, 0.18, 0.5, 1.0, 2.5, -0.3] {
                let restored = function.decode(function.encode(v));
                assert!((restored - v).abs() < 1e-9, "{:?} at {}", function, v);
            }
        }
    }

    #[test]
    fn test_srgb_mid_grey() {
        let decoded = TransferFunction::Srgb.decode(0.5);
        assert!((decoded - 0.21404).abs() < 1e-4);
    }

    #[test]
    fn test_linear_copy() {
        let srgb = srgb();
        let linear = srgb.as_linear_copy();
        assert!(linear.is_linear());
        assert_eq!(linear.primaries(), srgb.primaries());
        assert_eq!(linear.whitepoint(), srgb.whitepoint());
        assert_ne!(linear.name(), srgb.name());
        // already linear colorspaces are returned unchanged
        let acescg = get_colorspace("ACEScg").unwrap();
        assert_eq!(acescg.as_linear_copy(), acescg);
    }

    #[test]
    fn test_registry_lookup_ignores_case() {
        assert_eq!(get_colorspace("display p3").unwrap().name(), "Display P3");
        assert!(matches!(
            get_colorspace("Not A Colorspace"),
            Err(ColorError::UnknownColorspace(_))
        ));
    }

    #[test]
    fn test_degenerate_primaries_rejected() {
        let result = Colorspace::new(
            "flat",
            [[0.3, 0.3], [0.3, 0.3], [0.3, 0.3]],
            Whitepoint::d65(),
            TransferFunction::Linear,
        );
        assert!(matches!(result, Err(ColorError::DegeneratePrimaries(_))));
    }

    #[test]
    fn test_adaptation_preserves_white() {
        let acescg = get_colorspace("ACEScg").unwrap();
        let m = srgb().conversion_matrix_to(&acescg);
        let white = m * Vector3::new(1.0, 1.0, 1.0);
        for i in 0..3 {
            assert!((white[i] - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_definition_rebuilds_matrices() {
        let p3 = get_colorspace("Display P3").unwrap();
        let def: ColorspaceDefinition = p3.clone().into();
        assert_eq!(def.name, "Display P3");
        let rebuilt = Colorspace::try_from(def).unwrap();
        assert_eq!(rebuilt, p3);
    }
}
