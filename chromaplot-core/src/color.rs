//! RGB colours and their textual representations.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::colorspace::{srgb, ColorError, Colorspace};

/// An RGB triplet (plus alpha) expressed in a given colorspace.
///
/// Components are stored as encoded values, i.e. with the colorspace's
/// transfer function applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub alpha: f64,
    pub colorspace: Colorspace,
}

impl RgbColor {
    pub fn new(r: f64, g: f64, b: f64, colorspace: Colorspace) -> Self {
        Self {
            r,
            g,
            b,
            alpha: 1.0,
            colorspace,
        }
    }

    pub fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, srgb())
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Same component values, interpreted in another colorspace.
    pub fn with_colorspace(&self, colorspace: Colorspace) -> Self {
        Self {
            colorspace,
            ..self.clone()
        }
    }

    /// Components with the transfer function removed.
    pub fn to_linear(&self) -> [f64; 3] {
        let transfer = self.colorspace.transfer();
        [
            transfer.decode(self.r),
            transfer.decode(self.g),
            transfer.decode(self.b),
        ]
    }

    /// Convert to `target`, going through XYZ with Bradford adaptation.
    pub fn as_colorspace(&self, target: &Colorspace) -> Self {
        if &self.colorspace == target {
            return self.clone();
        }
        let matrix = self.colorspace.conversion_matrix_to(target);
        let linear = matrix * Vector3::from(self.to_linear());
        let transfer = target.transfer();
        Self {
            r: transfer.encode(linear[0]),
            g: transfer.encode(linear[1]),
            b: transfer.encode(linear[2]),
            alpha: self.alpha,
            colorspace: target.clone(),
        }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::black()
    }
}

/// How a colour is written as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorStringFormat {
    FloatD2,
    FloatD4,
    FloatD8,
    Int8,
    Hexadecimal,
}

/// Outcome of checking a user-submitted colour string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorStringValidation {
    /// Already in the canonical form for the format.
    Valid,
    /// Parseable, but [`fix_color_str`] rewrites it.
    Fixable,
    Invalid,
}

impl ColorStringFormat {
    pub const ALL: [ColorStringFormat; 5] = [
        ColorStringFormat::FloatD2,
        ColorStringFormat::FloatD4,
        ColorStringFormat::FloatD8,
        ColorStringFormat::Int8,
        ColorStringFormat::Hexadecimal,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ColorStringFormat::FloatD2 => "float R, G, B .2",
            ColorStringFormat::FloatD4 => "float R, G, B .4",
            ColorStringFormat::FloatD8 => "float R, G, B .8",
            ColorStringFormat::Int8 => "int 8bit R, G, B",
            ColorStringFormat::Hexadecimal => "hexadecimal #RRGGBB",
        }
    }

    /// Key used in configuration files.
    pub fn identifier(&self) -> &'static str {
        match self {
            ColorStringFormat::FloatD2 => "float_d2",
            ColorStringFormat::FloatD4 => "float_d4",
            ColorStringFormat::FloatD8 => "float_d8",
            ColorStringFormat::Int8 => "int8",
            ColorStringFormat::Hexadecimal => "hexadecimal",
        }
    }

    fn precision(&self) -> Option<usize> {
        match self {
            ColorStringFormat::FloatD2 => Some(2),
            ColorStringFormat::FloatD4 => Some(4),
            ColorStringFormat::FloatD8 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ColorStringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ColorStringFormat {
    type Err = ColorError;

    /// Accepts either the display label or the snake_case identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .find(|format| {
                format.label().eq_ignore_ascii_case(wanted)
                    || format.identifier().eq_ignore_ascii_case(wanted)
            })
            .copied()
            .ok_or_else(|| ColorError::UnknownColorFormat(s.to_string()))
    }
}

fn to_int8(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Write the colour's components using `format`. Alpha is not written.
pub fn format_color(color: &RgbColor, format: ColorStringFormat) -> String {
    let [r, g, b] = color.to_array();
    match format {
        ColorStringFormat::Int8 => format!("{}, {}, {}", to_int8(r), to_int8(g), to_int8(b)),
        ColorStringFormat::Hexadecimal => {
            format!("#{:02X}{:02X}{:02X}", to_int8(r), to_int8(g), to_int8(b))
        }
        _ => {
            let precision = format.precision().unwrap_or(4);
            format!("{:.p$}, {:.p$}, {:.p$}", r, g, b, p = precision)
        }
    }
}

fn parse_hex(value: &str) -> Option<[f64; 3]> {
    let digits = value.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |i: usize| {
        u8::from_str_radix(expanded.get(i..i + 2)?, 16)
            .ok()
            .map(|v| v as f64 / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn parse_numbers(value: &str) -> Option<[f64; 3]> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .collect();
    let numbers = cleaned
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()?;
    match numbers.as_slice() {
        [grey] => Some([*grey; 3]),
        [r, g, b] => Some([*r, *g, *b]),
        _ => None,
    }
}

fn parse_components(value: &str, format: ColorStringFormat) -> Option<[f64; 3]> {
    match format {
        ColorStringFormat::Hexadecimal => parse_hex(value),
        ColorStringFormat::Int8 => {
            parse_numbers(value).map(|rgb| rgb.map(|v| v.round().clamp(0.0, 255.0) / 255.0))
        }
        _ => parse_numbers(value),
    }
}

/// Parse a colour string written in `format`, interpreting it in `colorspace`.
pub fn parse_color(
    value: &str,
    format: ColorStringFormat,
    colorspace: Colorspace,
) -> Result<RgbColor, ColorError> {
    let [r, g, b] =
        parse_components(value, format).ok_or_else(|| ColorError::InvalidColorString {
            value: value.to_string(),
            format: format.label().to_string(),
        })?;
    Ok(RgbColor::new(r, g, b, colorspace))
}

pub fn validate_color_str(value: &str, format: ColorStringFormat) -> ColorStringValidation {
    match fix_color_str(value, format) {
        Some(fixed) if fixed == value => ColorStringValidation::Valid,
        Some(_) => ColorStringValidation::Fixable,
        None => ColorStringValidation::Invalid,
    }
}

/// Rewrite a parseable colour string into the canonical form of `format`.
pub fn fix_color_str(value: &str, format: ColorStringFormat) -> Option<String> {
    let [r, g, b] = parse_components(value, format)?;
    Some(format_color(&RgbColor::new(r, g, b, srgb()), format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorspace::get_colorspace;

    fn grey(v: f64) -> RgbColor {
        RgbColor::new(v, v, v, srgb())
    }

    #[test]
    fn test_format_float_precision() {
        let color = RgbColor::new(0.5, 0.25, 1.0, srgb());
        assert_eq!(format_color(&color, ColorStringFormat::FloatD2), "0.50, 0.25, 1.00");
        assert_eq!(
            format_color(&color, ColorStringFormat::FloatD4),
            "0.5000, 0.2500, 1.0000"
        );
    }

    #[test]
    fn test_format_int_and_hex() {
        let color = RgbColor::new(1.0, 0.0, 0.5, srgb());
        assert_eq!(format_color(&color, ColorStringFormat::Int8), "255, 0, 128");
        assert_eq!(format_color(&color, ColorStringFormat::Hexadecimal), "#FF0080");
    }

    #[test]
    fn test_parse_hex_variants() {
        let color = parse_color("#53DD97", ColorStringFormat::Hexadecimal, srgb()).unwrap();
        assert!((color.r - 0x53 as f64 / 255.0).abs() < 1e-12);
        let short = parse_color("fff", ColorStringFormat::Hexadecimal, srgb()).unwrap();
        assert_eq!(short.to_array(), [1.0, 1.0, 1.0]);
        assert!(parse_color("#12345", ColorStringFormat::Hexadecimal, srgb()).is_err());
        assert!(parse_color("#GG0000", ColorStringFormat::Hexadecimal, srgb()).is_err());
    }

    #[test]
    fn test_parse_grey_broadcast() {
        let color = parse_color("0.5", ColorStringFormat::FloatD4, srgb()).unwrap();
        assert_eq!(color.to_array(), [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_validation() {
        let format = ColorStringFormat::FloatD4;
        assert_eq!(
            validate_color_str("0.5000, 0.5000, 0.5000", format),
            ColorStringValidation::Valid
        );
        assert_eq!(
            validate_color_str("(0.5 0.5 0.5)", format),
            ColorStringValidation::Fixable
        );
        assert_eq!(validate_color_str("red", format), ColorStringValidation::Invalid);
        assert_eq!(validate_color_str("0.1, 0.2", format), ColorStringValidation::Invalid);
        assert_eq!(
            validate_color_str("#ff0000", ColorStringFormat::Hexadecimal),
            ColorStringValidation::Fixable
        );
        assert_eq!(
            fix_color_str("#ff0000", ColorStringFormat::Hexadecimal).as_deref(),
            Some("#FF0000")
        );
    }

    #[test]
    fn test_int8_clamps() {
        let color = parse_color("300, -4, 128", ColorStringFormat::Int8, srgb()).unwrap();
        assert_eq!(color.r, 1.0);
        assert_eq!(color.g, 0.0);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(
            "float_d8".parse::<ColorStringFormat>().unwrap(),
            ColorStringFormat::FloatD8
        );
        assert_eq!(
            ColorStringFormat::Hexadecimal.label().parse::<ColorStringFormat>().unwrap(),
            ColorStringFormat::Hexadecimal
        );
        assert!("float".parse::<ColorStringFormat>().is_err());
    }

    #[test]
    fn test_conversion_round_trip() {
        let p3 = get_colorspace("Display P3").unwrap();
        let prophoto = get_colorspace("ProPhoto RGB").unwrap();
        let original = RgbColor::new(0.8, 0.3, 0.1, srgb());
        let restored = original.as_colorspace(&p3).as_colorspace(&prophoto).as_colorspace(&srgb());
        for (a, b) in original.to_array().iter().zip(restored.to_array()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_white_stays_white_across_whitepoints() {
        let acescg = get_colorspace("ACEScg").unwrap();
        let white = grey(1.0).as_colorspace(&acescg);
        for v in white.to_array() {
            assert!((v - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_with_colorspace_keeps_components() {
        let p3 = get_colorspace("Display P3").unwrap();
        let color = grey(0.5).with_colorspace(p3.clone());
        assert_eq!(color.to_array(), [0.5, 0.5, 0.5]);
        assert_eq!(color.colorspace, p3);
    }
}
