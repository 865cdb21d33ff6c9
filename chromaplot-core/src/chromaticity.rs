//! Chromaticity coordinates, diagram projections and reference data.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::colorspace::{srgb, ColorError, Colorspace, TransferFunction};
use crate::geometry::ViewBounds;
use crate::image_io::FloatImage;

/// CIE 1931 2° spectral locus, `(wavelength nm, x, y)` every 5 nm.
pub const SPECTRAL_LOCUS: &[(u16, f64, f64)] = &[
    (380, 0.1741, 0.0050),
    (385, 0.1740, 0.0050),
    (390, 0.1738, 0.0049),
    (395, 0.1736, 0.0049),
    (400, 0.1733, 0.0048),
    (405, 0.1730, 0.0048),
    (410, 0.1726, 0.0048),
    (415, 0.1721, 0.0048),
    (420, 0.1714, 0.0051),
    (425, 0.1703, 0.0058),
    (430, 0.1689, 0.0069),
    (435, 0.1669, 0.0086),
    (440, 0.1644, 0.0109),
    (445, 0.1611, 0.0138),
    (450, 0.1566, 0.0177),
    (455, 0.1510, 0.0227),
    (460, 0.1440, 0.0297),
    (465, 0.1355, 0.0399),
    (470, 0.1241, 0.0578),
    (475, 0.1096, 0.0868),
    (480, 0.0913, 0.1327),
    (485, 0.0687, 0.2007),
    (490, 0.0454, 0.2950),
    (495, 0.0235, 0.4127),
    (500, 0.0082, 0.5384),
    (505, 0.0039, 0.6548),
    (510, 0.0139, 0.7502),
    (515, 0.0389, 0.8120),
    (520, 0.0743, 0.8338),
    (525, 0.1142, 0.8262),
    (530, 0.1547, 0.8059),
    (535, 0.1929, 0.7816),
    (540, 0.2296, 0.7543),
    (545, 0.2658, 0.7243),
    (550, 0.3016, 0.6923),
    (555, 0.3373, 0.6589),
    (560, 0.3731, 0.6245),
    (565, 0.4087, 0.5896),
    (570, 0.4441, 0.5547),
    (575, 0.4788, 0.5202),
    (580, 0.5125, 0.4866),
    (585, 0.5448, 0.4544),
    (590, 0.5752, 0.4242),
    (595, 0.6029, 0.3965),
    (600, 0.6270, 0.3725),
    (605, 0.6482, 0.3514),
    (610, 0.6658, 0.3340),
    (615, 0.6801, 0.3197),
    (620, 0.6915, 0.3083),
    (625, 0.7006, 0.2993),
    (630, 0.7079, 0.2920),
    (635, 0.7140, 0.2859),
    (640, 0.7190, 0.2809),
    (645, 0.7230, 0.2770),
    (650, 0.7260, 0.2740),
    (655, 0.7283, 0.2717),
    (660, 0.7300, 0.2700),
    (665, 0.7311, 0.2689),
    (670, 0.7320, 0.2680),
    (675, 0.7327, 0.2673),
    (680, 0.7334, 0.2666),
    (685, 0.7340, 0.2660),
    (690, 0.7344, 0.2656),
    (695, 0.7346, 0.2654),
    (700, 0.7347, 0.2653),
];

/// Outline of Pointer's gamut of real surface colours, CIE 1931 xy.
/// The outline is closed implicitly.
pub const POINTER_GAMUT: &[(f64, f64)] = &[
    (0.659, 0.316),
    (0.634, 0.351),
    (0.594, 0.391),
    (0.557, 0.427),
    (0.523, 0.462),
    (0.482, 0.491),
    (0.444, 0.515),
    (0.393, 0.546),
    (0.339, 0.580),
    (0.269, 0.616),
    (0.211, 0.627),
    (0.140, 0.587),
    (0.107, 0.547),
    (0.082, 0.458),
    (0.074, 0.378),
    (0.088, 0.287),
    (0.102, 0.236),
    (0.117, 0.188),
    (0.131, 0.143),
    (0.147, 0.098),
    (0.164, 0.066),
    (0.196, 0.052),
    (0.228, 0.055),
    (0.266, 0.060),
    (0.302, 0.066),
    (0.353, 0.071),
    (0.404, 0.088),
    (0.449, 0.103),
    (0.500, 0.139),
    (0.558, 0.176),
    (0.608, 0.215),
    (0.644, 0.262),
];

/// XYZ to xy. Black has no chromaticity and maps to `fallback`.
pub fn xyz_to_xy(xyz: [f64; 3], fallback: [f64; 2]) -> [f64; 2] {
    let sum = xyz[0] + xyz[1] + xyz[2];
    if sum.abs() < f64::EPSILON {
        return fallback;
    }
    [xyz[0] / sum, xyz[1] / sum]
}

/// xy to XYZ with a luminance of 1.
pub fn xy_to_xyz(xy: [f64; 2]) -> [f64; 3] {
    let [x, y] = xy;
    if y == 0.0 {
        return [0.0, 0.0, 0.0];
    }
    [x / y, 1.0, (1.0 - x - y) / y]
}

pub fn xy_to_uv_1960(xy: [f64; 2]) -> [f64; 2] {
    let [x, y] = xy;
    let denominator = -2.0 * x + 12.0 * y + 3.0;
    [4.0 * x / denominator, 6.0 * y / denominator]
}

pub fn uv_1960_to_xy(uv: [f64; 2]) -> [f64; 2] {
    let [u, v] = uv;
    let denominator = 2.0 * u - 8.0 * v + 4.0;
    [3.0 * u / denominator, 2.0 * v / denominator]
}

pub fn xy_to_uv_1976(xy: [f64; 2]) -> [f64; 2] {
    let [x, y] = xy;
    let denominator = -2.0 * x + 12.0 * y + 3.0;
    [4.0 * x / denominator, 9.0 * y / denominator]
}

pub fn uv_1976_to_xy(uv: [f64; 2]) -> [f64; 2] {
    let [u, v] = uv;
    let denominator = 6.0 * u - 16.0 * v + 12.0;
    [9.0 * u / denominator, 4.0 * v / denominator]
}

/// Chromaticity plane a diagram is drawn in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramMethod {
    Cie1931,
    Cie1960Ucs,
    #[default]
    Cie1976Ucs,
}

impl DiagramMethod {
    pub const ALL: [DiagramMethod; 3] = [
        DiagramMethod::Cie1931,
        DiagramMethod::Cie1960Ucs,
        DiagramMethod::Cie1976Ucs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DiagramMethod::Cie1931 => "CIE 1931",
            DiagramMethod::Cie1960Ucs => "CIE 1960 UCS",
            DiagramMethod::Cie1976Ucs => "CIE 1976 UCS",
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            DiagramMethod::Cie1931 => "cie1931",
            DiagramMethod::Cie1960Ucs => "cie1960-ucs",
            DiagramMethod::Cie1976Ucs => "cie1976-ucs",
        }
    }

    pub fn axis_labels(&self) -> (&'static str, &'static str) {
        match self {
            DiagramMethod::Cie1931 => ("CIE x", "CIE y"),
            DiagramMethod::Cie1960Ucs => ("CIE u", "CIE v"),
            DiagramMethod::Cie1976Ucs => ("CIE u'", "CIE v'"),
        }
    }

    pub fn default_bounds(&self) -> ViewBounds {
        match self {
            DiagramMethod::Cie1931 => ViewBounds::new(-0.1, 0.9, -0.1, 0.9),
            DiagramMethod::Cie1960Ucs => ViewBounds::new(-0.1, 0.7, -0.2, 0.6),
            DiagramMethod::Cie1976Ucs => ViewBounds::new(-0.1, 0.7, -0.1, 0.7),
        }
    }

    /// CIE 1931 xy to this diagram's coordinates.
    pub fn project(&self, xy: [f64; 2]) -> [f64; 2] {
        match self {
            DiagramMethod::Cie1931 => xy,
            DiagramMethod::Cie1960Ucs => xy_to_uv_1960(xy),
            DiagramMethod::Cie1976Ucs => xy_to_uv_1976(xy),
        }
    }

    /// This diagram's coordinates back to CIE 1931 xy.
    pub fn unproject(&self, point: [f64; 2]) -> [f64; 2] {
        match self {
            DiagramMethod::Cie1931 => point,
            DiagramMethod::Cie1960Ucs => uv_1960_to_xy(point),
            DiagramMethod::Cie1976Ucs => uv_1976_to_xy(point),
        }
    }
}

impl fmt::Display for DiagramMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DiagramMethod {
    type Err = ColorError;

    /// Accepts a label (`CIE 1960 UCS`), an identifier (`cie1960-ucs`) or
    /// the compact form (`CIE1960-UCS`). Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "cie1931" => Ok(DiagramMethod::Cie1931),
            "cie1960ucs" => Ok(DiagramMethod::Cie1960Ucs),
            "cie1976ucs" => Ok(DiagramMethod::Cie1976Ucs),
            _ => Err(ColorError::UnknownDiagramMethod(s.to_string())),
        }
    }
}

/// Project every pixel of a linear RGB image to xy chromaticities.
///
/// Pixels without luminance project onto the colorspace whitepoint.
pub fn image_to_xy(image: &FloatImage, colorspace: &Colorspace) -> Vec<[f64; 2]> {
    let fallback = colorspace.whitepoint().xy;
    let samples: &[f32] = image;
    samples
        .par_chunks_exact(3)
        .map(|px| {
            let xyz = colorspace.linear_rgb_to_xyz([px[0] as f64, px[1] as f64, px[2] as f64]);
            xyz_to_xy(xyz, fallback)
        })
        .collect()
}

/// Approximate sRGB display colour of a chromaticity, brightest at full
/// scale. Used to paint the locus, background and markers.
pub fn xy_to_display_rgb(xy: [f64; 2]) -> [f64; 3] {
    let srgb = srgb();
    let linear = srgb.xyz_to_rgb_matrix() * Vector3::from(xy_to_xyz(xy));
    let clipped = linear.map(|v| v.max(0.0));
    let peak = clipped.max();
    if peak <= 0.0 {
        return [0.0, 0.0, 0.0];
    }
    let normalized = clipped / peak;
    [
        TransferFunction::Srgb.encode(normalized[0]),
        TransferFunction::Srgb.encode(normalized[1]),
        TransferFunction::Srgb.encode(normalized[2]),
    ]
}

/// Whether an xy chromaticity falls inside the spectral locus, closed by
/// the line of purples.
pub fn spectral_locus_contains(xy: [f64; 2]) -> bool {
    let [px, py] = xy;
    let mut inside = false;
    let n = SPECTRAL_LOCUS.len();
    let mut j = n - 1;
    for i in 0..n {
        let (_, xi, yi) = SPECTRAL_LOCUS[i];
        let (_, xj, yj) = SPECTRAL_LOCUS[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
