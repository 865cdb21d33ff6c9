use serde::{Deserialize, Serialize};

/// Display colour used by figure elements: sRGB-encoded components plus alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub alpha: f64,
}

impl Paint {
    pub const BLACK: Paint = Paint { r: 0.0, g: 0.0, b: 0.0, alpha: 1.0 };
    pub const WHITE: Paint = Paint { r: 1.0, g: 1.0, b: 1.0, alpha: 1.0 };

    pub fn rgb(rgb: [f64; 3]) -> Self {
        Self {
            r: rgb[0].clamp(0.0, 1.0),
            g: rgb[1].clamp(0.0, 1.0),
            b: rgb[2].clamp(0.0, 1.0),
            alpha: 1.0,
        }
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`, the leading `#` being optional.
    pub fn from_hex(s: &str) -> Option<Paint> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let channel = |i: usize| -> Option<f64> {
            Some(u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()? as f64 / 255.0)
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
        Some(Paint {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            alpha,
        })
    }

    /// `#RRGGBB`, alpha excluded.
    pub fn to_hex(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [byte(self.r), byte(self.g), byte(self.b), byte(self.alpha)]
    }
}
