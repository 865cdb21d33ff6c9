//! Typed option slots and the values they hold.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use std::sync::Arc;

use chromaplot_core::{ColorStringFormat, Colorspace, DiagramMethod, FloatImage, RgbColor};
use chromaplot_render::{MarkerShape, PlotStyle};
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Where the plotted pixels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Color,
    Image,
}

impl SourceType {
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Color => "Color",
            SourceType::Image => "Image",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(SourceType::Color),
            "image" => Ok(SourceType::Image),
            _ => Err(SessionError::InvalidValue {
                identifier: "source_type".to_string(),
                reason: format!("unknown source type '{}'", s),
            }),
        }
    }
}

/// Recoverable problems caused by user input, combinable as flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIssue(u8);

impl UserIssue {
    pub const VALUE_ERROR: UserIssue = UserIssue(1);
    pub const HEX_COLORSPACE: UserIssue = UserIssue(1 << 1);
    pub const HEX_FORCE_LINEAR: UserIssue = UserIssue(1 << 2);

    pub fn empty() -> Self {
        UserIssue(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: UserIssue) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: UserIssue) {
        self.0 |= other.0;
    }

    /// Human readable description of every issue set.
    pub fn messages(&self) -> Vec<&'static str> {
        let mut messages = Vec::new();
        if self.contains(UserIssue::VALUE_ERROR) {
            messages.push("Invalid color value submitted, reverting to previous.");
        }
        if self.contains(UserIssue::HEX_COLORSPACE) {
            messages.push("Hexadecimal colors can only be sRGB, reverting.");
        }
        if self.contains(UserIssue::HEX_FORCE_LINEAR) {
            messages.push("Hexadecimal colors cannot be linear, reverting.");
        }
        messages
    }
}

impl BitOr for UserIssue {
    type Output = UserIssue;

    fn bitor(self, rhs: UserIssue) -> UserIssue {
        UserIssue(self.0 | rhs.0)
    }
}

impl BitOrAssign for UserIssue {
    fn bitor_assign(&mut self, rhs: UserIssue) {
        self.insert(rhs);
    }
}

/// One selectable overlay: a registry colorspace name, or `None` when the
/// slot is deselected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySlot {
    pub colorspace: Option<String>,
    /// Hexadecimal display colour.
    pub color: String,
}

impl OverlaySlot {
    pub fn new<S: Into<String>>(colorspace: Option<&str>, color: S) -> Self {
        Self {
            colorspace: colorspace.map(str::to_string),
            color: color.into(),
        }
    }
}

/// Colorspaces drawn over the diagram.
///
/// The first overlay is always the source colorspace. It is stored as a
/// colour only and is resolved against the store every time it is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayList {
    source_color: String,
    slots: Vec<OverlaySlot>,
}

impl OverlayList {
    pub fn new<S: Into<String>>(source_color: S, slots: Vec<OverlaySlot>) -> Self {
        Self {
            source_color: source_color.into(),
            slots,
        }
    }

    pub fn source_color(&self) -> &str {
        &self.source_color
    }

    pub fn set_source_color<S: Into<String>>(&mut self, color: S) {
        self.source_color = color.into();
    }

    /// Slots following the source entry.
    pub fn slots(&self) -> &[OverlaySlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut Vec<OverlaySlot> {
        &mut self.slots
    }

    /// Number of entries, source entry included.
    pub fn len(&self) -> usize {
        self.slots.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for OverlayList {
    fn default() -> Self {
        Self::new(
            "#F44336",
            vec![
                OverlaySlot::new(None, "#9C27B0"),
                OverlaySlot::new(None, "#3F51B5"),
                OverlaySlot::new(None, "#03A9F4"),
                OverlaySlot::new(None, "#009688"),
            ],
        )
    }
}

/// Dynamically typed option value, as stored in the session.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Float(f64),
    Integer(u32),
    Text(String),
    SourceType(SourceType),
    DiagramMethod(DiagramMethod),
    Color(RgbColor),
    Colorspace(Colorspace),
    ColorFormat(ColorStringFormat),
    Issues(UserIssue),
    Marker(MarkerShape),
    Overlays(OverlayList),
    Style(PlotStyle),
    Image(Option<Arc<FloatImage>>),
}

impl OptionValue {
    /// Name of the held type, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Float(_) => "float",
            OptionValue::Integer(_) => "integer",
            OptionValue::Text(_) => "text",
            OptionValue::SourceType(_) => "source type",
            OptionValue::DiagramMethod(_) => "diagram method",
            OptionValue::Color(_) => "color",
            OptionValue::Colorspace(_) => "colorspace",
            OptionValue::ColorFormat(_) => "color format",
            OptionValue::Issues(_) => "user issues",
            OptionValue::Marker(_) => "marker",
            OptionValue::Overlays(_) => "overlay list",
            OptionValue::Style(_) => "style",
            OptionValue::Image(_) => "image",
        }
    }

    pub fn same_kind(&self, other: &OptionValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Primitive JSON form used by session snapshots. Images have none.
    pub fn to_json(&self) -> Result<Option<serde_json::Value>, serde_json::Error> {
        let json = match self {
            OptionValue::Bool(v) => serde_json::to_value(v)?,
            OptionValue::Float(v) => serde_json::to_value(v)?,
            OptionValue::Integer(v) => serde_json::to_value(v)?,
            OptionValue::Text(v) => serde_json::to_value(v)?,
            OptionValue::SourceType(v) => serde_json::to_value(v)?,
            OptionValue::DiagramMethod(v) => serde_json::to_value(v)?,
            OptionValue::Color(v) => serde_json::to_value(v)?,
            OptionValue::Colorspace(v) => serde_json::to_value(v)?,
            OptionValue::ColorFormat(v) => serde_json::to_value(v)?,
            OptionValue::Issues(v) => serde_json::to_value(v)?,
            OptionValue::Marker(v) => serde_json::to_value(v)?,
            OptionValue::Overlays(v) => serde_json::to_value(v)?,
            OptionValue::Style(v) => serde_json::to_value(v)?,
            OptionValue::Image(_) => return Ok(None),
        };
        Ok(Some(json))
    }

    /// Parse `json` as a value of the same kind as `self`.
    pub fn from_json_like(
        &self,
        json: serde_json::Value,
    ) -> Result<OptionValue, serde_json::Error> {
        Ok(match self {
            OptionValue::Bool(_) => OptionValue::Bool(serde_json::from_value(json)?),
            OptionValue::Float(_) => OptionValue::Float(serde_json::from_value(json)?),
            OptionValue::Integer(_) => OptionValue::Integer(serde_json::from_value(json)?),
            OptionValue::Text(_) => OptionValue::Text(serde_json::from_value(json)?),
            OptionValue::SourceType(_) => OptionValue::SourceType(serde_json::from_value(json)?),
            OptionValue::DiagramMethod(_) => {
                OptionValue::DiagramMethod(serde_json::from_value(json)?)
            }
            OptionValue::Color(_) => OptionValue::Color(serde_json::from_value(json)?),
            OptionValue::Colorspace(_) => OptionValue::Colorspace(serde_json::from_value(json)?),
            OptionValue::ColorFormat(_) => OptionValue::ColorFormat(serde_json::from_value(json)?),
            OptionValue::Issues(_) => OptionValue::Issues(serde_json::from_value(json)?),
            OptionValue::Marker(_) => OptionValue::Marker(serde_json::from_value(json)?),
            OptionValue::Overlays(_) => OptionValue::Overlays(serde_json::from_value(json)?),
            OptionValue::Style(_) => OptionValue::Style(serde_json::from_value(json)?),
            OptionValue::Image(_) => OptionValue::Image(None),
        })
    }
}

/// Conversion between a concrete option type and [`OptionValue`].
pub trait OptionType: Clone {
    fn into_value(self) -> OptionValue;
    fn from_value(value: &OptionValue) -> Option<Self>;
}

macro_rules! impl_option_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl OptionType for $ty {
                fn into_value(self) -> OptionValue {
                    OptionValue::$variant(self)
                }

                fn from_value(value: &OptionValue) -> Option<Self> {
                    match value {
                        OptionValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_option_type!(
    bool => Bool,
    f64 => Float,
    u32 => Integer,
    String => Text,
    SourceType => SourceType,
    DiagramMethod => DiagramMethod,
    RgbColor => Color,
    Colorspace => Colorspace,
    ColorStringFormat => ColorFormat,
    UserIssue => Issues,
    MarkerShape => Marker,
    OverlayList => Overlays,
    PlotStyle => Style,
    Option<Arc<FloatImage>> => Image,
);

/// A named, typed and defaulted slot of the configuration store.
#[derive(Debug, Clone)]
pub struct ConfigOption<T> {
    identifier: &'static str,
    default: T,
}

impl<T: OptionType> ConfigOption<T> {
    pub fn new(identifier: &'static str, default: T) -> Self {
        Self {
            identifier,
            default,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub(crate) fn default_entry(&self) -> (&'static str, OptionValue) {
        (self.identifier, self.default.clone().into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_flags_combine() {
        let mut issues = UserIssue::empty();
        assert!(issues.is_empty());
        assert!(issues.messages().is_empty());
        issues |= UserIssue::HEX_COLORSPACE;
        issues.insert(UserIssue::HEX_FORCE_LINEAR);
        assert!(issues.contains(UserIssue::HEX_COLORSPACE));
        assert!(!issues.contains(UserIssue::VALUE_ERROR));
        assert_eq!(issues.messages().len(), 2);
        assert!(!UserIssue::empty().contains(UserIssue::empty()));
    }

    #[test]
    fn test_default_overlays() {
        let overlays = OverlayList::default();
        assert_eq!(overlays.source_color(), "#F44336");
        assert_eq!(overlays.len(), 5);
        assert!(overlays.slots().iter().all(|s| s.colorspace.is_none()));
    }

    #[test]
    fn test_option_value_round_trip_through_json() {
        let value = DiagramMethod::Cie1960Ucs.into_value();
        let json = value.to_json().unwrap().unwrap();
        assert_eq!(json, serde_json::json!("cie1960-ucs"));
        assert_eq!(value.from_json_like(json).unwrap(), value);

        let image: Option<Arc<FloatImage>> = None;
        assert_eq!(image.into_value().to_json().unwrap(), None);
    }

    #[test]
    fn test_typed_access() {
        let option = ConfigOption::new("scatter_size", 25.0);
        let (identifier, value) = option.default_entry();
        assert_eq!(identifier, "scatter_size");
        assert_eq!(f64::from_value(&value), Some(25.0));
        assert_eq!(bool::from_value(&value), None);
        assert!(value.same_kind(&OptionValue::Float(1.0)));
        assert!(!value.same_kind(&OptionValue::Integer(1)));
    }

    #[test]
    fn test_source_type_parsing() {
        assert_eq!("Image".parse::<SourceType>().unwrap(), SourceType::Image);
        assert_eq!("colour".parse::<SourceType>().unwrap(), SourceType::Color);
        assert!("video".parse::<SourceType>().is_err());
    }
}
