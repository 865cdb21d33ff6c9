//! Free-form plot styling and the scoped style context.
//!
//! A [`PlotStyle`] is a flat mapping of rc-like keys (`figure.facecolor`,
//! `font.size`, ...) to values. Diagram functions read the style of the
//! current thread; [`StyleContext::enter`] swaps it for the lifetime of the
//! returned guard.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::paint::Paint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Bool(v) => write!(f, "{}", v),
            StyleValue::Number(v) => write!(f, "{}", v),
            StyleValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        StyleValue::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotStyle {
    entries: BTreeMap<String, StyleValue>,
}

impl PlotStyle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dark theme used by default for every session.
    pub fn dark() -> Self {
        let mut style = Self::empty();
        style.set("figure.size_cm", 25.0);
        style.set("font.size", 12.0);
        style.set("figure.facecolor", "#1B1B1B00");
        style.set("axes.facecolor", "#1B1B1B00");
        style.set("text.color", "#FEFEFEFF");
        style.set("axes.labelcolor", "#666666FF");
        style.set("xtick.color", "#666666FF");
        style.set("ytick.color", "#666666FF");
        style.set("axes.edgecolor", "#666666FF");
        style.set("legend.facecolor", "#363636FF");
        style.set("legend.edgecolor", "#36363600");
        style
    }

    pub fn set<K: Into<String>, V: Into<StyleValue>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StyleValue)> {
        self.entries.iter()
    }

    /// Overlay `other` on top of this style.
    pub fn merged(&self, other: &PlotStyle) -> PlotStyle {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn number(&self, key: &str, fallback: f64) -> f64 {
        match self.entries.get(key) {
            Some(StyleValue::Number(v)) => *v,
            Some(StyleValue::Text(v)) => v.parse().unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// Colour stored under `key`; missing or unparseable entries give `fallback`.
    pub fn paint(&self, key: &str, fallback: Paint) -> Paint {
        match self.entries.get(key) {
            Some(StyleValue::Text(v)) => Paint::from_hex(v).unwrap_or(fallback),
            _ => fallback,
        }
    }
}

thread_local! {
    static CURRENT_STYLE: RefCell<PlotStyle> = RefCell::new(PlotStyle::empty());
}

/// Style in effect on this thread.
pub fn current_style() -> PlotStyle {
    CURRENT_STYLE.with(|style| style.borrow().clone())
}

/// Restores the previous thread style when dropped.
#[must_use = "the style is reverted as soon as the guard is dropped"]
pub struct StyleContext {
    previous: Option<PlotStyle>,
}

impl StyleContext {
    /// Apply `style` on top of the current one until the guard drops.
    pub fn enter(style: &PlotStyle) -> StyleContext {
        let previous = CURRENT_STYLE.with(|current| {
            let mut current = current.borrow_mut();
            let merged = current.merged(style);
            std::mem::replace(&mut *current, merged)
        });
        log::debug!("Entered style context with {} overrides", style.len());
        StyleContext {
            previous: Some(previous),
        }
    }
}

impl Drop for StyleContext {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CURRENT_STYLE.with(|current| *current.borrow_mut() = previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_previous_style() {
        assert!(current_style().get("font.size").is_none());
        {
            let _outer = StyleContext::enter(&PlotStyle::dark());
            assert_eq!(current_style().number("font.size", 0.0), 12.0);
            {
                let mut small = PlotStyle::empty();
                small.set("font.size", 8.0);
                let _inner = StyleContext::enter(&small);
                let style = current_style();
                assert_eq!(style.number("font.size", 0.0), 8.0);
                // keys from the outer context are kept
                assert!(style.get("figure.facecolor").is_some());
            }
            assert_eq!(current_style().number("font.size", 0.0), 12.0);
        }
        assert!(current_style().is_empty());
    }

    #[test]
    fn test_paint_lookup() {
        let style = PlotStyle::dark();
        let legend = style.paint("legend.facecolor", Paint::BLACK);
        assert_eq!(legend.to_hex(), "#363636");
        assert_eq!(legend.alpha, 1.0);
        let missing = style.paint("nope", Paint::WHITE);
        assert_eq!(missing, Paint::WHITE);
    }

    #[test]
    fn test_serialized_as_flat_map() {
        let mut style = PlotStyle::empty();
        style.set("font.size", 10.0);
        style.set("text.color", "#FFFFFF");
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(json, r##"{"font.size":10.0,"text.color":"#FFFFFF"}"##);
        let back: PlotStyle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, style);
    }
}
