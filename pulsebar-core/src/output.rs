//! Display representation.
//!
//! Render functions map module state to an [`Output`]: an ordered group of
//! [`Segment`]s. The first segment is conventionally the compact summary and
//! the rest are detail. An empty output means the module is hidden.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ColorError;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb`.
    pub fn hex(s: &str) -> Result<Self, ColorError> {
        let err = || ColorError(s.to_string());
        let digits = s.strip_prefix('#').ok_or_else(err)?;
        if !digits.is_ascii() {
            return Err(err());
        }
        let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| err());
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..=i].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(err()),
        }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::hex(&s).map_err(serde::de::Error::custom)
    }
}

/// One block of text on the bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub urgent: bool,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A segment that is only an icon.
    pub fn icon(icon: impl Into<String>) -> Self {
        Self {
            icon: Some(icon.into()),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Icon opacity, clamped to `0.0..=1.0`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha.clamp(0.0, 1.0));
        self
    }
}

/// An ordered group of segments produced by one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Output {
    segments: SmallVec<[Segment; 4]>,
}

impl Output {
    /// An output that hides the module.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Whether the module is hidden.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment, shown when the bar is collapsed.
    pub fn summary(&self) -> Option<&Segment> {
        self.segments.first()
    }

    /// Everything after the summary.
    pub fn detail(&self) -> &[Segment] {
        self.segments.get(1..).unwrap_or(&[])
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl From<Segment> for Output {
    fn from(segment: Segment) -> Self {
        Self::empty().with(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_and_short_hex() {
        assert_eq!(Color::hex("#238555"), Ok(Color::rgb(0x23, 0x85, 0x55)));
        assert_eq!(Color::hex("#f70"), Ok(Color::rgb(0xff, 0x77, 0x00)));
    }

    #[test]
    fn reject_bad_colors() {
        for bad in ["238555", "#12", "#12345g", "#ééé", ""] {
            assert!(Color::hex(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn color_displays_as_long_hex() {
        assert_eq!(Color::rgb(0xff, 0x77, 0x00).to_string(), "#ff7700");
    }

    #[test]
    fn summary_and_detail_split() {
        let output = Output::empty()
            .with(Segment::icon("mdi-coffee"))
            .with(Segment::text("up to date"))
            .with(Segment::text("12% used"));

        assert_eq!(output.summary().and_then(|s| s.icon.as_deref()), Some("mdi-coffee"));
        assert_eq!(output.detail().len(), 2);
        assert!(Output::empty().detail().is_empty());
    }

    #[test]
    fn empty_output_hides_module() {
        assert!(Output::empty().is_empty());
        assert!(!Output::from(Segment::icon("mdi-coffee")).is_empty());
        assert_eq!(serde_json::to_string(&Output::empty()).unwrap(), "[]");
    }

    #[test]
    fn segment_serializes_without_defaults() {
        let json = serde_json::to_string(&Segment::text("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi"}"#);

        let json = serde_json::to_string(&Segment::text("x").color(Color::rgb(1, 2, 3))).unwrap();
        assert_eq!(json, r##"{"text":"x","color":"#010203"}"##);
    }
}
