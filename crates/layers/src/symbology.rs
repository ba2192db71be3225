use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stroke weight applied to the active feature.
pub const HIGHLIGHT_WEIGHT: f64 = 4.0;
/// Stroke color applied to the active feature.
pub const HIGHLIGHT_COLOR: &str = "#555";
/// Fill opacity floor for the active feature.
pub const HIGHLIGHT_FILL_OPACITY: f64 = 0.7;

pub const DEFAULT_UPLOAD_COLOR: &str = "#3388ff";
pub const DEFAULT_COMMAND_COLOR: &str = "#FF4500";

/// Preset colors offered by the style dialog.
pub const PALETTE: [&str; 12] = [
    "#3388ff", "#ff5733", "#33ff57", "#5733ff", "#ff33a8", "#33a8ff", "#a833ff", "#ffc233",
    "#ff3333", "#33fff8", "#b0ff33", "#333333",
];

/// The upload color picker offers the first eight presets.
pub fn upload_palette() -> &'static [&'static str] {
    &PALETTE[..8]
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashPattern {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl DashPattern {
    pub fn dash_array(&self) -> &'static str {
        match self {
            DashPattern::Solid => "",
            DashPattern::Dashed => "5,5",
            DashPattern::Dotted => "1,5",
            DashPattern::DashDot => "10,5,1,5",
        }
    }
}

impl FromStr for DashPattern {
    type Err = StyleRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solid" => Ok(DashPattern::Solid),
            "dashed" => Ok(DashPattern::Dashed),
            "dotted" => Ok(DashPattern::Dotted),
            "dash-dot" => Ok(DashPattern::DashDot),
            other => Err(StyleRangeError::DashPattern(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyle {
    pub opacity: f64,
    pub weight: f64,
    pub fill_opacity: f64,
    pub dash_pattern: DashPattern,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            weight: 2.0,
            fill_opacity: 0.3,
            dash_pattern: DashPattern::Solid,
        }
    }
}

/// Partial style update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylePatch {
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub weight: Option<f64>,
    pub fill_opacity: Option<f64>,
    pub dash_pattern: Option<DashPattern>,
}

impl StylePatch {
    /// Range check for values coming from user input.
    ///
    /// The registry accepts any value; this is where the style dialog's
    /// limits are enforced before a patch is applied.
    pub fn validated(self) -> Result<Self, StyleRangeError> {
        if let Some(w) = self.weight
            && !(w.fract() == 0.0 && (1.0..=10.0).contains(&w))
        {
            return Err(StyleRangeError::Weight(w));
        }
        if let Some(o) = self.opacity
            && !is_unit_step(o)
        {
            return Err(StyleRangeError::Opacity(o));
        }
        if let Some(o) = self.fill_opacity
            && !is_unit_step(o)
        {
            return Err(StyleRangeError::FillOpacity(o));
        }
        if let Some(c) = &self.color
            && parse_hex_color(c).is_none()
        {
            return Err(StyleRangeError::Color(c.clone()));
        }
        Ok(self)
    }

    pub(crate) fn apply_to(&self, style: &mut LayerStyle) {
        if let Some(v) = self.opacity {
            style.opacity = v;
        }
        if let Some(v) = self.weight {
            style.weight = v;
        }
        if let Some(v) = self.fill_opacity {
            style.fill_opacity = v;
        }
        if let Some(v) = self.dash_pattern {
            style.dash_pattern = v;
        }
    }
}

fn is_unit_step(v: f64) -> bool {
    let tenths = v * 10.0;
    (0.0..=1.0).contains(&v) && (tenths - tenths.round()).abs() < 1e-9
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleRangeError {
    Weight(f64),
    Opacity(f64),
    FillOpacity(f64),
    Color(String),
    DashPattern(String),
}

impl std::fmt::Display for StyleRangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleRangeError::Weight(v) => write!(f, "weight {v} must be an integer in 1..=10"),
            StyleRangeError::Opacity(v) => {
                write!(f, "opacity {v} must be in [0, 1] in steps of 0.1")
            }
            StyleRangeError::FillOpacity(v) => {
                write!(f, "fill opacity {v} must be in [0, 1] in steps of 0.1")
            }
            StyleRangeError::Color(c) => write!(f, "color {c:?} is not a #rrggbb hex value"),
            StyleRangeError::DashPattern(p) => write!(
                f,
                "dash pattern {p:?} must be one of solid, dashed, dotted, dash-dot"
            ),
        }
    }
}

impl std::error::Error for StyleRangeError {}

/// Accepts `#rgb` and `#rrggbb`.
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    match s.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, ch) in s.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => {
            let r = u8::from_str_radix(s.get(0..2)?, 16).ok()?;
            let g = u8::from_str_radix(s.get(2..4)?, 16).ok()?;
            let b = u8::from_str_radix(s.get(4..6)?, 16).ok()?;
            Some([r, g, b])
        }
        _ => None,
    }
}

/// Final path options for one feature, in the renderer's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStyle {
    pub weight: f64,
    pub color: String,
    pub opacity: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub dash_array: &'static str,
}

/// Computes presentation from the layer's base style and whether the feature
/// is the active selection. Nothing is cached: callers re-resolve every
/// feature on every render, so a selection change is reflected everywhere at
/// once.
pub fn resolve(base: &LayerStyle, color: &str, is_active: bool) -> RenderStyle {
    if is_active {
        RenderStyle {
            weight: HIGHLIGHT_WEIGHT,
            color: HIGHLIGHT_COLOR.to_string(),
            opacity: base.opacity,
            fill_color: color.to_string(),
            fill_opacity: base.fill_opacity.max(HIGHLIGHT_FILL_OPACITY),
            dash_array: base.dash_pattern.dash_array(),
        }
    } else {
        RenderStyle {
            weight: base.weight,
            color: color.to_string(),
            opacity: base.opacity,
            fill_color: color.to_string(),
            fill_opacity: base.fill_opacity,
            dash_array: base.dash_pattern.dash_array(),
        }
    }
}

/// Circle marker drawn for point features.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub fill_color: String,
    pub border_color: &'static str,
    pub size_px: u32,
    pub opacity: f64,
}

pub const MARKER_SIZE_PX: u32 = 20;
pub const MARKER_BORDER_COLOR: &str = "#333";

pub fn marker_style(base: &LayerStyle, color: &str, is_active: bool) -> MarkerStyle {
    MarkerStyle {
        fill_color: color.to_string(),
        border_color: if is_active {
            HIGHLIGHT_COLOR
        } else {
            MARKER_BORDER_COLOR
        },
        size_px: MARKER_SIZE_PX,
        opacity: base.fill_opacity.max(HIGHLIGHT_FILL_OPACITY),
    }
}
