//! Plot style loaded from YAML.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pvf_core::{ErrorInfo, PvfError};
use serde::{Deserialize, Serialize};

/// Opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0, 0, 0);
    pub const WHITE: Colour = Colour::rgb(255, 255, 255);
    pub const GREY: Colour = Colour::rgb(128, 128, 128);
    pub const DARK_ORANGE: Colour = Colour::rgb(255, 140, 0);
    pub const DARK_GREEN: Colour = Colour::rgb(0, 100, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Point `fraction` along the plasma colour map, clamped to `[0, 1]`.
    pub fn plasma(fraction: f64) -> Self {
        const STOPS: [(u8, u8, u8); 5] = [
            (13, 8, 135),
            (126, 3, 168),
            (204, 71, 120),
            (248, 149, 64),
            (240, 249, 33),
        ];
        let position = fraction.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
        let lower = (position.floor() as usize).min(STOPS.len() - 2);
        let weight = position - lower as f64;
        let mix = |a: u8, b: u8| (a as f64 + weight * (b as f64 - a as f64)).round() as u8;
        let (a, b) = (STOPS[lower], STOPS[lower + 1]);
        Colour::rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Colour> for String {
    fn from(colour: Colour) -> Self {
        colour.to_string()
    }
}

impl TryFrom<String> for Colour {
    type Error = PvfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Colour {
    type Err = PvfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let named = match s {
            "black" => Some(Colour::BLACK),
            "white" => Some(Colour::WHITE),
            "grey" | "gray" => Some(Colour::GREY),
            "darkorange" => Some(Colour::DARK_ORANGE),
            "darkgreen" => Some(Colour::DARK_GREEN),
            _ => None,
        };
        if let Some(colour) = named {
            return Ok(colour);
        }
        let invalid = || {
            PvfError::Plot(
                ErrorInfo::new("invalid-colour", format!("cannot read colour {s}"))
                    .with_hint("use #rrggbb or one of black, white, grey, darkorange, darkgreen"),
            )
        };
        let hex = s.strip_prefix('#').filter(|hex| hex.len() == 6).ok_or_else(invalid)?;
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(invalid)
        };
        Ok(Colour::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

fn default_palette() -> Vec<Colour> {
    [
        (0x1f, 0x77, 0xb4),
        (0xff, 0x7f, 0x0e),
        (0x2c, 0xa0, 0x2c),
        (0xd6, 0x27, 0x28),
        (0x94, 0x67, 0xbd),
        (0x8c, 0x56, 0x4b),
        (0xe3, 0x77, 0xc2),
        (0x7f, 0x7f, 0x7f),
        (0xbc, 0xbd, 0x22),
        (0x17, 0xbe, 0xcf),
    ]
    .into_iter()
    .map(|(r, g, b)| Colour::rgb(r, g, b))
    .collect()
}

fn default_dpi() -> f64 {
    150.0
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_font_size() -> u32 {
    14
}

fn default_line_width() -> u32 {
    1
}

fn default_marker_size() -> u32 {
    4
}

fn default_band_opacity() -> f64 {
    0.2
}

fn default_margin() -> u32 {
    10
}

/// Figure appearance shared by every plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    /// Pixels per inch of figure size.
    #[serde(default = "default_dpi")]
    pub dpi: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size of labels, in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    /// Marker radius, in pixels.
    #[serde(default = "default_marker_size")]
    pub marker_size: u32,
    /// Colours handed out in order by colour registries.
    #[serde(default = "default_palette")]
    pub palette: Vec<Colour>,
    /// Opacity of error bands.
    #[serde(default = "default_band_opacity")]
    pub band_opacity: f64,
    /// Space around each panel, in pixels.
    #[serde(default = "default_margin")]
    pub margin: u32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            line_width: default_line_width(),
            marker_size: default_marker_size(),
            palette: default_palette(),
            band_opacity: default_band_opacity(),
            margin: default_margin(),
        }
    }
}

impl PlotStyle {
    /// Reads a style file; fields it leaves out take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, PvfError> {
        let text =
            std::fs::read_to_string(path).map_err(|err| PvfError::io("read-failed", path, err))?;
        let style: PlotStyle = serde_yaml::from_str(&text).map_err(|err| {
            PvfError::Serde(ErrorInfo::new("invalid-style", err.to_string()).with_path(path))
        })?;
        if style.palette.is_empty() {
            return Err(PvfError::Plot(
                ErrorInfo::new("empty-palette", "style palette holds no colours").with_path(path),
            ));
        }
        Ok(style)
    }

    /// Style from `path`, or the default style without one.
    pub fn load(path: Option<&Path>) -> Result<Self, PvfError> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Palette entry `index`, cycling through the palette.
    pub fn colour(&self, index: usize) -> Colour {
        if self.palette.is_empty() {
            return Colour::BLACK;
        }
        self.palette[index % self.palette.len()]
    }

    /// Pixel dimensions of a figure of `size` inches.
    pub fn pixels(&self, size: (f64, f64)) -> (u32, u32) {
        let scale = |inches: f64| (inches * self.dpi).round().max(1.0) as u32;
        (scale(size.0), scale(size.1))
    }
}
