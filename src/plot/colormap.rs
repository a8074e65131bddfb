//! Perceptual colormaps sampled at nine stops and linearly interpolated,
//! plus colour-name parsing for histogram fills.

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Colormap {
    Viridis,
    #[default]
    Plasma,
    Magma,
    Greys,
}

const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (72, 40, 120),
    (62, 73, 137),
    (49, 104, 142),
    (38, 130, 142),
    (31, 158, 137),
    (53, 183, 121),
    (110, 206, 88),
    (253, 231, 37),
];

const PLASMA: [(u8, u8, u8); 9] = [
    (13, 8, 135),
    (76, 2, 161),
    (126, 3, 168),
    (169, 35, 149),
    (204, 71, 120),
    (230, 108, 92),
    (248, 149, 64),
    (253, 197, 39),
    (240, 249, 33),
];

const MAGMA: [(u8, u8, u8); 9] = [
    (0, 0, 4),
    (28, 16, 68),
    (79, 18, 123),
    (129, 37, 129),
    (181, 54, 122),
    (229, 80, 100),
    (251, 135, 97),
    (254, 194, 135),
    (252, 253, 191),
];

const GREYS: [(u8, u8, u8); 2] = [(255, 255, 255), (0, 0, 0)];

impl Colormap {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            Self::Viridis => &VIRIDIS,
            Self::Plasma => &PLASMA,
            Self::Magma => &MAGMA,
            Self::Greys => &GREYS,
        }
    }

    /// Colour at `t` in [0, 1]; out-of-range and NaN clamp to the ends.
    pub fn at(self, t: f64) -> RGBColor {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (stops.len() - 1) as f64;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - i as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (stops[i], stops[i + 1]);
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }

    /// Colour for `v` normalized over `[lo, hi]`; a flat range maps to the top.
    pub fn normalized(self, v: f64, lo: f64, hi: f64) -> RGBColor {
        if hi > lo {
            self.at((v - lo) / (hi - lo))
        } else {
            self.at(1.0)
        }
    }
}

/// `#rrggbb` or one of a few common names.
pub fn parse_color(spec: &str) -> Result<RGBColor> {
    let s = spec.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() == 6 {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            if let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) {
                return Ok(RGBColor(r, g, b));
            }
        }
        return Err(AnalysisError::Render(format!("invalid hex colour {spec:?}")));
    }
    let rgb = match s.as_str() {
        "k" | "black" => (0, 0, 0),
        "w" | "white" => (255, 255, 255),
        "grey" | "gray" => (128, 128, 128),
        "r" | "red" => (255, 0, 0),
        "g" | "green" => (0, 128, 0),
        "b" | "blue" => (0, 0, 255),
        "indigo" => (75, 0, 130),
        "purple" => (128, 0, 128),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "orange" => (255, 165, 0),
        _ => return Err(AnalysisError::Render(format!("unknown colour {spec:?}"))),
    };
    Ok(RGBColor(rgb.0, rgb.1, rgb.2))
}
