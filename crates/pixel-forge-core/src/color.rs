//! Shared colour primitives: clamping, luma, RGB/HSL conversion, hue bands,
//! distance metric and hex notation.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Round and clamp a working value into a channel byte.
#[inline]
pub fn to_channel(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// ITU-R 601 luma used by the global saturation adjustment.
#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.2989 * r + 0.5870 * g + 0.1140 * b
}

/// Squared Euclidean distance between two RGB triples.
#[inline]
pub fn distance_sq(a: [f32; 3], b: Rgb<u8>) -> f32 {
    let dr = a[0] - b[0] as f32;
    let dg = a[1] - b[1] as f32;
    let db = a[2] - b[2] as f32;
    dr * dr + dg * dg + db * db
}

/// RGB (0..255) → HSL with hue in degrees `[0,360)`, saturation and lightness in `[0,1]`.
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r = r / 255.0;
    let g = g / 255.0;
    let b = b / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h * 60.0, s, l)
}

/// HSL (hue in degrees, s/l in `[0,1]`) → RGB (0..255, unclamped floats).
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        let v = l * 255.0;
        return (v, v, v);
    }
    let h = h / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0,
        hue_to_rgb(p, q, h) * 255.0,
        hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0,
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// The eight hue bands used by per-channel adjustments.
///
/// Boundaries (degrees): red `[345,360)∪[0,15)`, orange `[15,45)`, yellow `[45,75)`,
/// green `[75,165)`, cyan `[165,195)`, blue `[195,255)`, purple `[255,285)`,
/// magenta `[285,345)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HueBand {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
}

impl HueBand {
    pub const ALL: [HueBand; 8] = [
        HueBand::Red,
        HueBand::Orange,
        HueBand::Yellow,
        HueBand::Green,
        HueBand::Cyan,
        HueBand::Blue,
        HueBand::Purple,
        HueBand::Magenta,
    ];

    /// Classify a hue (degrees, any range) into exactly one band.
    pub fn from_hue(hue: f32) -> Self {
        let h = hue.rem_euclid(360.0);
        if !(15.0..345.0).contains(&h) {
            HueBand::Red
        } else if h < 45.0 {
            HueBand::Orange
        } else if h < 75.0 {
            HueBand::Yellow
        } else if h < 165.0 {
            HueBand::Green
        } else if h < 195.0 {
            HueBand::Cyan
        } else if h < 255.0 {
            HueBand::Blue
        } else if h < 285.0 {
            HueBand::Purple
        } else {
            HueBand::Magenta
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            HueBand::Red => "red",
            HueBand::Orange => "orange",
            HueBand::Yellow => "yellow",
            HueBand::Green => "green",
            HueBand::Cyan => "cyan",
            HueBand::Blue => "blue",
            HueBand::Purple => "purple",
            HueBand::Magenta => "magenta",
        }
    }
}

impl FromStr for HueBand {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HueBand::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Parse `#RGB`, `#RRGGBB` (the `#` is optional).
pub fn parse_hex(s: &str) -> Option<Rgb<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(Rgb(out))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgb([r, g, b]))
        }
        _ => None,
    }
}

/// Lowercase `#rrggbb` notation.
pub fn to_hex(c: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2])
}

/// Serde adapter storing an `Rgb<u8>` as a `#rrggbb` string.
pub mod serde_hex {
    use image::Rgb;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(c: &Rgb<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_hex(*c))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Rgb<u8>, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid hex colour: {s}")))
    }
}
