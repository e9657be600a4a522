//! Palettes: automatic generation by tolerance bucketing, fixed presets and
//! hex-list import/export.

use crate::color::{parse_hex, to_hex};
use crate::error::{PixelForgeError, Result};
use image::{Rgb, RgbaImage};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Channel bucket width used by automatic palette generation.
pub const BUCKET_TOLERANCE: u8 = 25;
/// Pixels with alpha below this are ignored for statistics and quantization.
pub const ALPHA_THRESHOLD: u8 = 128;

static HEX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").expect("valid hex token regex")
});

/// Ordered, named list of colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaletteFile", into = "PaletteFile")]
pub struct Palette {
    pub name: String,
    pub colors: Vec<Rgb<u8>>,
}

/// On-disk palette shape: `{ "name": ..., "colors": ["#rrggbb", ...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaletteFile {
    #[serde(default)]
    name: String,
    colors: Vec<String>,
}

impl TryFrom<PaletteFile> for Palette {
    type Error = PixelForgeError;
    fn try_from(f: PaletteFile) -> Result<Self> {
        let mut colors = Vec::with_capacity(f.colors.len());
        for c in &f.colors {
            let rgb = parse_hex(c)
                .ok_or_else(|| PixelForgeError::PaletteImport(format!("invalid colour {c:?}")))?;
            colors.push(rgb);
        }
        if colors.is_empty() {
            return Err(PixelForgeError::PaletteImport("palette has no colours".into()));
        }
        Ok(Palette {
            name: f.name,
            colors,
        })
    }
}

impl From<Palette> for PaletteFile {
    fn from(p: Palette) -> Self {
        PaletteFile {
            colors: p.to_hex_list(),
            name: p.name,
        }
    }
}

impl Palette {
    pub fn new(name: impl Into<String>, colors: Vec<Rgb<u8>>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Two-entry black/white palette used when no opaque pixel exists.
    pub fn fallback() -> Self {
        Self::new("fallback", vec![Rgb([0, 0, 0]), Rgb([255, 255, 255])])
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn to_hex_list(&self) -> Vec<String> {
        self.colors.iter().map(|c| to_hex(*c)).collect()
    }
}

/// Build a palette of at most `max_colors` entries from the opaque pixels of `img`.
///
/// Each channel is floored to a multiple of [`BUCKET_TOLERANCE`], buckets are
/// ranked by pixel count (ties keep first-seen order) and the winners are
/// re-centred by half a bucket.
pub fn generate_auto(img: &RgbaImage, max_colors: usize) -> Palette {
    let max_colors = max_colors.max(1);
    let t = BUCKET_TOLERANCE;
    let mut order: Vec<([u8; 3], u32)> = Vec::new();
    let mut index: HashMap<[u8; 3], usize> = HashMap::new();

    for px in img.pixels() {
        if px[3] < ALPHA_THRESHOLD {
            continue;
        }
        let key = [(px[0] / t) * t, (px[1] / t) * t, (px[2] / t) * t];
        match index.get(&key) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(key, order.len());
                order.push((key, 1));
            }
        }
    }

    if order.is_empty() {
        debug!("no opaque pixels, using fallback palette");
        return Palette::fallback();
    }

    // stable: equal counts keep first-seen order
    order.sort_by(|a, b| b.1.cmp(&a.1));
    let half = t / 2;
    let colors: Vec<Rgb<u8>> = order
        .iter()
        .take(max_colors)
        .map(|(k, _)| Rgb(k.map(|v| v.saturating_add(half))))
        .collect();
    debug!(
        buckets = order.len(),
        colors = colors.len(),
        "generated auto palette"
    );
    Palette::new("auto", colors)
}

const GAMEBOY: [&str; 4] = ["#0f380f", "#306230", "#8bac0f", "#9bbc0f"];
const PICO8: [&str; 16] = [
    "#000000", "#1d2b53", "#7e2553", "#008751", "#ab5236", "#5f574f", "#c2c3c7", "#fff1e8",
    "#ff004d", "#ffa300", "#ffec27", "#00e436", "#29adff", "#83769c", "#ff77a8", "#ffccaa",
];
const CGA: [&str; 4] = ["#000000", "#55ffff", "#ff55ff", "#ffffff"];
const NES: [&str; 16] = [
    "#000000", "#fcfcfc", "#bcbcbc", "#7c7c7c", "#a40000", "#e40058", "#f83800", "#fca044",
    "#ac7c00", "#00b800", "#005800", "#008888", "#0058f8", "#6844fc", "#d800cc", "#f8b8f8",
];
const GRAYSCALE4: [&str; 4] = ["#000000", "#555555", "#aaaaaa", "#ffffff"];
const SWEETIE16: [&str; 16] = [
    "#1a1c2c", "#5d275d", "#b13e53", "#ef7d57", "#ffcd75", "#a7f070", "#38b764", "#257179",
    "#29366f", "#3b5dc9", "#41a6f6", "#73eff7", "#f4f4f4", "#94b0c2", "#566c86", "#333c57",
];

const PRESETS: [(&str, &[&str]); 6] = [
    ("gameboy", &GAMEBOY),
    ("pico8", &PICO8),
    ("cga", &CGA),
    ("nes", &NES),
    ("grayscale4", &GRAYSCALE4),
    ("sweetie16", &SWEETIE16),
];

/// Names of the built-in fixed palettes.
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(n, _)| *n)
}

/// Look up a built-in palette by (case-insensitive) name.
pub fn preset(name: &str) -> Result<Palette> {
    let key = name.trim().to_ascii_lowercase();
    let (n, hexes) = PRESETS
        .iter()
        .find(|(n, _)| *n == key)
        .ok_or_else(|| PixelForgeError::UnknownPreset(name.to_string()))?;
    let colors = hexes.iter().filter_map(|h| parse_hex(h)).collect();
    Ok(Palette::new(*n, colors))
}

/// Import a palette from arbitrary text containing `#RGB` / `#RRGGBB` tokens.
///
/// Duplicates (exact RGB) are dropped; first-seen order is kept.
pub fn import_palette(name: &str, text: &str) -> Result<Palette> {
    let mut seen: HashSet<[u8; 3]> = HashSet::new();
    let mut colors = Vec::new();
    for m in HEX_TOKEN.find_iter(text) {
        if let Some(c) = parse_hex(m.as_str()) {
            if seen.insert(c.0) {
                colors.push(c);
            }
        }
    }
    if colors.is_empty() {
        return Err(PixelForgeError::PaletteImport(
            "no #RGB or #RRGGBB colour tokens found".into(),
        ));
    }
    Ok(Palette::new(name, colors))
}

/// `{ "name": ..., "colors": [...] }` document.
pub fn export_palette_json(palette: &Palette) -> Result<String> {
    Ok(serde_json::to_string_pretty(palette)?)
}

/// One `#rrggbb` per line.
pub fn export_palette_text(palette: &Palette) -> String {
    let mut out = palette.to_hex_list().join("\n");
    out.push('\n');
    out
}
