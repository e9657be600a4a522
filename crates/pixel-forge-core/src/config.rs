//! Pipeline and atlas configuration.
//! Key notes:
//!   - every run receives one immutable `PipelineConfig`; nothing is read from ambient state
//!   - `seed` makes noise/roughness reproducible; `None` seeds from entropy
//!   - call `sanitized()` on values coming from untrusted input before `validate()`

use crate::color::HueBand;
use crate::palette::{Palette, preset};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the source is resampled before any colour work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ScaleMode {
    /// Nearest-neighbour reduction to `target_width`, height from the aspect ratio.
    Downscale { target_width: u32 },
    /// Nearest-neighbour enlargement by an integer factor (1..=16).
    Upscale { factor: u32 },
}

impl Default for ScaleMode {
    fn default() -> Self {
        ScaleMode::Downscale { target_width: 32 }
    }
}

/// Where the quantization palette comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ColorMode {
    /// Generated from the graded image by tolerance bucketing.
    Auto { max_colors: usize },
    /// A built-in palette, by name (see `palette::preset_names`).
    Preset { name: String },
    /// A caller-supplied palette (e.g. imported from hex text).
    Custom { palette: Palette },
    /// No palette: source colours pass through unquantized.
    Keep,
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Auto { max_colors: 16 }
    }
}

/// Saturation (±100 %) and lightness (±50 %) deltas for one hue band.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelAdjustment {
    pub saturation: f32,
    pub lightness: f32,
}

impl ChannelAdjustment {
    pub fn new(saturation: f32, lightness: f32) -> Self {
        Self {
            saturation,
            lightness,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.saturation == 0.0 && self.lightness == 0.0
    }
}

/// Per-band adjustments, indexed by `HueBand`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelAdjustments {
    pub red: ChannelAdjustment,
    pub orange: ChannelAdjustment,
    pub yellow: ChannelAdjustment,
    pub green: ChannelAdjustment,
    pub cyan: ChannelAdjustment,
    pub blue: ChannelAdjustment,
    pub purple: ChannelAdjustment,
    pub magenta: ChannelAdjustment,
}

impl ChannelAdjustments {
    pub fn get(&self, band: HueBand) -> ChannelAdjustment {
        match band {
            HueBand::Red => self.red,
            HueBand::Orange => self.orange,
            HueBand::Yellow => self.yellow,
            HueBand::Green => self.green,
            HueBand::Cyan => self.cyan,
            HueBand::Blue => self.blue,
            HueBand::Purple => self.purple,
            HueBand::Magenta => self.magenta,
        }
    }

    pub fn get_mut(&mut self, band: HueBand) -> &mut ChannelAdjustment {
        match band {
            HueBand::Red => &mut self.red,
            HueBand::Orange => &mut self.orange,
            HueBand::Yellow => &mut self.yellow,
            HueBand::Green => &mut self.green,
            HueBand::Cyan => &mut self.cyan,
            HueBand::Blue => &mut self.blue,
            HueBand::Purple => &mut self.purple,
            HueBand::Magenta => &mut self.magenta,
        }
    }

    pub fn set(&mut self, band: HueBand, adj: ChannelAdjustment) {
        *self.get_mut(band) = adj;
    }

    pub fn is_neutral(&self) -> bool {
        HueBand::ALL.iter().all(|b| self.get(*b).is_neutral())
    }
}

/// Global and per-band colour grading applied before palette selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GradingConfig {
    /// Added to R,G,B (-50..50).
    pub brightness: f32,
    /// Contrast delta (-50..50).
    pub contrast: f32,
    /// Global saturation delta in percent (-100..100).
    pub saturation: f32,
    pub channels: ChannelAdjustments,
    /// Luminance noise amount before quantization (0..0.5).
    pub noise: f32,
}

impl GradingConfig {
    pub fn is_neutral(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 0.0
            && self.saturation == 0.0
            && self.noise == 0.0
            && self.channels.is_neutral()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DitherConfig {
    pub enabled: bool,
    /// Error scale in (0,1]; sanitized into 0.1..=1.0.
    pub strength: f32,
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    /// Orphan-removal passes (1 or 2).
    pub passes: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            passes: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutlineConfig {
    pub enabled: bool,
    #[serde(with = "crate::color::serde_hex")]
    pub color: Rgb<u8>,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Rgb([0, 0, 0]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub scale: ScaleMode,
    pub color: ColorMode,
    pub grading: GradingConfig,
    pub dither: DitherConfig,
    pub cleanup: CleanupConfig,
    /// Post-quantization grain (0..0.5).
    pub roughness: f32,
    pub outline: OutlineConfig,
    /// Seed for noise and roughness; `None` draws from entropy.
    pub seed: Option<u64>,
}

/// Replace non-finite values by `fallback`, then clamp into `[lo, hi]`.
fn clamp_finite(v: f32, fallback: f32, lo: f32, hi: f32) -> f32 {
    if v.is_finite() {
        v.clamp(lo, hi)
    } else {
        fallback
    }
}

impl PipelineConfig {
    /// Returns a copy with every numeric field coerced into its documented range.
    /// Non-finite values fall back to the neutral default; sizes are at least 1.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.scale = match c.scale {
            ScaleMode::Downscale { target_width } => ScaleMode::Downscale {
                target_width: target_width.max(1),
            },
            ScaleMode::Upscale { factor } => ScaleMode::Upscale {
                factor: factor.clamp(1, 16),
            },
        };
        if let ColorMode::Auto { max_colors } = &mut c.color {
            *max_colors = (*max_colors).max(1);
        }
        let g = &mut c.grading;
        g.brightness = clamp_finite(g.brightness, 0.0, -50.0, 50.0);
        g.contrast = clamp_finite(g.contrast, 0.0, -50.0, 50.0);
        g.saturation = clamp_finite(g.saturation, 0.0, -100.0, 100.0);
        g.noise = clamp_finite(g.noise, 0.0, 0.0, 0.5);
        for band in HueBand::ALL {
            let adj = g.channels.get_mut(band);
            adj.saturation = clamp_finite(adj.saturation, 0.0, -100.0, 100.0);
            adj.lightness = clamp_finite(adj.lightness, 0.0, -50.0, 50.0);
        }
        c.dither.strength = clamp_finite(c.dither.strength, 1.0, 0.1, 1.0);
        c.cleanup.passes = c.cleanup.passes.clamp(1, 2);
        c.roughness = clamp_finite(c.roughness, 0.0, 0.0, 0.5);
        c
    }

    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - The target width or upscale factor is zero
    /// - An auto palette asks for zero colours
    /// - A preset name is unknown or a custom palette is empty
    /// - A float parameter is not finite
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::PixelForgeError;

        match self.scale {
            ScaleMode::Downscale { target_width: 0 } => {
                return Err(PixelForgeError::InvalidDimensions {
                    width: 0,
                    height: 0,
                });
            }
            ScaleMode::Upscale { factor } if factor == 0 || factor > 16 => {
                return Err(PixelForgeError::InvalidConfig(format!(
                    "upscale factor {factor} outside 1..=16"
                )));
            }
            _ => {}
        }
        match &self.color {
            ColorMode::Auto { max_colors: 0 } => {
                return Err(PixelForgeError::InvalidConfig(
                    "auto palette needs at least one colour".into(),
                ));
            }
            ColorMode::Preset { name } => {
                preset(name)?;
            }
            ColorMode::Custom { palette } if palette.is_empty() => {
                return Err(PixelForgeError::InvalidConfig("custom palette is empty".into()));
            }
            _ => {}
        }
        let g = &self.grading;
        let floats = [
            g.brightness,
            g.contrast,
            g.saturation,
            g.noise,
            self.dither.strength,
            self.roughness,
        ];
        if floats.iter().any(|v| !v.is_finite()) {
            return Err(PixelForgeError::InvalidConfig(
                "non-finite numeric parameter".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for `PipelineConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PipelineConfigBuilder {
    cfg: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PipelineConfig::default(),
        }
    }
    pub fn target_width(mut self, w: u32) -> Self {
        self.cfg.scale = ScaleMode::Downscale { target_width: w };
        self
    }
    pub fn upscale(mut self, factor: u32) -> Self {
        self.cfg.scale = ScaleMode::Upscale { factor };
        self
    }
    pub fn auto_colors(mut self, max_colors: usize) -> Self {
        self.cfg.color = ColorMode::Auto { max_colors };
        self
    }
    pub fn preset(mut self, name: impl Into<String>) -> Self {
        self.cfg.color = ColorMode::Preset { name: name.into() };
        self
    }
    pub fn palette(mut self, palette: Palette) -> Self {
        self.cfg.color = ColorMode::Custom { palette };
        self
    }
    pub fn keep_colors(mut self) -> Self {
        self.cfg.color = ColorMode::Keep;
        self
    }
    pub fn brightness(mut self, v: f32) -> Self {
        self.cfg.grading.brightness = v;
        self
    }
    pub fn contrast(mut self, v: f32) -> Self {
        self.cfg.grading.contrast = v;
        self
    }
    pub fn saturation(mut self, v: f32) -> Self {
        self.cfg.grading.saturation = v;
        self
    }
    pub fn channel(mut self, band: HueBand, saturation: f32, lightness: f32) -> Self {
        self.cfg
            .grading
            .channels
            .set(band, ChannelAdjustment::new(saturation, lightness));
        self
    }
    pub fn noise(mut self, v: f32) -> Self {
        self.cfg.grading.noise = v;
        self
    }
    pub fn dither(mut self, enabled: bool, strength: f32) -> Self {
        self.cfg.dither = DitherConfig { enabled, strength };
        self
    }
    pub fn cleanup(mut self, passes: u32) -> Self {
        self.cfg.cleanup = CleanupConfig {
            enabled: passes > 0,
            passes: passes.max(1),
        };
        self
    }
    pub fn roughness(mut self, v: f32) -> Self {
        self.cfg.roughness = v;
        self
    }
    pub fn outline(mut self, color: Rgb<u8>) -> Self {
        self.cfg.outline = OutlineConfig {
            enabled: true,
            color,
        };
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.cfg.seed = Some(seed);
        self
    }
    pub fn build(self) -> PipelineConfig {
        self.cfg
    }
}

impl PipelineConfig {
    /// Create a fluent builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// What auto-arrange does when content runs past the canvas.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep the placements and list the overflowing ids in the report.
    #[default]
    Report,
    /// Enlarge the canvas to the content bounds.
    Grow,
    /// Leave every position unchanged and return `OutOfSpace`.
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "grow" => Ok(Self::Grow),
            "reject" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Canvas width in pixels.
    #[serde(default = "default_canvas")]
    pub width: u32,
    /// Canvas height in pixels.
    #[serde(default = "default_canvas")]
    pub height: u32,
    /// Grid cell width (only used when `use_grid`).
    #[serde(default = "default_tile")]
    pub tile_width: u32,
    /// Grid cell height (only used when `use_grid`).
    #[serde(default = "default_tile")]
    pub tile_height: u32,
    /// Pixels around every placed texture; also the grid gap.
    #[serde(default)]
    pub padding: u32,
    /// Round footprints up to tiles and snap manual placement to the grid.
    #[serde(default = "default_use_grid")]
    pub use_grid: bool,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas(),
            height: default_canvas(),
            tile_width: default_tile(),
            tile_height: default_tile(),
            padding: 0,
            use_grid: default_use_grid(),
            overflow: OverflowPolicy::default(),
        }
    }
}

fn default_canvas() -> u32 {
    512
}
fn default_tile() -> u32 {
    16
}
fn default_use_grid() -> bool {
    true
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if the canvas or the tile size has a zero dimension.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::PixelForgeError;

        if self.width == 0 || self.height == 0 {
            return Err(PixelForgeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(PixelForgeError::InvalidConfig(format!(
                "tile size must be at least 1x1, got {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        Ok(())
    }

    /// Returns a copy with every dimension coerced to at least 1.
    pub fn sanitized(&self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
            tile_width: self.tile_width.max(1),
            tile_height: self.tile_height.max(1),
            ..*self
        }
    }

    /// Grid pitch on each axis: tile size plus padding.
    pub fn cell_size(&self) -> (u32, u32) {
        (
            self.tile_width.max(1) + self.padding,
            self.tile_height.max(1) + self.padding,
        )
    }
}

/// Coerce a raw numeric input into a dimension (>= 1).
/// Non-finite input keeps `previous`; fractions truncate.
pub fn coerce_dimension(v: f64, previous: u32) -> u32 {
    if !v.is_finite() {
        return previous.max(1);
    }
    v.trunc().clamp(1.0, u32::MAX as f64) as u32
}

/// Coerce a raw numeric input into a padding/offset (>= 0).
/// Non-finite input keeps `previous`; fractions truncate.
pub fn coerce_offset(v: f64, previous: u32) -> u32 {
    if !v.is_finite() {
        return previous;
    }
    v.trunc().clamp(0.0, u32::MAX as f64) as u32
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn with_canvas(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = w;
        self.cfg.height = h;
        self
    }
    pub fn with_tile(mut self, w: u32, h: u32) -> Self {
        self.cfg.tile_width = w;
        self.cfg.tile_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn use_grid(mut self, v: bool) -> Self {
        self.cfg.use_grid = v;
        self
    }
    pub fn overflow(mut self, v: OverflowPolicy) -> Self {
        self.cfg.overflow = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

impl AtlasConfig {
    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}
