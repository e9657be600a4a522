//! Core library for turning images into pixel art and packing sprites into atlases.
//!
//! - Pixel pipeline: resize → grade → palette → quantize/dither → cleanup →
//!   roughness → manual edits → outline (`pixelate`)
//! - Palettes: auto (bucketed histogram), fixed presets, hex import/export
//! - Atlas: shelf auto-arrange, grid-snapped manual placement, PNG compositing,
//!   project save/load
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use pixel_forge_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let src = ImageReader::open("photo.png")?.decode()?.to_rgba8();
//! let cfg = PipelineConfig::builder().target_width(64).auto_colors(16).build();
//! let out = pixelate(&src, &cfg, &ManualEdits::new())?;
//!
//! let mut atlas = TextureAtlas::new(AtlasConfig::default());
//! atlas.add_texture("hero", out.image);
//! atlas.auto_arrange()?;
//! std::fs::write("atlas.png", encode_png(&atlas.compose())?)?;
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod color;
pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod grading;
pub mod model;
pub mod overlay;
pub mod packer;
pub mod palette;
pub mod pipeline;
pub mod postprocess;
pub mod project;
pub mod quantize;
pub mod runtime;

pub use atlas::TextureAtlas;
pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use overlay::{ManualEdits, PixelEdit};
pub use palette::Palette;
pub use pipeline::*;
pub use project::{AtlasProject, load_project, save_project};

/// Convenience prelude for common types and functions.
/// Importing `pixel_forge_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::TextureAtlas;
    pub use crate::color::HueBand;
    pub use crate::config::{
        AtlasConfig, AtlasConfigBuilder, ColorMode, OverflowPolicy, PipelineConfig,
        PipelineConfigBuilder, ScaleMode,
    };
    pub use crate::export::{decode_image, encode_png, to_layout_json};
    pub use crate::model::{ArrangeReport, AtlasStats, Rect, TextureEntry};
    pub use crate::overlay::ManualEdits;
    pub use crate::palette::{Palette, import_palette, preset};
    pub use crate::pipeline::{PixelOutput, pixelate};
    pub use crate::project::{load_project, save_project};
    pub use crate::runtime::PixelSession;
}
