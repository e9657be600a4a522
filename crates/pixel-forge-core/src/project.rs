//! Saved atlas workspaces.
//!
//! A project is a single JSON document holding the atlas settings and every
//! texture as an embedded PNG data URL, so it can be reopened without the
//! source image files. Loading is lenient: only a missing `textures` array is
//! fatal, every other field falls back to its default.

use crate::atlas::TextureAtlas;
use crate::config::{AtlasConfig, OverflowPolicy, coerce_dimension, coerce_offset};
use crate::error::{PixelForgeError, Result};
use crate::export::{from_data_url, to_data_url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const PROJECT_VERSION: &str = "1.1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectTexture {
    pub id: u64,
    pub name: String,
    /// `data:image/png;base64,...`
    pub data: String,
    pub w: u32,
    pub h: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AtlasProject {
    pub version: String,
    pub atlas_size: Size,
    pub tile_size: Size,
    pub padding: u32,
    pub use_grid: bool,
    #[serde(default, skip_serializing_if = "is_default_policy")]
    pub overflow: OverflowPolicy,
    pub textures: Vec<ProjectTexture>,
}

fn is_default_policy(p: &OverflowPolicy) -> bool {
    *p == OverflowPolicy::default()
}

impl AtlasProject {
    /// Snapshot an atlas. Every texture is re-encoded as PNG.
    pub fn from_atlas(atlas: &TextureAtlas) -> Result<Self> {
        let cfg = atlas.config();
        let textures = atlas
            .textures()
            .iter()
            .map(|t| {
                Ok(ProjectTexture {
                    id: t.id,
                    name: t.name.clone(),
                    data: to_data_url(&t.image)?,
                    w: t.width(),
                    h: t.height(),
                    x: t.x,
                    y: t.y,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            version: PROJECT_VERSION.to_string(),
            atlas_size: Size {
                w: cfg.width,
                h: cfg.height,
            },
            tile_size: Size {
                w: cfg.tile_width,
                h: cfg.tile_height,
            },
            padding: cfg.padding,
            use_grid: cfg.use_grid,
            overflow: cfg.overflow,
            textures,
        })
    }

    pub fn config(&self) -> AtlasConfig {
        AtlasConfig {
            width: self.atlas_size.w,
            height: self.atlas_size.h,
            tile_width: self.tile_size.w,
            tile_height: self.tile_size.h,
            padding: self.padding,
            use_grid: self.use_grid,
            overflow: self.overflow,
        }
        .sanitized()
    }

    /// Rebuild a live atlas. Textures that fail to decode are skipped.
    /// Ids are reassigned in file order.
    ///
    /// The stored canvas is kept as is, so a save/load round trip reproduces
    /// the config exactly. Textures placed past its edge stay where they are
    /// and are clipped by `compose()`; they show up in
    /// [`TextureAtlas::overflowing`] and callers that want them visible can
    /// call [`TextureAtlas::fit_canvas_to_content`].
    pub fn into_atlas(self) -> TextureAtlas {
        let mut atlas = TextureAtlas::new(self.config());
        let total = self.textures.len();
        for t in self.textures {
            match from_data_url(&t.data) {
                Ok(img) => {
                    atlas.add_texture_at(t.name, img, t.x, t.y);
                }
                Err(e) => warn!(name = %t.name, error = %e, "skipping texture with unreadable data"),
            }
        }
        debug!(loaded = atlas.len(), total, "project loaded");
        atlas
    }
}

/// Serialize an atlas to the project JSON document.
pub fn save_project(atlas: &TextureAtlas) -> Result<String> {
    Ok(serde_json::to_string_pretty(&AtlasProject::from_atlas(atlas)?)?)
}

#[instrument(skip_all)]
/// Parse a project document and rebuild the atlas it describes.
pub fn load_project(text: &str) -> Result<TextureAtlas> {
    Ok(parse_project(text)?.into_atlas())
}

/// Lenient parse into an [`AtlasProject`] without decoding any image data.
pub fn parse_project(text: &str) -> Result<AtlasProject> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| PixelForgeError::InvalidProject(format!("not valid JSON: {e}")))?;
    let obj = root
        .as_object()
        .ok_or_else(|| PixelForgeError::InvalidProject("top level is not an object".into()))?;
    let textures = obj
        .get("textures")
        .and_then(Value::as_array)
        .ok_or_else(|| PixelForgeError::InvalidProject("missing textures array".into()))?;

    let defaults = AtlasConfig::default();
    let (width, height) = size_field(obj.get("atlasSize"), defaults.width, defaults.height);
    let (tile_w, tile_h) = size_field(obj.get("tileSize"), defaults.tile_width, defaults.tile_height);
    let padding = number(obj.get("padding"))
        .map(|v| coerce_offset(v, defaults.padding))
        .unwrap_or(defaults.padding);
    let use_grid = obj
        .get("useGrid")
        .and_then(Value::as_bool)
        .unwrap_or(defaults.use_grid);
    let overflow = obj
        .get("overflow")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or(PROJECT_VERSION)
        .to_string();

    let mut entries = Vec::with_capacity(textures.len());
    for (i, t) in textures.iter().enumerate() {
        let Some(t) = t.as_object() else {
            warn!(index = i, "skipping texture record that is not an object");
            continue;
        };
        let name = t
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("texture_{i}"));
        let Some(data) = t.get("data").and_then(Value::as_str) else {
            warn!(%name, "skipping texture without image data");
            continue;
        };
        let coord = |key: &str| number(t.get(key)).map(|v| coerce_offset(v, 0)).unwrap_or(0);
        entries.push(ProjectTexture {
            id: t.get("id").and_then(Value::as_u64).unwrap_or(i as u64 + 1),
            name,
            data: data.to_string(),
            w: coord("w"),
            h: coord("h"),
            x: coord("x"),
            y: coord("y"),
        });
    }

    Ok(AtlasProject {
        version,
        atlas_size: Size {
            w: width,
            h: height,
        },
        tile_size: Size {
            w: tile_w,
            h: tile_h,
        },
        padding,
        use_grid,
        overflow,
        textures: entries,
    })
}

/// Numbers may be stored as JSON numbers or numeric strings.
fn number(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn size_field(v: Option<&Value>, dw: u32, dh: u32) -> (u32, u32) {
    let Some(obj) = v.and_then(Value::as_object) else {
        return (dw, dh);
    };
    let w = number(obj.get("w")).map(|v| coerce_dimension(v, dw)).unwrap_or(dw);
    let h = number(obj.get("h")).map(|v| coerce_dimension(v, dh)).unwrap_or(dh);
    (w, h)
}
