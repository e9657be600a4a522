use crate::atlas::TextureAtlas;
use crate::error::{PixelForgeError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use serde_json::{Value, json};
use std::io::Cursor;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode an RGBA raster as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Decode any format the `image` crate recognises into RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// `data:image/png;base64,...` URL for a raster.
pub fn to_data_url(img: &RgbaImage) -> Result<String> {
    let png = encode_png(img)?;
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png)))
}

/// Decode a base64 data URL (any image MIME type) or a bare base64 payload.
pub fn from_data_url(url: &str) -> Result<RgbaImage> {
    let payload = match url.split_once("base64,") {
        Some((head, rest)) if head.starts_with("data:") => rest,
        _ => url,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| PixelForgeError::Encode(format!("invalid base64 image data: {e}")))?;
    decode_image(&bytes)
}

/// Layout metadata for engines: `{ frames: [{ name, x, y, w, h }], meta }`.
///
/// Frame coordinates are where the pixels land in the exported PNG
/// (placement plus padding).
pub fn to_layout_json(atlas: &TextureAtlas) -> Value {
    let cfg = atlas.config();
    let frames: Vec<Value> = atlas
        .textures()
        .iter()
        .map(|t| {
            let (x, y) = t.drawn_origin(cfg.padding);
            json!({
                "name": t.name,
                "frame": {
                    "x": x,
                    "y": y,
                    "w": t.width(),
                    "h": t.height(),
                },
                "sourceSize": {"w": t.width(), "h": t.height()},
            })
        })
        .collect();
    json!({
        "frames": frames,
        "meta": {
            "app": "pixel-forge",
            "version": env!("CARGO_PKG_VERSION"),
            "format": "RGBA8888",
            "size": {"w": cfg.width, "h": cfg.height},
            "tileSize": {"w": cfg.tile_width, "h": cfg.tile_height},
            "padding": cfg.padding,
            "useGrid": cfg.use_grid,
        }
    })
}
