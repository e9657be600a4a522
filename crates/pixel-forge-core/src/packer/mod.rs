use crate::config::AtlasConfig;

pub mod grid;
pub mod shelf;

/// Space a texture occupies during packing.
///
/// In grid mode each side is rounded up to the next multiple of the tile
/// side; otherwise the intrinsic size is used.
pub fn footprint(w: u32, h: u32, cfg: &AtlasConfig) -> (u32, u32) {
    if cfg.use_grid {
        let tw = cfg.tile_width.max(1);
        let th = cfg.tile_height.max(1);
        (w.div_ceil(tw).saturating_mul(tw), h.div_ceil(th).saturating_mul(th))
    } else {
        (w, h)
    }
}
