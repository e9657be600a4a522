use crate::config::AtlasConfig;

/// Snap `raw` to the nearest multiple of `cell` (half rounds away from zero).
pub fn snap(raw: f64, cell: u32) -> f64 {
    if cell == 0 {
        return raw;
    }
    let cell = cell as f64;
    (raw / cell).round() * cell
}

/// Convert a pointer position in canvas space into a texture placement.
///
/// The padding offset is removed first; in grid mode each axis then snaps to
/// the nearest multiple of `tile + padding`. Results are clamped at 0 and
/// non-finite input maps to 0. Overlaps with other textures are not checked.
pub fn placement_from_pointer(px: f64, py: f64, cfg: &AtlasConfig) -> (u32, u32) {
    let pad = cfg.padding as f64;
    let mut x = px - pad;
    let mut y = py - pad;
    if cfg.use_grid {
        let (cw, ch) = cfg.cell_size();
        x = snap(x, cw);
        y = snap(y, ch);
    }
    (to_coord(x), to_coord(y))
}

fn to_coord(v: f64) -> u32 {
    if !v.is_finite() {
        return 0;
    }
    v.round().clamp(0.0, u32::MAX as f64) as u32
}
