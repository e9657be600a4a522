use image::{Rgba, RgbaImage};

/// Source-over blend of one straight-alpha pixel onto another.
#[inline]
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as u32;
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst[3] as u32;
    // out_a = sa + da * (1 - sa), all scaled by 255
    let out_a = sa * 255 + da * (255 - sa);
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as u32 * sa * 255 + dst[c] as u32 * da * (255 - sa) + out_a / 2) / out_a;
        out[c] = v.min(255) as u8;
    }
    out[3] = ((out_a + 127) / 255).min(255) as u8;
    Rgba(out)
}

/// Draw `src` onto `canvas` with its top-left at (dx, dy), 1:1 and unscaled.
///
/// Pixels are composited source-over, so fully transparent source pixels
/// leave the canvas untouched. Anything past the canvas edge is clipped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    if dx >= cw || dy >= ch {
        return;
    }
    let rw = sw.min(cw - dx);
    let rh = sh.min(ch - dy);
    for yy in 0..rh {
        for xx in 0..rw {
            let s = *src.get_pixel(xx, yy);
            if s[3] == 0 {
                continue;
            }
            let d = canvas.get_pixel_mut(dx + xx, dy + yy);
            *d = blend_over(*d, s);
        }
    }
}

/// Faint guide-grid line colour (white, ~10 % alpha).
pub const GUIDE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 26]);

/// Blend 1px guide lines at `offset + k * cell` on both axes.
pub fn draw_guide_grid(canvas: &mut RgbaImage, offset: u32, cell_w: u32, cell_h: u32) {
    let (cw, ch) = canvas.dimensions();
    if cell_w == 0 || cell_h == 0 {
        return;
    }
    let mut x = offset;
    while x < cw {
        for y in 0..ch {
            let d = canvas.get_pixel_mut(x, y);
            *d = blend_over(*d, GUIDE_COLOR);
        }
        x = x.saturating_add(cell_w);
    }
    let mut y = offset;
    while y < ch {
        for x in 0..cw {
            let d = canvas.get_pixel_mut(x, y);
            *d = blend_over(*d, GUIDE_COLOR);
        }
        y = y.saturating_add(cell_h);
    }
}
