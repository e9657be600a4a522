//! Neighbourhood passes that run after quantization: orphan cleanup,
//! surface roughness and outline generation.

use crate::color::to_channel;
use crate::palette::ALPHA_THRESHOLD;
use image::{Rgb, Rgba, RgbaImage};
use rand::Rng;

#[inline]
fn same_rgb(a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
    a[0] == b[0] && a[1] == b[1] && a[2] == b[2]
}

/// One orphan-removal pass. Returns the number of pixels changed.
///
/// An interior opaque pixel whose four orthogonal neighbours all differ from it
/// takes the colour of its upper neighbour. Reads come from a snapshot, so
/// replacements never cascade within a pass.
pub fn remove_orphans(img: &mut RgbaImage) -> usize {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return 0;
    }
    let snap = img.clone();
    let mut changed = 0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = snap.get_pixel(x, y);
            if p[3] < ALPHA_THRESHOLD {
                continue;
            }
            // order: up, down, left, right
            let neighbours = [
                snap.get_pixel(x, y - 1),
                snap.get_pixel(x, y + 1),
                snap.get_pixel(x - 1, y),
                snap.get_pixel(x + 1, y),
            ];
            if neighbours.iter().any(|n| same_rgb(p, n)) {
                continue;
            }
            let src = neighbours[0];
            let dst = img.get_pixel_mut(x, y);
            dst[0] = src[0];
            dst[1] = src[1];
            dst[2] = src[2];
            changed += 1;
        }
    }
    changed
}

/// Run `passes` cleanup passes; returns the total number of changed pixels.
pub fn cleanup(img: &mut RgbaImage, passes: u32) -> usize {
    (0..passes).map(|_| remove_orphans(img)).sum()
}

/// Add per-pixel grain in `[-R*75, +R*75]` (shared by R,G,B) to opaque pixels.
pub fn roughen<R: Rng + ?Sized>(img: &mut RgbaImage, strength: f32, rng: &mut R) {
    let half = strength * 150.0 / 2.0;
    if half <= 0.0 {
        return;
    }
    for px in img.pixels_mut() {
        if px[3] < ALPHA_THRESHOLD {
            continue;
        }
        let n: f32 = rng.gen_range(-half..=half);
        for c in 0..3 {
            px[c] = to_channel(px[c] as f32 + n);
        }
    }
}

/// Paint every transparent pixel touching an opaque one (4-connected) with `color`.
/// Returns the number of outline pixels written.
pub fn outline(img: &mut RgbaImage, color: Rgb<u8>) -> usize {
    let (w, h) = img.dimensions();
    let snap = img.clone();
    let opaque = |x: u32, y: u32| snap.get_pixel(x, y)[3] >= ALPHA_THRESHOLD;
    let mut written = 0;
    for y in 0..h {
        for x in 0..w {
            if opaque(x, y) {
                continue;
            }
            let touches = (y > 0 && opaque(x, y - 1))
                || (y + 1 < h && opaque(x, y + 1))
                || (x > 0 && opaque(x - 1, y))
                || (x + 1 < w && opaque(x + 1, y));
            if touches {
                img.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
                written += 1;
            }
        }
    }
    written
}
