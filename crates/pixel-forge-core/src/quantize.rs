use crate::color::distance_sq;
use crate::config::DitherConfig;
use crate::palette::{ALPHA_THRESHOLD, Palette};
use image::{Rgb, RgbaImage};

/// Index of the palette entry closest to `c` (squared RGB distance).
/// Ties resolve to the earliest entry.
pub fn nearest_index(palette: &Palette, c: [f32; 3]) -> usize {
    let mut best = 0usize;
    let mut best_d = f32::INFINITY;
    for (i, p) in palette.colors.iter().enumerate() {
        let d = distance_sq(c, *p);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Snap every pixel with alpha >= 128 to its nearest palette colour and make it opaque.
///
/// With dithering on, the scaled quantization error is diffused Floyd-Steinberg
/// style in one row-major pass without wrap-around:
///
/// ```text
///        X   7
///    3   5   1      (/16)
/// ```
///
/// Error only flows into pixels whose alpha is above 128. Diffused values stay
/// unclamped in a working buffer until their own pixel is visited.
/// Pixels below the alpha threshold are left as they are.
pub fn quantize(img: &mut RgbaImage, palette: &Palette, dither: &DitherConfig) {
    if palette.is_empty() {
        return;
    }
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);

    if !dither.enabled {
        for px in img.pixels_mut() {
            if px[3] < ALPHA_THRESHOLD {
                continue;
            }
            let c = [px[0] as f32, px[1] as f32, px[2] as f32];
            let Rgb(p) = palette.colors[nearest_index(palette, c)];
            *px = image::Rgba([p[0], p[1], p[2], 255]);
        }
        return;
    }

    let strength = dither.strength;
    let alpha: Vec<u8> = img.pixels().map(|p| p[3]).collect();
    let mut work: Vec<[f32; 3]> = img
        .pixels()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if alpha[i] < ALPHA_THRESHOLD {
                continue;
            }
            let cur = work[i].map(|v| v.clamp(0.0, 255.0));
            let Rgb(p) = palette.colors[nearest_index(palette, cur)];
            img.put_pixel(x as u32, y as u32, image::Rgba([p[0], p[1], p[2], 255]));

            let err = [
                (cur[0] - p[0] as f32) * strength,
                (cur[1] - p[1] as f32) * strength,
                (cur[2] - p[2] as f32) * strength,
            ];
            let mut spread = |nx: usize, ny: usize, weight: f32| {
                let j = ny * w + nx;
                if alpha[j] > ALPHA_THRESHOLD {
                    for (c, e) in work[j].iter_mut().zip(err) {
                        *c += e * weight;
                    }
                }
            };
            if x + 1 < w {
                spread(x + 1, y, 7.0 / 16.0);
            }
            if y + 1 < h {
                if x > 0 {
                    spread(x - 1, y + 1, 3.0 / 16.0);
                }
                spread(x, y + 1, 5.0 / 16.0);
                if x + 1 < w {
                    spread(x + 1, y + 1, 1.0 / 16.0);
                }
            }
        }
    }
}
