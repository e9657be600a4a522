use crate::color::{HueBand, hsl_to_rgb, luma, rgb_to_hsl, to_channel};
use crate::config::GradingConfig;
use image::RgbaImage;
use rand::Rng;

/// Contrast multiplier for a delta in roughly -255..255.
#[inline]
pub fn contrast_factor(contrast: f32) -> f32 {
    259.0 * (contrast + 255.0) / (255.0 * (259.0 - contrast))
}

/// Apply brightness, contrast, saturation, per-band HSL adjustments and
/// luminance noise to every pixel in place. Alpha is never touched.
///
/// Channels stay unclamped floats between steps; they are clamped before the
/// HSL round trip (HSL is only defined on 0..255) and once more at the end.
pub fn grade<R: Rng + ?Sized>(img: &mut RgbaImage, cfg: &GradingConfig, rng: &mut R) {
    let factor = contrast_factor(cfg.contrast);
    let sat_scale = 1.0 + cfg.saturation / 100.0;
    let use_bands = !cfg.channels.is_neutral();
    let noise_half = cfg.noise * 255.0 / 2.0;

    for px in img.pixels_mut() {
        let mut c = [px[0] as f32, px[1] as f32, px[2] as f32];

        for v in c.iter_mut() {
            *v += cfg.brightness;
            *v = factor * (*v - 128.0) + 128.0;
        }

        if cfg.saturation != 0.0 {
            let y = luma(c[0], c[1], c[2]);
            for v in c.iter_mut() {
                *v = y + (*v - y) * sat_scale;
            }
        }

        if use_bands {
            c = adjust_band(c, cfg);
        }

        if noise_half > 0.0 {
            let n: f32 = rng.gen_range(-noise_half..=noise_half);
            for v in c.iter_mut() {
                *v += n;
            }
        }

        px[0] = to_channel(c[0]);
        px[1] = to_channel(c[1]);
        px[2] = to_channel(c[2]);
    }
}

fn adjust_band(c: [f32; 3], cfg: &GradingConfig) -> [f32; 3] {
    let [r, g, b] = c.map(|v| v.clamp(0.0, 255.0));
    let (h, s, l) = rgb_to_hsl(r, g, b);
    let adj = cfg.channels.get(HueBand::from_hue(h));
    if adj.is_neutral() {
        return [r, g, b];
    }
    let s = (s * (1.0 + adj.saturation / 100.0)).clamp(0.0, 1.0);
    let l = (l * (1.0 + adj.lightness / 100.0)).clamp(0.0, 1.0);
    let (r, g, b) = hsl_to_rgb(h, s, l);
    [r, g, b]
}
