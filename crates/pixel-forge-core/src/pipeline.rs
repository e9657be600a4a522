use crate::config::{ColorMode, PipelineConfig, ScaleMode};
use crate::error::{PixelForgeError, Result};
use crate::grading::grade;
use crate::overlay::ManualEdits;
use crate::palette::{Palette, generate_auto, preset};
use crate::postprocess::{cleanup, outline, roughen};
use crate::quantize::quantize;
use image::RgbaImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PixelOutput {
    pub image: RgbaImage,
    /// Palette the image was quantized against (`None` for `ColorMode::Keep`).
    pub palette: Option<Palette>,
    pub stats: PipelineStats,
}

/// Counters collected while running the passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub width: u32,
    pub height: u32,
    /// Pixels changed by orphan cleanup (all passes).
    pub cleaned: usize,
    /// Manual edits that landed inside the output.
    pub edits_applied: usize,
    /// Pixels written by the outline pass.
    pub outlined: usize,
}

/// Output size for a `w0 x h0` source under `scale`.
///
/// Downscale keeps `target_width` and derives `round(target_width * h0 / w0)`
/// (at least 1); upscale multiplies both sides.
pub fn output_size(w0: u32, h0: u32, scale: ScaleMode) -> (u32, u32) {
    match scale {
        ScaleMode::Downscale { target_width } => {
            let tw = target_width.max(1);
            let h = (tw as f64 * h0 as f64 / w0.max(1) as f64).round();
            (tw, (h as u32).max(1))
        }
        ScaleMode::Upscale { factor } => (
            w0.saturating_mul(factor.max(1)),
            h0.saturating_mul(factor.max(1)),
        ),
    }
}

/// Nearest-neighbour resample (pixel-centre sampling, no smoothing).
pub fn resize_nearest(src: &RgbaImage, w: u32, h: u32) -> RgbaImage {
    let (w0, h0) = src.dimensions();
    let mut out = RgbaImage::new(w, h);
    if w0 == 0 || h0 == 0 {
        return out;
    }
    let sx: Vec<u32> = (0..w)
        .map(|x| ((((x as f64 + 0.5) * w0 as f64) / w as f64) as u32).min(w0 - 1))
        .collect();
    for y in 0..h {
        let syy = ((((y as f64 + 0.5) * h0 as f64) / h as f64) as u32).min(h0 - 1);
        for (x, &sxx) in sx.iter().enumerate() {
            out.put_pixel(x as u32, y, *src.get_pixel(sxx, syy));
        }
    }
    out
}

/// Resolve the palette for `mode` against the graded image.
pub fn select_palette(img: &RgbaImage, mode: &ColorMode) -> Result<Option<Palette>> {
    Ok(match mode {
        ColorMode::Auto { max_colors } => Some(generate_auto(img, *max_colors)),
        ColorMode::Preset { name } => Some(preset(name)?),
        ColorMode::Custom { palette } => Some(palette.clone()),
        ColorMode::Keep => None,
    })
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

#[instrument(skip_all)]
/// Turn `source` into pixel art according to `cfg`, then lay `edits` on top.
///
/// Order: resize → grade → palette → quantize/dither → cleanup → roughness →
/// manual edits → outline. The config is sanitized first, so out-of-range
/// sliders are clamped rather than rejected.
pub fn pixelate(source: &RgbaImage, cfg: &PipelineConfig, edits: &ManualEdits) -> Result<PixelOutput> {
    run_stages(source, cfg, edits, None)
}

/// Like [`pixelate`] but checks `cancel` between passes and returns
/// `PixelForgeError::Cancelled` once it is set.
pub fn pixelate_cancellable(
    source: &RgbaImage,
    cfg: &PipelineConfig,
    edits: &ManualEdits,
    cancel: &AtomicBool,
) -> Result<PixelOutput> {
    run_stages(source, cfg, edits, Some(cancel))
}

fn run_stages(
    source: &RgbaImage,
    cfg: &PipelineConfig,
    edits: &ManualEdits,
    cancel: Option<&AtomicBool>,
) -> Result<PixelOutput> {
    let checkpoint = || -> Result<()> {
        match cancel {
            Some(flag) if flag.load(Ordering::Acquire) => Err(PixelForgeError::Cancelled),
            _ => Ok(()),
        }
    };

    let cfg = cfg.sanitized();
    cfg.validate()?;
    let (w0, h0) = source.dimensions();
    if w0 == 0 || h0 == 0 {
        return Err(PixelForgeError::InvalidDimensions {
            width: w0,
            height: h0,
        });
    }

    let (w, h) = output_size(w0, h0, cfg.scale);
    let mut img = resize_nearest(source, w, h);
    let mut rng = rng_for(cfg.seed);
    let mut stats = PipelineStats {
        width: w,
        height: h,
        ..Default::default()
    };
    checkpoint()?;

    if !cfg.grading.is_neutral() {
        grade(&mut img, &cfg.grading, &mut rng);
        checkpoint()?;
    }

    let palette = select_palette(&img, &cfg.color)?;
    if let Some(p) = &palette {
        debug!(colors = p.len(), name = %p.name, "palette selected");
        quantize(&mut img, p, &cfg.dither);
        checkpoint()?;
    }

    if cfg.cleanup.enabled {
        stats.cleaned = cleanup(&mut img, cfg.cleanup.passes);
    }
    if cfg.roughness > 0.0 {
        roughen(&mut img, cfg.roughness, &mut rng);
    }
    checkpoint()?;

    stats.edits_applied = edits.apply(&mut img);
    if cfg.outline.enabled {
        stats.outlined = outline(&mut img, cfg.outline.color);
        // painted pixels win even over the outline (e.g. erased to transparent)
        edits.apply(&mut img);
    }
    debug!(?stats, "pipeline finished");

    Ok(PixelOutput {
        image: img,
        palette,
        stats,
    })
}

/// Run the pipeline over many independent sources with one shared config.
/// With the `parallel` feature the jobs run on the rayon pool; each job is
/// still single-threaded. Output order matches input order.
pub fn pixelate_many(sources: &[RgbaImage], cfg: &PipelineConfig) -> Vec<Result<PixelOutput>> {
    let edits = ManualEdits::new();
    #[cfg(feature = "parallel")]
    {
        sources
            .par_iter()
            .map(|s| pixelate(s, cfg, &edits))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        sources.iter().map(|s| pixelate(s, cfg, &edits)).collect()
    }
}
