use crate::compositing::{blit_rgba, draw_guide_grid};
use crate::config::{AtlasConfig, OverflowPolicy};
use crate::error::{PixelForgeError, Result};
use crate::model::{ArrangeReport, AtlasStats, Rect, TextureEntry};
use crate::packer::{footprint, grid::placement_from_pointer, shelf::ShelfPacker};
use image::RgbaImage;
use tracing::{debug, instrument, warn};

/// A caller-owned collection of textures laid out on one canvas.
///
/// Positions change only through explicit calls (`set_position`,
/// `place_at_pointer`, `auto_arrange`). The canvas never shrinks on its own.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    cfg: AtlasConfig,
    textures: Vec<TextureEntry>,
    next_id: u64,
}

impl Default for TextureAtlas {
    fn default() -> Self {
        Self::new(AtlasConfig::default())
    }
}

impl TextureAtlas {
    /// Create an empty atlas. Zero dimensions are coerced to 1.
    pub fn new(cfg: AtlasConfig) -> Self {
        Self {
            cfg: cfg.sanitized(),
            textures: Vec::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.cfg
    }

    /// Replace the configuration. The canvas is kept at least as large as the
    /// content already placed, so no texture is silently lost.
    pub fn set_config(&mut self, cfg: AtlasConfig) {
        let mut cfg = cfg.sanitized();
        if let Some((w, h)) = self.content_extent_with(cfg.padding) {
            cfg.width = cfg.width.max(w);
            cfg.height = cfg.height.max(h);
        }
        self.cfg = cfg;
    }

    /// Import a texture at (0, 0); returns its id.
    pub fn add_texture(&mut self, name: impl Into<String>, image: RgbaImage) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.textures.push(TextureEntry {
            id,
            name: name.into(),
            image,
            x: 0,
            y: 0,
        });
        id
    }

    /// Import a texture with a known placement (used when loading projects).
    pub fn add_texture_at(&mut self, name: impl Into<String>, image: RgbaImage, x: u32, y: u32) -> u64 {
        let id = self.add_texture(name, image);
        if let Some(t) = self.textures.last_mut() {
            t.x = x;
            t.y = y;
        }
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<TextureEntry> {
        let idx = self.textures.iter().position(|t| t.id == id)?;
        Some(self.textures.remove(idx))
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }

    pub fn get(&self, id: u64) -> Option<&TextureEntry> {
        self.textures.iter().find(|t| t.id == id)
    }

    /// Textures in insertion (and draw) order.
    pub fn textures(&self) -> &[TextureEntry] {
        &self.textures
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn entry_mut(&mut self, id: u64) -> Result<&mut TextureEntry> {
        self.textures
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(PixelForgeError::UnknownTexture(id))
    }

    /// Numeric position edit. Negative values become 0.
    pub fn set_position(&mut self, id: u64, x: i64, y: i64) -> Result<()> {
        let t = self.entry_mut(id)?;
        t.x = x.clamp(0, u32::MAX as i64) as u32;
        t.y = y.clamp(0, u32::MAX as i64) as u32;
        Ok(())
    }

    /// Drop-placement from a pointer position in canvas space (grid-snapped
    /// when grid mode is on). Returns the new position.
    pub fn place_at_pointer(&mut self, id: u64, px: f64, py: f64) -> Result<(u32, u32)> {
        let (x, y) = placement_from_pointer(px, py, &self.cfg);
        let t = self.entry_mut(id)?;
        t.x = x;
        t.y = y;
        Ok((x, y))
    }

    #[instrument(skip_all)]
    /// Recompute every position from scratch with the shelf packer, in list order.
    ///
    /// What happens to textures that end up below or beside the canvas depends
    /// on `AtlasConfig::overflow`; see [`OverflowPolicy`].
    pub fn auto_arrange(&mut self) -> Result<ArrangeReport> {
        let cfg = self.cfg;
        let mut packer = ShelfPacker::new(cfg.width, cfg.padding);
        let mut placements: Vec<Rect> = Vec::with_capacity(self.textures.len());
        for t in &self.textures {
            let (fw, fh) = footprint(t.width(), t.height(), &cfg);
            placements.push(packer.place(fw, fh));
        }

        let overflowed: Vec<u64> = self
            .textures
            .iter()
            .zip(&placements)
            .filter(|(t, r)| overflows(&Rect::new(r.x, r.y, t.width(), t.height()), &cfg))
            .map(|(t, _)| t.id)
            .collect();

        if !overflowed.is_empty() && cfg.overflow == OverflowPolicy::Reject {
            warn!(count = overflowed.len(), "auto-arrange rejected: content exceeds canvas");
            return Err(PixelForgeError::OutOfSpace { overflowed });
        }

        for (t, r) in self.textures.iter_mut().zip(&placements) {
            t.x = r.x;
            t.y = r.y;
        }

        let mut report = ArrangeReport {
            placed: placements.len(),
            shelves: packer.shelves(),
            overflowed,
            grew: false,
        };
        if !report.overflowed.is_empty() {
            match cfg.overflow {
                OverflowPolicy::Grow => {
                    report.grew = self.fit_canvas_to_content();
                }
                _ => {
                    warn!(
                        count = report.overflowed.len(),
                        "auto-arrange placed textures outside the canvas"
                    );
                }
            }
        }
        debug!(
            placed = report.placed,
            shelves = report.shelves,
            bottom = packer.bottom(),
            "auto-arrange finished"
        );
        Ok(report)
    }

    /// `(max(x + w) + padding, max(y + h) + padding)` over all textures.
    fn content_extent_with(&self, padding: u32) -> Option<(u32, u32)> {
        let mut max_w = None::<u64>;
        let mut max_h = 0u64;
        for t in &self.textures {
            let r = t.rect();
            max_w = Some(max_w.unwrap_or(0).max(r.right()));
            max_h = max_h.max(r.bottom());
        }
        let w = max_w? + padding as u64;
        let h = max_h + padding as u64;
        Some((
            w.min(u32::MAX as u64) as u32,
            h.min(u32::MAX as u64) as u32,
        ))
    }

    /// Grow the canvas so every texture's composited pixels fit. Never shrinks.
    /// Returns true if the canvas changed.
    pub fn fit_canvas_to_content(&mut self) -> bool {
        let Some((w, h)) = self.content_extent_with(self.cfg.padding) else {
            return false;
        };
        let (nw, nh) = (self.cfg.width.max(w), self.cfg.height.max(h));
        let grew = nw != self.cfg.width || nh != self.cfg.height;
        if grew {
            debug!(from = ?(self.cfg.width, self.cfg.height), to = ?(nw, nh), "canvas grown");
        }
        self.cfg.width = nw;
        self.cfg.height = nh;
        grew
    }

    #[instrument(skip_all)]
    /// Render the export raster: transparent canvas, every texture drawn 1:1 at
    /// `(x + padding, y + padding)` in list order (later entries on top).
    pub fn compose(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.cfg.width, self.cfg.height);
        self.draw_textures(&mut canvas);
        canvas
    }

    /// Like [`compose`](Self::compose) with the guide grid underneath, when
    /// grid mode is on. For display only; never export this raster.
    pub fn compose_preview(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.cfg.width, self.cfg.height);
        if self.cfg.use_grid {
            let (cw, ch) = self.cfg.cell_size();
            draw_guide_grid(&mut canvas, self.cfg.padding, cw, ch);
        }
        self.draw_textures(&mut canvas);
        canvas
    }

    fn draw_textures(&self, canvas: &mut RgbaImage) {
        for t in &self.textures {
            let (x, y) = t.drawn_origin(self.cfg.padding);
            blit_rgba(&t.image, canvas, x, y);
        }
    }

    /// Ids of textures whose composited pixels leave the canvas.
    pub fn overflowing(&self) -> Vec<u64> {
        self.textures
            .iter()
            .filter(|t| overflows(&t.rect(), &self.cfg))
            .map(|t| t.id)
            .collect()
    }

    pub fn stats(&self) -> AtlasStats {
        let canvas_area = (self.cfg.width as u64) * (self.cfg.height as u64);
        let used_area: u64 = self.textures.iter().map(|t| t.rect().area()).sum();
        AtlasStats {
            num_textures: self.textures.len(),
            canvas_width: self.cfg.width,
            canvas_height: self.cfg.height,
            canvas_area,
            used_area,
            occupancy: if canvas_area > 0 {
                used_area as f64 / canvas_area as f64
            } else {
                0.0
            },
            num_overflowing: self.overflowing().len(),
        }
    }
}

/// True when a rectangle drawn at `(x + padding, y + padding)` crosses the canvas edge.
fn overflows(r: &Rect, cfg: &AtlasConfig) -> bool {
    let pad = cfg.padding as u64;
    r.right() + pad > cfg.width as u64 || r.bottom() + pad > cfg.height as u64
}
