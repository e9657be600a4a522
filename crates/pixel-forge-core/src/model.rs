use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Owned RGBA8 raster. Every stage consumes or produces one of these.
pub type PixelBuffer = RgbaImage;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    /// True if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }
}

/// A texture imported into an atlas.
#[derive(Debug, Clone)]
pub struct TextureEntry {
    /// Session-unique identifier, never reused within one `TextureAtlas`.
    pub id: u64,
    /// Display name (usually the source file name).
    pub name: String,
    /// Decoded pixels; the intrinsic size is the image size.
    pub image: PixelBuffer,
    /// Top-left placement in atlas space (before the padding offset).
    pub x: u32,
    pub y: u32,
}

impl TextureEntry {
    pub fn width(&self) -> u32 {
        self.image.width()
    }
    pub fn height(&self) -> u32 {
        self.image.height()
    }
    /// Placement rectangle at the intrinsic size.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width(), self.height())
    }
    /// Where the pixels land on the composed canvas, `(x + padding, y + padding)`.
    pub fn drawn_origin(&self, padding: u32) -> (u32, u32) {
        (self.x.saturating_add(padding), self.y.saturating_add(padding))
    }
}

/// Result of an auto-arrange run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangeReport {
    /// Number of textures that received a new position.
    pub placed: usize,
    /// Number of shelves (rows) used.
    pub shelves: usize,
    /// Ids whose composited pixels leave the canvas.
    pub overflowed: Vec<u64>,
    /// True if the canvas was enlarged to fit.
    pub grew: bool,
}

/// Statistics about atlas usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasStats {
    pub num_textures: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub canvas_area: u64,
    /// Sum of intrinsic texture areas.
    pub used_area: u64,
    /// used_area / canvas_area (0.0 to 1.0 unless textures overlap).
    pub occupancy: f64,
    /// Textures whose pixels leave the canvas.
    pub num_overflowing: usize,
}

impl AtlasStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Textures: {}, Canvas: {}x{}, Occupancy: {:.2}%, Used Area: {} px², Overflowing: {}",
            self.num_textures,
            self.canvas_width,
            self.canvas_height,
            self.occupancy * 100.0,
            self.used_area,
            self.num_overflowing,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.canvas_area.saturating_sub(self.used_area)
    }
}
