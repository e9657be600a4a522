use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hand-painted pixel overrides, keyed by `(x, y)` in output space.
///
/// Kept apart from the generated raster so the pipeline can be re-run without
/// knowing which pixels were painted. Entries iterate in `(x, y)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PixelEdit>", into = "Vec<PixelEdit>")]
pub struct ManualEdits {
    edits: BTreeMap<(u32, u32), Rgba<u8>>,
}

/// Serialized form of a single override.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PixelEdit {
    pub x: u32,
    pub y: u32,
    pub rgba: [u8; 4],
}

impl From<Vec<PixelEdit>> for ManualEdits {
    fn from(list: Vec<PixelEdit>) -> Self {
        let mut m = ManualEdits::new();
        for e in list {
            m.paint(e.x, e.y, Rgba(e.rgba));
        }
        m
    }
}

impl From<ManualEdits> for Vec<PixelEdit> {
    fn from(m: ManualEdits) -> Self {
        m.edits
            .into_iter()
            .map(|((x, y), c)| PixelEdit { x, y, rgba: c.0 })
            .collect()
    }
}

impl ManualEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the override at `(x, y)`.
    pub fn paint(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        self.edits.insert((x, y), color);
    }

    /// Drop the override at `(x, y)`; returns whether one existed.
    pub fn erase(&mut self, x: u32, y: u32) -> bool {
        self.edits.remove(&(x, y)).is_some()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.edits.get(&(x, y)).copied()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), Rgba<u8>)> + '_ {
        self.edits.iter().map(|(k, v)| (*k, *v))
    }

    /// Overwrite the full RGBA of every in-bounds edited pixel.
    /// Out-of-bounds entries are kept but ignored. Returns the number applied.
    pub fn apply(&self, img: &mut RgbaImage) -> usize {
        let (w, h) = img.dimensions();
        let mut applied = 0;
        for (&(x, y), &c) in &self.edits {
            if x < w && y < h {
                img.put_pixel(x, y, c);
                applied += 1;
            }
        }
        applied
    }
}
