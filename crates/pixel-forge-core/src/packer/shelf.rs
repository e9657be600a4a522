use crate::model::Rect;

/// Single-pass shelf (row) packer.
///
/// Items go left to right; when the next footprint would cross the canvas
/// width the cursor wraps to a new shelf `padding` below the tallest item
/// placed so far. There is no backtracking and no height limit: callers
/// decide what to do with placements below the canvas.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    canvas_width: u32,
    padding: u32,
    current_x: u32,
    current_y: u32,
    shelf_bottom: u32,
    shelves: usize,
}

impl ShelfPacker {
    pub fn new(canvas_width: u32, padding: u32) -> Self {
        Self {
            canvas_width,
            padding,
            current_x: 0,
            current_y: 0,
            shelf_bottom: 0,
            shelves: 0,
        }
    }

    /// Place a `w x h` footprint and return its rectangle.
    pub fn place(&mut self, w: u32, h: u32) -> Rect {
        if self.shelves == 0 {
            self.shelves = 1;
        }
        if self.current_x as u64 + w as u64 > self.canvas_width as u64 {
            self.current_x = 0;
            self.current_y = self.shelf_bottom.saturating_add(self.padding);
            self.shelves += 1;
        }
        let rect = Rect::new(self.current_x, self.current_y, w, h);
        self.current_x = self
            .current_x
            .saturating_add(w)
            .saturating_add(self.padding);
        self.shelf_bottom = self.shelf_bottom.max(self.current_y.saturating_add(h));
        rect
    }

    /// Number of shelves opened so far.
    pub fn shelves(&self) -> usize {
        self.shelves
    }

    /// Lowest edge reached by any placed footprint.
    pub fn bottom(&self) -> u32 {
        self.shelf_bottom
    }
}
