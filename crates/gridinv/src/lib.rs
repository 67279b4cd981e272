//! `gridinv`: grid inventory placement shared by the isola services.
//!
//! Items occupy axis-aligned cell rectangles inside a `cols x rows`
//! container. Placement is a row-major first-fit scan: outer `y`, inner
//! `x`, first free cell wins. The scan order is part of the contract:
//! callers (and players) rely on where granted items land.

use serde::{Deserialize, Serialize};

/// A placed footprint: top-left cell plus extent, in cells.
///
/// `w` and `h` are at least 1 for any real item; a zero-extent rect
/// overlaps nothing and fits anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

    /// Open-interval intersection: rects sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// True iff the rect lies fully inside a `cols x rows` container.
    pub fn fits(&self, cols: u32, rows: u32) -> bool {
        self.w <= cols && self.h <= rows && self.x <= cols - self.w && self.y <= rows - self.h
    }
}

/// True iff the candidate rect intersects any occupied rect.
pub fn has_overlap(occupied: &[Rect], candidate: Rect) -> bool {
    occupied.iter().any(|r| r.overlaps(&candidate))
}

/// Row-major first-fit: the first `(x, y)` where a `w x h` footprint fits
/// with no overlap, scanning `y` outer and `x` inner. `None` if nothing fits.
pub fn find_placement(occupied: &[Rect], w: u32, h: u32, cols: u32, rows: u32) -> Option<(u32, u32)> {
    if w == 0 || h == 0 || w > cols || h > rows {
        return None;
    }
    for y in 0..=(rows - h) {
        for x in 0..=(cols - w) {
            if !has_overlap(occupied, Rect::new(x, y, w, h)) {
                return Some((x, y));
            }
        }
    }
    None
}
