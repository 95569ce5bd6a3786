use serde::{Deserialize, Serialize};

/// Rectangle in pixel space (always u32 coordinates)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Squared distance from the rectangle's center to `(cx, cy)`.
    pub fn center_distance_sq(&self, cx: f64, cy: f64) -> f64 {
        let x = self.x as f64 + self.width as f64 / 2.0;
        let y = self.y as f64 + self.height as f64 / 2.0;
        (x - cx).powi(2) + (y - cy).powi(2)
    }

    /// Iterate `(x, y)` canvas coordinates covered by the rectangle, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> {
        let rect = *self;
        (rect.y..rect.y + rect.height)
            .flat_map(move |y| (rect.x..rect.x + rect.width).map(move |x| (x, y)))
    }
}
