use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Integer corner coordinates `[x0, y0, x1, y1, x2, y2, x3, y3]`,
/// corners ordered top-left, top-right, bottom-right, bottom-left.
pub type NormalizedBox = [i32; 8];

/// A text region as reported by OCR: four corners, not necessarily axis-aligned.
/// Corner order is top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn new(corners: [Point; 4]) -> Self {
        Self(corners)
    }

    /// Axis-aligned rectangle in pixel units.
    pub fn from_rect(left: f32, top: f32, width: f32, height: f32) -> Self {
        let right = left + width;
        let bottom = top + height;
        Self([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    /// Truncates each coordinate toward zero.
    #[rustfmt::skip]
    pub fn normalized(&self) -> NormalizedBox {
        let [tl, tr, br, bl] = self.0;
        [
            tl.x as i32, tl.y as i32,
            tr.x as i32, tr.y as i32,
            br.x as i32, br.y as i32,
            bl.x as i32, bl.y as i32,
        ]
    }

    pub fn min_x(&self) -> f32 {
        self.0.iter().map(|p| p.x).fold(f32::INFINITY, f32::min)
    }

    pub fn max_x(&self) -> f32 {
        self.0.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min_y(&self) -> f32 {
        self.0.iter().map(|p| p.y).fold(f32::INFINITY, f32::min)
    }

    pub fn max_y(&self) -> f32 {
        self.0.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn height(&self) -> f32 {
        (self.max_y() - self.min_y()).max(0.0)
    }

    pub fn center_y(&self) -> f32 {
        (self.min_y() + self.max_y()) * 0.5
    }
}
