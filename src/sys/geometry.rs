//! Integer geometry shared by the display server and the regions it hosts.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self { Point { x, y } }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub const fn new(w: i32, h: i32) -> Self { Size { w, h } }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Size { Size::new(self.w.max(other.w), self.h.max(other.h)) }

    /// Component-wise minimum.
    pub fn min(self, other: Size) -> Size { Size::new(self.w.min(other.w), self.h.min(other.h)) }
}

/// A rectangle in the coordinate space of some parent window.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self { Rect { x, y, w, h } }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Rect::new(origin.x, origin.y, size.w, size.h)
    }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn size(&self) -> Size { Size::new(self.w, self.h) }

    pub fn max_x(&self) -> i32 { self.x + self.w }

    pub fn max_y(&self) -> i32 { self.y + self.h }

    pub fn center(&self) -> Point { Point::new(self.x + self.w / 2, self.y + self.h / 2) }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Offset of this rectangle's origin from `other`'s origin.
    pub fn offset_from(&self, other: &Rect) -> (i32, i32) { (self.x - other.x, self.y - other.y) }

    pub fn with_size(&self, size: Size) -> Rect { Rect::from_parts(self.origin(), size) }

    /// Clamps both dimensions to at least one pixel.
    pub fn at_least_one(&self) -> Rect { Rect::new(self.x, self.y, self.w.max(1), self.h.max(1)) }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let min_x = self.x.max(other.x);
        let max_x = self.max_x().min(other.max_x());
        let min_y = self.y.max(other.y);
        let max_y = self.max_y().min(other.max_y());
        Rect::new(min_x, min_y, (max_x - min_x).max(0), (max_y - min_y).max(0))
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.x..self.max_x()).contains(&point.x) && (self.y..self.max_y()).contains(&point.y)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }

    pub fn area(&self) -> i64 { i64::from(self.w.max(0)) * i64::from(self.h.max(0)) }

    /// Moves (and if needed shrinks) `self` so that it lies inside `bounds`.
    pub fn constrained_to(&self, bounds: &Rect) -> Rect {
        let w = self.w.min(bounds.w);
        let h = self.h.min(bounds.h);
        let x = self.x.clamp(bounds.x, bounds.max_x() - w);
        let y = self.y.clamp(bounds.y, bounds.max_y() - h);
        Rect::new(x, y, w, h)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.w, self.h, self.x, self.y)
    }
}
