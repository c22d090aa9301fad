use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::layout_engine::{Direction, Tightness};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self { Point { x, y } }
}

/// Axis-aligned rectangle in root window coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

fn clamp_i16(v: i32) -> i16 { v.clamp(i16::MIN as i32, i16::MAX as i32) as i16 }

fn clamp_u16(v: i32) -> u16 { v.clamp(0, u16::MAX as i32) as u16 }

impl Rect {
    pub const fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Rect { x, y, width, height }
    }

    /// Builds a rectangle from wide intermediate values, clamping sizes to one pixel.
    pub fn from_i32(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            x: clamp_i16(x),
            y: clamp_i16(y),
            width: clamp_u16(width.max(1)),
            height: clamp_u16(height.max(1)),
        }
    }

    pub fn area(&self) -> u32 { self.width as u32 * self.height as u32 }

    pub fn is_empty(&self) -> bool { self.width == 0 || self.height == 0 }

    /// Last column covered by the rectangle.
    pub fn max_x(&self) -> i32 { self.x as i32 + self.width as i32 - 1 }

    /// Last row covered by the rectangle.
    pub fn max_y(&self) -> i32 { self.y as i32 + self.height as i32 - 1 }

    pub fn right(&self) -> i32 { self.x as i32 + self.width as i32 }

    pub fn bottom(&self) -> i32 { self.y as i32 + self.height as i32 }

    pub fn center(&self) -> Point {
        Point::new(
            clamp_i16(self.x as i32 + self.width as i32 / 2),
            clamp_i16(self.y as i32 + self.height as i32 / 2),
        )
    }

    pub fn is_inside(&self, p: Point) -> bool {
        let (px, py) = (p.x as i32, p.y as i32);
        px >= self.x as i32 && px < self.right() && py >= self.y as i32 && py < self.bottom()
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.right() >= other.right()
            && self.y <= other.y
            && self.bottom() >= other.bottom()
    }

    /// Shrinks the rectangle by the given amount on each side.
    pub fn inset(&self, top: i32, right: i32, bottom: i32, left: i32) -> Rect {
        Rect::from_i32(
            self.x as i32 + left,
            self.y as i32 + top,
            self.width as i32 - left - right,
            self.height as i32 - top - bottom,
        )
    }

    /// Distance between the `dir` edge of `self` and the opposite edge of `other`.
    pub fn boundary_distance(&self, other: &Rect, dir: Direction) -> u32 {
        let (r1, r2) = (self, other);
        let d = match dir {
            Direction::North => r2.max_y() - r1.y as i32,
            Direction::West => r2.max_x() - r1.x as i32,
            Direction::South => r1.max_y() - r2.y as i32,
            Direction::East => r1.max_x() - r2.x as i32,
        };
        d.unsigned_abs()
    }

    /// Is `other` on the `dir` side of `self`?
    pub fn on_dir_side(&self, other: &Rect, dir: Direction, tightness: Tightness) -> bool {
        let (r1, r2) = (self, other);

        // Rule out rectangles on the opposite side.
        let excluded = match (tightness, dir) {
            (Tightness::Low, Direction::North) => r2.y as i32 > r1.max_y(),
            (Tightness::Low, Direction::West) => r2.x as i32 > r1.max_x(),
            (Tightness::Low, Direction::South) => r2.max_y() < r1.y as i32,
            (Tightness::Low, Direction::East) => r2.max_x() < r1.x as i32,
            (Tightness::High, Direction::North) => r2.y >= r1.y,
            (Tightness::High, Direction::West) => r2.x >= r1.x,
            (Tightness::High, Direction::South) => r2.max_y() <= r1.max_y(),
            (Tightness::High, Direction::East) => r2.max_x() <= r1.max_x(),
        };
        if excluded {
            return false;
        }

        // The two rectangles must share a vertical or horizontal range.
        let shared = |a1: i32, a_max: i32, b1: i32, b_max: i32| {
            (b1 >= a1 && b1 <= a_max) || (b_max >= a1 && b_max <= a_max) || (a1 > b1 && a1 < b_max)
        };
        match dir {
            Direction::North | Direction::South => {
                shared(r1.x as i32, r1.max_x(), r2.x as i32, r2.max_x())
            }
            Direction::West | Direction::East => {
                shared(r1.y as i32, r1.max_y(), r2.y as i32, r2.max_y())
            }
        }
    }

    /// Reading order: top to bottom, then left to right, larger area first on overlap.
    pub fn position_cmp(&self, other: &Rect) -> Ordering {
        let (r1, r2) = (self, other);
        if r1.y as i32 >= r2.bottom() {
            Ordering::Greater
        } else if r2.y as i32 >= r1.bottom() {
            Ordering::Less
        } else if r1.x as i32 >= r2.right() {
            Ordering::Greater
        } else if r2.x as i32 >= r1.right() {
            Ordering::Less
        } else {
            r2.area().cmp(&r1.area())
        }
    }
}

/// Space reserved along each edge of a monitor or desktop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Padding {
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub right: i32,
    #[serde(default)]
    pub bottom: i32,
    #[serde(default)]
    pub left: i32,
}

impl Padding {
    pub const fn uniform(v: i32) -> Self {
        Padding { top: v, right: v, bottom: v, left: v }
    }

    pub fn apply(&self, r: &Rect) -> Rect { r.inset(self.top, self.right, self.bottom, self.left) }
}

impl std::ops::Add for Padding {
    type Output = Padding;

    fn add(self, o: Padding) -> Padding {
        Padding {
            top: self.top + o.top,
            right: self.right + o.right,
            bottom: self.bottom + o.bottom,
            left: self.left + o.left,
        }
    }
}
