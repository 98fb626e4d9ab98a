//! Canvas coordinates and bounding boxes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the editing grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Location {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Location {
    /// Creates a location.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle. Width and height are never negative.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Horizontal extent.
    pub width: i32,
    /// Vertical extent.
    pub height: i32,
}

impl Bounds {
    /// Creates a rectangle anchored at `origin`.
    pub fn new(origin: Location, width: i32, height: i32) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(self, other: Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Bounds {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    /// Returns `true` if `loc` lies inside or on the edge of the rectangle.
    pub fn contains(&self, loc: Location) -> bool {
        loc.x >= self.x
            && loc.y >= self.y
            && loc.x <= self.x + self.width
            && loc.y <= self.y + self.height
    }
}
