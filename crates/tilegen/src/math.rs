//! Integer-only vector and rectangle math used for all bounds reasoning.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct IntegerVector {
    pub x: i32,
    pub y: i32,
}

impl IntegerVector {
    pub const ZERO: IntegerVector = IntegerVector { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn min(self, other: Self) -> Self {
        Self { x: self.x.min(other.x), y: self.y.min(other.y) }
    }

    pub fn max(self, other: Self) -> Self {
        Self { x: self.x.max(other.x), y: self.y.max(other.y) }
    }

    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self { x: self.x.max(min.x).min(max.x), y: self.y.max(min.y).min(max.y) }
    }
}

impl Add for IntegerVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl Sub for IntegerVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Mul<i32> for IntegerVector {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

impl Div<i32> for IntegerVector {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self { x: self.x / rhs, y: self.y / rhs }
    }
}

impl From<Coordinate> for IntegerVector {
    fn from(coord: Coordinate) -> Self {
        Self { x: coord.x, y: coord.y }
    }
}

impl From<IntegerVector> for Coordinate {
    fn from(v: IntegerVector) -> Self {
        Coordinate { x: v.x, y: v.y }
    }
}

/// Axis-aligned integer rectangle.
///
/// Probing and iteration are half-open (`[min, max)`); point containment is
/// closed (`[min, max]`). Both sizes are always non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegerRect {
    min: IntegerVector,
    size: IntegerVector,
}

impl IntegerRect {
    pub fn from_min_and_size(min: IntegerVector, size: IntegerVector) -> Self {
        Self { min, size: size.max(IntegerVector::ZERO) }
    }

    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::from_min_and_size(IntegerVector::new(x, y), IntegerVector::new(width, height))
    }

    pub fn from_center_and_size(center: IntegerVector, size: IntegerVector) -> Self {
        let size = size.max(IntegerVector::ZERO);
        Self { min: center - size / 2, size }
    }

    pub fn from_min_and_max(min: IntegerVector, max: IntegerVector) -> Self {
        Self::from_min_and_size(min, max - min)
    }

    pub fn min(&self) -> IntegerVector {
        self.min
    }

    pub fn max(&self) -> IntegerVector {
        self.min + self.size
    }

    pub fn size(&self) -> IntegerVector {
        self.size
    }

    pub fn extents(&self) -> IntegerVector {
        self.size / 2
    }

    pub fn center(&self) -> IntegerVector {
        self.min + self.extents()
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    pub fn area(&self) -> i64 {
        i64::from(self.size.x) * i64::from(self.size.y)
    }

    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0
    }

    pub fn overlaps(&self, other: &IntegerRect) -> bool {
        let (self_min, self_max) = (self.min(), self.max());
        let (other_min, other_max) = (other.min(), other.max());
        other_min.x < self_max.x
            && self_min.x < other_max.x
            && other_min.y < self_max.y
            && self_min.y < other_max.y
    }

    pub fn contains(&self, point: IntegerVector) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Half-open containment, matching iteration ranges.
    pub fn probes(&self, point: IntegerVector) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x < max.x && point.y >= min.y && point.y < max.y
    }

    /// Nearest point on or inside the closed rectangle. Ties between edges
    /// resolve bottom, top, left, right.
    pub fn closest_contained_point(&self, point: IntegerVector) -> IntegerVector {
        if self.contains(point) {
            return point;
        }
        let (min, max) = (self.min(), self.max());
        let clamped = point.clamp(min, max);
        let left = (min.x - clamped.x).abs();
        let right = (clamped.x - max.x).abs();
        let bottom = (min.y - clamped.y).abs();
        let top = (clamped.y - max.y).abs();
        let nearest = left.min(right).min(bottom).min(top);
        if nearest == bottom {
            IntegerVector::new(clamped.x, min.y)
        } else if nearest == top {
            IntegerVector::new(clamped.x, max.y)
        } else if nearest == left {
            IntegerVector::new(min.x, clamped.y)
        } else {
            IntegerVector::new(max.x, clamped.y)
        }
    }

    /// Overlapping region, empty (zero size at the clamped min) when disjoint.
    pub fn intersection(&self, other: &IntegerRect) -> IntegerRect {
        let min = self.min().max(other.min());
        let max = self.max().min(other.max()).max(min);
        Self::from_min_and_max(min, max)
    }

    /// Shrinks every side by `amount`, collapsing to the center when too small.
    pub fn inset(&self, amount: i32) -> IntegerRect {
        let size = self.size - IntegerVector::new(amount * 2, amount * 2);
        if size.x <= 0 || size.y <= 0 {
            return Self::from_center_and_size(self.center(), size.max(IntegerVector::ZERO));
        }
        Self::from_min_and_size(self.min + IntegerVector::new(amount, amount), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_sizes_keep_every_column() {
        let rect = IntegerRect::new(3, 4, 5, 7);
        assert_eq!(rect.max(), IntegerVector::new(8, 11));
        assert_eq!(rect.center(), IntegerVector::new(5, 7));
        let from_center = IntegerRect::from_center_and_size(rect.center(), rect.size());
        assert_eq!(from_center, rect);
    }

    #[test]
    fn overlap_is_half_open_but_containment_is_closed() {
        let left = IntegerRect::new(0, 0, 4, 4);
        let touching = IntegerRect::new(4, 0, 4, 4);
        assert!(!left.overlaps(&touching));
        assert!(left.overlaps(&IntegerRect::new(3, 3, 2, 2)));
        assert!(left.contains(IntegerVector::new(4, 4)));
        assert!(!left.probes(IntegerVector::new(4, 4)));
    }

    #[test]
    fn closest_contained_point_prefers_bottom_on_ties() {
        let rect = IntegerRect::new(0, 0, 10, 10);
        let closest = |x, y| rect.closest_contained_point(IntegerVector::new(x, y));
        assert_eq!(closest(5, -3), IntegerVector::new(5, 0));
        assert_eq!(closest(13, 4), IntegerVector::new(10, 4));
        assert_eq!(closest(2, 2), IntegerVector::new(2, 2));
    }

    #[test]
    fn intersection_and_inset_stay_non_negative() {
        let a = IntegerRect::new(0, 0, 5, 5);
        let b = IntegerRect::new(3, 2, 10, 10);
        assert_eq!(a.intersection(&b), IntegerRect::new(3, 2, 2, 3));
        assert!(a.intersection(&IntegerRect::new(20, 20, 2, 2)).is_empty());
        assert_eq!(a.inset(1), IntegerRect::new(1, 1, 3, 3));
        assert!(a.inset(3).is_empty());
    }
}
