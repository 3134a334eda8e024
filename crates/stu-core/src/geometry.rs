#![forbid(unsafe_code)]

//! Pixel geometry primitives.

use std::ops::{Add, Neg, Sub};

/// A viewport position in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// Horizontal position (grows rightwards).
    pub x: i32,
    /// Vertical position (grows downwards).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Displacement from `origin` to `self`.
    #[inline]
    pub const fn delta_from(self, origin: Point) -> Offset {
        Offset::new(
            self.x.saturating_sub(origin.x),
            self.y.saturating_sub(origin.y),
        )
    }
}

/// A translation in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offset {
    /// Horizontal displacement.
    pub x: i32,
    /// Vertical displacement.
    pub y: i32,
}

impl Offset {
    /// The zero offset.
    pub const ZERO: Offset = Offset::new(0, 0);

    /// Create a new offset.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether both components are zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl Add for Offset {
    type Output = Offset;

    #[inline]
    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for Offset {
    type Output = Offset;

    #[inline]
    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl Neg for Offset {
    type Output = Offset;

    #[inline]
    fn neg(self) -> Offset {
        Offset::new(self.x.saturating_neg(), self.y.saturating_neg())
    }
}

impl Sub for Point {
    type Output = Offset;

    #[inline]
    fn sub(self, rhs: Point) -> Offset {
        self.delta_from(rhs)
    }
}

impl Add<Offset> for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Offset) -> Point {
        Point::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}
