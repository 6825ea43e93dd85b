//! Integer geometry: points, offsets and inclusive rectangles.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{Error, Result};

/// A pixel position (top-left based, unsigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Signed displacement between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset {
    /// Horizontal displacement.
    pub dx: i64,
    /// Vertical displacement.
    pub dy: i64,
}

impl Sub for Point {
    type Output = Offset;

    fn sub(self, rhs: Point) -> Offset {
        Offset {
            dx: i64::from(self.x) - i64::from(rhs.x),
            dy: i64::from(self.y) - i64::from(rhs.y),
        }
    }
}

impl Add<Offset> for Point {
    type Output = Option<Point>;

    /// Translate by `rhs`; `None` when the result leaves the unsigned range.
    fn add(self, rhs: Offset) -> Option<Point> {
        let x = u32::try_from(i64::from(self.x) + rhs.dx).ok()?;
        let y = u32::try_from(i64::from(self.y) + rhs.dy).ok()?;
        Some(Point { x, y })
    }
}

/// Axis-aligned rectangle with inclusive corners.
///
/// A `Rect` always covers at least one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    top_left: Point,
    bottom_right: Point,
}

impl Rect {
    /// Create a rectangle from its inclusive corners.
    ///
    /// # Panics
    ///
    /// Panics if `bottom_right` lies above or left of `top_left`.
    #[must_use]
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        assert!(
            top_left.x <= bottom_right.x && top_left.y <= bottom_right.y,
            "inverted rectangle {top_left}-{bottom_right}"
        );
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Create a rectangle from its top-left corner and size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRegion`] if either dimension is zero, and
    /// [`Error::InvalidRegion`] if the far corner overflows `u32`.
    pub fn with_size(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyRegion);
        }
        let overflow = || Error::InvalidRegion(format!("{x},{y},{width},{height}"));
        let x1 = x.checked_add(width - 1).ok_or_else(overflow)?;
        let y1 = y.checked_add(height - 1).ok_or_else(overflow)?;
        Ok(Self::new(Point::new(x, y), Point::new(x1, y1)))
    }

    /// Top-left corner (inclusive).
    #[must_use]
    pub const fn top_left(&self) -> Point {
        self.top_left
    }

    /// Bottom-right corner (inclusive).
    #[must_use]
    pub const fn bottom_right(&self) -> Point {
        self.bottom_right
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.bottom_right.x - self.top_left.x + 1
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom_right.y - self.top_left.y + 1
    }

    /// `(width, height)`.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Whether `p` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        (self.top_left.x..=self.bottom_right.x).contains(&p.x)
            && (self.top_left.y..=self.bottom_right.y).contains(&p.y)
    }

    /// Whether `other` lies entirely inside the rectangle.
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.top_left) && self.contains(other.bottom_right)
    }

    /// Whether the rectangle fits inside a `width` x `height` grid anchored at the origin.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.bottom_right.x < width && self.bottom_right.y < height
    }

    /// The same-sized rectangle with its top-left corner moved to `origin`.
    ///
    /// Returns `None` if the moved rectangle would overflow `u32`.
    #[must_use]
    pub fn moved_to(&self, origin: Point) -> Option<Rect> {
        Rect::with_size(origin.x, origin.y, self.width(), self.height()).ok()
    }

    /// Iterate the covered points in raster order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (self.top_left.y..=self.bottom_right.y).flat_map(move |y| {
            (self.top_left.x..=self.bottom_right.x).map(move |x| Point::new(x, y))
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.top_left, self.bottom_right)
    }
}

impl FromStr for Rect {
    type Err = Error;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::InvalidRegion(s.to_string()))?;
        match parts.as_slice() {
            &[x, y, w, h] => Rect::with_size(x, y, w, h),
            _ => Err(Error::InvalidRegion(s.to_string())),
        }
    }
}
