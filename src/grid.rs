//! Pixel grid access.
//!
//! The pipeline only needs width, height and per-pixel RGB reads; the output image
//! additionally needs writes. Both are implemented for [`image::RgbImage`].

use image::{Rgb, RgbImage};

use crate::error::{Error, Result};
use crate::geometry::Rect;

/// Read access to an 8-bit RGB pixel grid.
pub trait PixelGrid {
    /// Grid width in pixels.
    fn width(&self) -> u32;

    /// Grid height in pixels.
    fn height(&self) -> u32;

    /// Colour at `(x, y)`.
    ///
    /// Implementations must panic on out-of-bounds access rather than clamp.
    fn color_at(&self, x: u32, y: u32) -> Rgb<u8>;

    /// The rectangle covering the whole grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRegion`] for a zero-sized grid.
    fn bounds(&self) -> Result<Rect> {
        Rect::with_size(0, 0, self.width(), self.height())
    }

    /// Check that `rect` lies inside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] otherwise.
    fn ensure_contains(&self, rect: &Rect) -> Result<()> {
        if rect.fits_within(self.width(), self.height()) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                rect: *rect,
                width: self.width(),
                height: self.height(),
            })
        }
    }
}

/// Write access to an 8-bit RGB pixel grid.
pub trait PixelGridMut: PixelGrid {
    /// Overwrite the colour at `(x, y)`. Panics when out of bounds.
    fn set_color(&mut self, x: u32, y: u32, color: Rgb<u8>);
}

impl PixelGrid for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn color_at(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.get_pixel(x, y)
    }
}

impl PixelGridMut for RgbImage {
    fn set_color(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        self.put_pixel(x, y, color);
    }
}
