//! Error types for the depixelate crate.

use crate::geometry::Rect;

/// Errors that can occur while depixelating an image.
///
/// Blocks without candidates, fragmented block sizes and blocks left ambiguous after
/// propagation are not errors: they are counted in [`crate::DepixReport`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rectangle or search window does not fit inside its grid.
    #[error("rectangle {rect} is out of bounds for a {width}x{height} grid")]
    OutOfBounds {
        /// The offending rectangle.
        rect: Rect,
        /// Grid width in pixels.
        width: u32,
        /// Grid height in pixels.
        height: u32,
    },

    /// The selected region (or the image itself) has zero area.
    #[error("selected region is empty")]
    EmptyRegion,

    /// A colour could not be parsed from its `r,g,b` form.
    #[error("invalid color {0:?}, expected r,g,b with values 0-255")]
    InvalidColor(String),

    /// A region could not be parsed from its `x,y,width,height` form.
    #[error("invalid region {0:?}, expected x,y,width,height")]
    InvalidRegion(String),

    /// An unknown averaging colour space was requested.
    #[error("unknown color space {0:?}, expected linear or gammacorrected")]
    InvalidColorSpace(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let oob = Error::OutOfBounds {
            rect: Rect::new(Point::new(4, 5), Point::new(9, 12)),
            width: 8,
            height: 8,
        };
        let msg = oob.to_string();
        assert!(msg.contains("(4,5)-(9,12)"));
        assert!(msg.contains("8x8"));

        assert!(Error::InvalidColor("1,2".into()).to_string().contains("\"1,2\""));
    }
}
