//! The forward block-averaging filter.
//!
//! Pixelates a region the way a redaction tool does: the region is cut into square
//! tiles aligned to its top-left corner (clipped at the right and bottom edges) and
//! each tile is filled with its average colour. Useful for producing test inputs and
//! for checking that a reference image can reproduce a given redaction.

use crate::color::{average, ColorSpace};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::grid::PixelGridMut;

/// Pixelate `region` of `image` in place with `block_size` tiles averaged in `space`.
///
/// Returns the number of tiles written.
///
/// # Errors
///
/// Returns [`Error::EmptyRegion`] for a zero `block_size` and [`Error::OutOfBounds`]
/// if `region` does not fit inside `image`.
pub fn pixelate<O: PixelGridMut + ?Sized>(
    image: &mut O,
    region: &Rect,
    block_size: u32,
    space: ColorSpace,
) -> Result<usize> {
    if block_size == 0 {
        return Err(Error::EmptyRegion);
    }
    image.ensure_contains(region)?;

    let origin = region.top_left();
    let mut tiles = 0;
    for ty in (0..region.height()).step_by(block_size as usize) {
        for tx in (0..region.width()).step_by(block_size as usize) {
            let w = block_size.min(region.width() - tx);
            let h = block_size.min(region.height() - ty);
            let tile = Rect::with_size(origin.x + tx, origin.y + ty, w, h)?;

            let color = average(image, &tile, space)?.to_rgb();
            for p in tile.points() {
                image.set_color(p.x, p.y, color);
            }
            tiles += 1;
        }
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::extract;
    use crate::grid::PixelGrid;
    use image::{Rgb, RgbImage};

    #[test]
    fn tiles_are_uniform_and_clipped_at_the_edges() {
        let mut img = RgbImage::from_fn(10, 7, |x, y| {
            Rgb([u8::try_from(x * 20).unwrap(), u8::try_from(y * 30).unwrap(), 99])
        });
        let region = img.bounds().unwrap();
        let tiles = pixelate(&mut img, &region, 4, ColorSpace::Linear).unwrap();
        assert_eq!(tiles, 3 * 2);

        // 4x4 tile at the origin: x in 0..4, y in 0..4 -> mean x*20 = 30, mean y*30 = 45.
        assert_eq!(img.color_at(0, 0), Rgb([30, 45, 99]));
        assert_eq!(img.color_at(3, 3), Rgb([30, 45, 99]));
        // Clipped 2x3 tile at (8, 4): x in {8, 9}, y in {4, 5, 6}.
        assert_eq!(img.color_at(9, 6), Rgb([170, 150, 99]));
    }

    #[test]
    fn pixelated_region_extracts_into_its_tiles() {
        let mut img = RgbImage::from_fn(12, 8, |x, y| {
            Rgb([u8::try_from((x * 7 + y * 31) % 256).unwrap(), 0, 0])
        });
        let region = Rect::with_size(2, 2, 8, 4).unwrap();
        pixelate(&mut img, &region, 4, ColorSpace::GammaCorrected).unwrap();

        let blocks = extract(&img, &region).unwrap();
        assert!(blocks.len() <= 2);
        assert!(blocks.iter().all(|b| b.size().1 == 4));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let mut img = RgbImage::new(4, 4);
        let region = img.bounds().unwrap();
        assert!(matches!(
            pixelate(&mut img, &region, 0, ColorSpace::Linear),
            Err(Error::EmptyRegion)
        ));
    }
}
