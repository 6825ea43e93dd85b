//! Partitioning a pixelated region into uniform-colour rectangles.

use image::Rgb;

use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::grid::PixelGrid;

/// A rectangle whose every pixel has exactly `color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlock {
    /// Area covered, in pixelated-image coordinates.
    pub rect: Rect,
    /// Fill colour sampled from the pixelated image.
    pub color: Rgb<u8>,
}

impl ColorBlock {
    /// Top-left corner of the block.
    #[must_use]
    pub fn origin(&self) -> Point {
        self.rect.top_left()
    }

    /// `(width, height)` of the block.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.rect.size()
    }
}

/// Split `region` of `grid` into uniform-colour blocks that exactly tile it.
///
/// Pixels are visited in raster order. Each unvisited pixel anchors a new block that
/// grows right while the colour holds, then down while the whole row span still
/// matches. The result is deterministic but not a globally minimal tiling.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if `region` does not fit inside `grid`.
#[allow(clippy::cast_possible_truncation)]
pub fn extract<G: PixelGrid + ?Sized>(grid: &G, region: &Rect) -> Result<Vec<ColorBlock>> {
    grid.ensure_contains(region)?;

    let origin = region.top_left();
    let (w, h) = (region.width() as usize, region.height() as usize);
    let mut visited = vec![false; w * h];
    let mut blocks = Vec::new();

    let color = |rx: usize, ry: usize| grid.color_at(origin.x + rx as u32, origin.y + ry as u32);

    for ry in 0..h {
        for rx in 0..w {
            if visited[ry * w + rx] {
                continue;
            }
            let anchor = color(rx, ry);

            let mut x_end = rx + 1;
            while x_end < w && !visited[ry * w + x_end] && color(x_end, ry) == anchor {
                x_end += 1;
            }

            let mut y_end = ry + 1;
            while y_end < h
                && (rx..x_end).all(|x| !visited[y_end * w + x] && color(x, y_end) == anchor)
            {
                y_end += 1;
            }

            for y in ry..y_end {
                visited[y * w + rx..y * w + x_end].fill(true);
            }

            let rect = Rect::new(
                Point::new(origin.x + rx as u32, origin.y + ry as u32),
                Point::new(origin.x + x_end as u32 - 1, origin.y + y_end as u32 - 1),
            );
            blocks.push(ColorBlock {
                rect,
                color: anchor,
            });
        }
    }

    Ok(blocks)
}

/// Drop blocks filled with the editor background colour.
///
/// Such blocks carry no information about the redacted text. With no background
/// colour the blocks are returned unchanged.
#[must_use]
pub fn remove_background(blocks: Vec<ColorBlock>, background: Option<Rgb<u8>>) -> Vec<ColorBlock> {
    match background {
        Some(bg) => blocks.into_iter().filter(|b| b.color != bg).collect(),
        None => blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    /// Every pixel of the region belongs to exactly one block and matches its colour.
    fn assert_tiles(img: &RgbImage, region: &Rect, blocks: &[ColorBlock]) {
        let mut hits = vec![0u32; region.area() as usize];
        for block in blocks {
            assert!(region.contains_rect(&block.rect));
            for p in block.rect.points() {
                assert_eq!(img.color_at(p.x, p.y), block.color, "pixel {p} in {}", block.rect);
                let rx = (p.x - region.top_left().x) as usize;
                let ry = (p.y - region.top_left().y) as usize;
                hits[ry * region.width() as usize + rx] += 1;
            }
        }
        assert!(hits.iter().all(|&n| n == 1), "region not exactly tiled");
    }

    fn mosaic(w: u32, h: u32, cell: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = u8::try_from(((x / cell) * 7 + (y / cell) * 13) % 5 * 50).unwrap();
            Rgb([v, 255 - v, v / 2])
        })
    }

    #[test]
    fn uniform_region_is_one_block() {
        let img = RgbImage::from_pixel(6, 4, RED);
        let region = img.bounds().unwrap();
        let blocks = extract(&img, &region).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].rect, region);
        assert_eq!(blocks[0].color, RED);
    }

    #[test]
    fn regular_mosaic_is_tiled_by_cells() {
        let img = mosaic(12, 8, 4);
        let region = img.bounds().unwrap();
        let blocks = extract(&img, &region).unwrap();
        assert_tiles(&img, &region, &blocks);
        assert!(blocks
            .iter()
            .all(|b| b.size().0 % 4 == 0 && b.size().1 % 4 == 0));
    }

    #[test]
    fn irregular_content_is_still_tiled() {
        let img = RgbImage::from_fn(11, 9, |x, y| {
            if (x * x + y * 3) % 7 < 3 {
                RED
            } else {
                BLUE
            }
        });
        for region in [
            img.bounds().unwrap(),
            Rect::with_size(2, 1, 7, 6).unwrap(),
            Rect::with_size(10, 8, 1, 1).unwrap(),
        ] {
            let blocks = extract(&img, &region).unwrap();
            assert_tiles(&img, &region, &blocks);
        }
    }

    #[test]
    fn growth_is_right_then_down_in_raster_order() {
        // R R B
        // R R R
        let mut img = RgbImage::from_pixel(3, 2, RED);
        img.put_pixel(2, 0, BLUE);
        let blocks = extract(&img, &img.bounds().unwrap()).unwrap();

        let rects: Vec<_> = blocks.iter().map(|b| (b.origin(), b.size())).collect();
        assert_eq!(
            rects,
            vec![
                (Point::new(0, 0), (2, 2)),
                (Point::new(2, 0), (1, 1)),
                (Point::new(2, 1), (1, 1)),
            ]
        );
    }

    #[test]
    fn region_outside_grid_is_rejected() {
        let img = RgbImage::new(4, 4);
        let region = Rect::with_size(2, 2, 3, 3).unwrap();
        assert!(extract(&img, &region).is_err());
    }

    #[test]
    fn background_blocks_are_removed() {
        let mut img = RgbImage::from_pixel(4, 1, RED);
        img.put_pixel(1, 0, BLUE);
        let blocks = extract(&img, &img.bounds().unwrap()).unwrap();
        assert_eq!(blocks.len(), 3);

        let kept = remove_background(blocks.clone(), Some(RED));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].color, BLUE);

        assert_eq!(remove_background(blocks, None).len(), 3);
    }
}
