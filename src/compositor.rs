//! Writing recovered content into the output image.

use image::Rgb;

use crate::blocks::ColorBlock;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::grid::{PixelGrid, PixelGridMut};
use crate::matching::{CandidateSet, Resolution};

/// How many blocks each compositing strategy handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositeStats {
    /// Blocks replaced by their single reference window.
    pub copied: usize,
    /// Blocks replaced by the average of several candidate windows.
    pub averaged: usize,
    /// Blocks left untouched because nothing matched them.
    pub unrecoverable: usize,
}

/// The reference window of `block`'s size at `position`, checked against `reference`.
fn window<G: PixelGrid + ?Sized>(reference: &G, block: &ColorBlock, position: Point) -> Result<Rect> {
    let rect = block.rect.moved_to(position).ok_or_else(|| Error::OutOfBounds {
        rect: block.rect,
        width: reference.width(),
        height: reference.height(),
    })?;
    reference.ensure_contains(&rect)?;
    Ok(rect)
}

/// Replace every block in `output` with content recovered from `reference`.
///
/// Resolved blocks receive a copy of their reference window. Blocks with several
/// candidates receive the pixel-wise mean of all candidate windows, a lower
/// confidence guess. Blocks without candidates are left as they are.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if a block does not fit `output` or a candidate
/// window does not fit `reference`. Blocks written before the failing one stay written.
pub fn composite<O, G>(
    output: &mut O,
    blocks: &[ColorBlock],
    candidates: &CandidateSet,
    reference: &G,
) -> Result<CompositeStats>
where
    O: PixelGridMut + ?Sized,
    G: PixelGrid + ?Sized,
{
    let mut stats = CompositeStats::default();

    for (id, block) in blocks.iter().enumerate() {
        match candidates.resolution(id) {
            Resolution::Resolved(position) => {
                output.ensure_contains(&block.rect)?;
                let source = window(reference, block, position)?;
                copy_window(output, &block.rect, reference, &source);
                stats.copied += 1;
            }
            Resolution::Unresolved(positions) => {
                output.ensure_contains(&block.rect)?;
                let sources = positions
                    .iter()
                    .map(|&p| window(reference, block, p))
                    .collect::<Result<Vec<_>>>()?;
                average_windows(output, &block.rect, reference, &sources);
                stats.averaged += 1;
            }
            Resolution::Unrecoverable => stats.unrecoverable += 1,
        }
    }

    Ok(stats)
}

fn copy_window<O, G>(output: &mut O, target: &Rect, reference: &G, source: &Rect)
where
    O: PixelGridMut + ?Sized,
    G: PixelGrid + ?Sized,
{
    let (tx, ty) = (target.top_left().x, target.top_left().y);
    let (sx, sy) = (source.top_left().x, source.top_left().y);
    for dy in 0..target.height() {
        for dx in 0..target.width() {
            output.set_color(tx + dx, ty + dy, reference.color_at(sx + dx, sy + dy));
        }
    }
}

fn average_windows<O, G>(output: &mut O, target: &Rect, reference: &G, sources: &[Rect])
where
    O: PixelGridMut + ?Sized,
    G: PixelGrid + ?Sized,
{
    let (tx, ty) = (target.top_left().x, target.top_left().y);
    for dy in 0..target.height() {
        for dx in 0..target.width() {
            let mut sums = ChannelSums::default();
            for source in sources {
                sums.add(reference.color_at(source.top_left().x + dx, source.top_left().y + dy));
            }
            if let Some(mean) = sums.mean() {
                output.set_color(tx + dx, ty + dy, mean);
            }
        }
    }
}

/// Per-channel running sums of one output pixel across candidate windows.
///
/// `u64` holds the sum of every pixel of any image `u32` dimensions allow.
#[derive(Debug, Default)]
struct ChannelSums {
    sums: [u64; 3],
    count: u64,
}

impl ChannelSums {
    fn add(&mut self, color: Rgb<u8>) {
        for (sum, &v) in self.sums.iter_mut().zip(color.0.iter()) {
            *sum += u64::from(v);
        }
        self.count += 1;
    }

    /// Rounded mean, or `None` before the first sample.
    fn mean(&self) -> Option<Rgb<u8>> {
        let n = self.count;
        if n == 0 {
            return None;
        }
        // Rounded mean of values <= 255 always fits a u8.
        let mean = self.sums.map(|s| u8::try_from((s + n / 2) / n).unwrap_or(u8::MAX));
        Some(Rgb(mean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const MARK: Rgb<u8> = Rgb([1, 2, 3]);

    fn block(x: u32, y: u32, w: u32, h: u32) -> ColorBlock {
        ColorBlock {
            rect: Rect::with_size(x, y, w, h).unwrap(),
            color: MARK,
        }
    }

    fn reference() -> RgbImage {
        // Left half black, right half white, with a distinctive pixel at (1, 0).
        let mut img = RgbImage::from_fn(8, 4, |x, _| if x < 4 { BLACK } else { WHITE });
        img.put_pixel(1, 0, Rgb([10, 20, 30]));
        img
    }

    #[test]
    fn resolved_blocks_copy_their_window() {
        let reference = reference();
        let mut output = RgbImage::from_pixel(4, 4, MARK);
        let blocks = vec![block(2, 2, 2, 2)];
        let mut candidates = CandidateSet::new(1);
        candidates.push(0, Point::new(0, 0));

        let stats = composite(&mut output, &blocks, &candidates, &reference).unwrap();
        assert_eq!(stats.copied, 1);
        assert_eq!(output.color_at(2, 2), BLACK);
        assert_eq!(output.color_at(3, 2), Rgb([10, 20, 30]));
        assert_eq!(output.color_at(3, 3), BLACK);
        assert_eq!(output.color_at(0, 0), MARK);
    }

    #[test]
    fn ambiguous_blocks_get_the_pixelwise_mean() {
        let reference = reference();
        let mut output = RgbImage::from_pixel(2, 1, MARK);
        let blocks = vec![block(0, 0, 2, 1)];
        let mut candidates = CandidateSet::new(1);
        candidates.push(0, Point::new(2, 2));
        candidates.push(0, Point::new(4, 2));
        candidates.push(0, Point::new(6, 2));

        let stats = composite(&mut output, &blocks, &candidates, &reference).unwrap();
        assert_eq!(stats.averaged, 1);
        // (0 + 255 + 255) / 3 = 170
        assert_eq!(output.color_at(0, 0), Rgb([170, 170, 170]));
        // (0 + 255 + 255) / 3 for the second column too: (3,2), (5,2), (7,2).
        assert_eq!(output.color_at(1, 0), Rgb([170, 170, 170]));
    }

    #[test]
    fn unrecoverable_blocks_are_left_alone() {
        let reference = reference();
        let mut output = RgbImage::from_pixel(2, 2, MARK);
        let blocks = vec![block(0, 0, 2, 2)];
        let candidates = CandidateSet::new(1);

        let stats = composite(&mut output, &blocks, &candidates, &reference).unwrap();
        assert_eq!(stats.unrecoverable, 1);
        assert!(output.pixels().all(|&p| p == MARK));
    }

    #[test]
    fn channel_sums_hold_more_windows_than_u32_can_sum() {
        let n: u64 = 17_000_000;
        let sums = ChannelSums {
            sums: [250 * n, 7 * n, 255 * n],
            count: n,
        };
        assert!(sums.sums[2] > u64::from(u32::MAX));
        assert_eq!(sums.mean(), Some(Rgb([250, 7, 255])));
    }

    #[test]
    fn channel_sums_round_to_nearest() {
        let mut sums = ChannelSums::default();
        assert_eq!(sums.mean(), None);
        sums.add(Rgb([0, 1, 255]));
        sums.add(Rgb([1, 2, 254]));
        assert_eq!(sums.mean(), Some(Rgb([1, 2, 255])));
    }

    #[test]
    fn out_of_bounds_windows_fail_fast() {
        let reference = reference();
        let mut output = RgbImage::from_pixel(4, 4, MARK);
        let blocks = vec![block(0, 0, 2, 2)];
        let mut candidates = CandidateSet::new(1);
        candidates.push(0, Point::new(7, 3));

        let err = composite(&mut output, &blocks, &candidates, &reference).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { width: 8, height: 4, .. }));
    }
}
