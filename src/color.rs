//! Colour-space aware block averaging.
//!
//! A pixelation filter averages each block either on the raw (gamma-encoded) channel
//! values or in linear light. Matching only works when candidates are averaged in the
//! same space the redactor used, so every mean here is parameterised by [`ColorSpace`].
//!
//! Means are reported in the encoded 0-255 domain as floating point, unrounded, so
//! that comparisons against stored block colours can apply an explicit tolerance.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use image::Rgb;

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::grid::PixelGrid;

/// Exponent of the power-law transfer function used for gamma-corrected averaging.
pub const GAMMA: f64 = 2.2;

/// Default per-channel tolerance when comparing a window mean to a block colour.
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// The space in which pixel values are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Arithmetic mean of the raw channel values.
    Linear,
    /// Decode to linear light, average, re-encode.
    #[default]
    GammaCorrected,
}

impl ColorSpace {
    /// Map an encoded channel value into the averaging domain (still scaled to 0-255).
    #[must_use]
    pub fn decode(self, value: u8) -> f64 {
        match self {
            ColorSpace::Linear => f64::from(value),
            ColorSpace::GammaCorrected => gamma_table()[usize::from(value)],
        }
    }

    /// Map an averaged value back into the encoded 0-255 domain.
    #[must_use]
    pub fn encode(self, value: f64) -> f64 {
        match self {
            ColorSpace::Linear => value,
            // Summed-area differences can dip a hair below zero.
            ColorSpace::GammaCorrected => 255.0 * (value.max(0.0) / 255.0).powf(1.0 / GAMMA),
        }
    }
}

fn gamma_table() -> &'static [f64; 256] {
    static TABLE: OnceLock<[f64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0; 256];
        for (v, slot) in (0u8..=255).zip(table.iter_mut()) {
            *slot = 255.0 * (f64::from(v) / 255.0).powf(GAMMA);
        }
        table
    })
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorSpace::Linear => "linear",
            ColorSpace::GammaCorrected => "gammacorrected",
        })
    }
}

impl FromStr for ColorSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(ColorSpace::Linear),
            "gammacorrected" | "gamma-corrected" | "gamma" => Ok(ColorSpace::GammaCorrected),
            _ => Err(Error::InvalidColorSpace(s.to_string())),
        }
    }
}

/// Parse a colour written as `r,g,b`.
///
/// # Errors
///
/// Returns [`Error::InvalidColor`] unless the input holds exactly three values in `0..=255`.
pub fn parse_color(s: &str) -> Result<Rgb<u8>> {
    let channels: Vec<u8> = s
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::InvalidColor(s.to_string()))?;
    match channels.as_slice() {
        &[r, g, b] => Ok(Rgb([r, g, b])),
        _ => Err(Error::InvalidColor(s.to_string())),
    }
}

/// An unrounded mean colour in the encoded 0-255 domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanColor(pub [f64; 3]);

impl MeanColor {
    /// Round to the nearest 8-bit colour.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb(self.0.map(|c| c.round().clamp(0.0, 255.0) as u8))
    }

    /// Whether every channel lies within `tolerance` of `color`.
    #[must_use]
    pub fn matches(&self, color: Rgb<u8>, tolerance: f64) -> bool {
        self.0
            .iter()
            .zip(color.0.iter())
            .all(|(&m, &c)| (m - f64::from(c)).abs() <= tolerance)
    }
}

/// Average the pixels of `rect` in `grid` under `space`.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if `rect` does not fit inside the grid.
pub fn average<G: PixelGrid + ?Sized>(grid: &G, rect: &Rect, space: ColorSpace) -> Result<MeanColor> {
    grid.ensure_contains(rect)?;

    let mut sums = [0.0_f64; 3];
    for p in rect.points() {
        let px = grid.color_at(p.x, p.y);
        for (sum, &v) in sums.iter_mut().zip(px.0.iter()) {
            *sum += space.decode(v);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let n = rect.area() as f64;
    Ok(MeanColor(sums.map(|s| space.encode(s / n))))
}

/// Constant-time window means over a fixed grid.
///
/// Holds one summed-area table per channel in the decoded domain, so the mean of any
/// window costs four lookups. Used for the exhaustive reference scan.
pub struct WindowAverager {
    width: u32,
    height: u32,
    space: ColorSpace,
    /// `(width + 1) * (height + 1)` prefix sums; row 0 and column 0 are zero.
    sums: Vec<[f64; 3]>,
}

impl WindowAverager {
    /// Build the summed-area tables for `grid`.
    pub fn new<G: PixelGrid + ?Sized>(grid: &G, space: ColorSpace) -> Self {
        let width = grid.width();
        let height = grid.height();
        let stride = width as usize + 1;
        let mut sums = vec![[0.0_f64; 3]; stride * (height as usize + 1)];

        for y in 0..height {
            let mut row = [0.0_f64; 3];
            for x in 0..width {
                let px = grid.color_at(x, y);
                for c in 0..3 {
                    row[c] += space.decode(px[c]);
                }
                let above = sums[y as usize * stride + x as usize + 1];
                let idx = (y as usize + 1) * stride + x as usize + 1;
                for c in 0..3 {
                    sums[idx][c] = above[c] + row[c];
                }
            }
        }

        Self {
            width,
            height,
            space,
            sums,
        }
    }

    /// Mean colour of `rect`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `rect` does not fit inside the grid.
    pub fn mean(&self, rect: &Rect) -> Result<MeanColor> {
        if !rect.fits_within(self.width, self.height) {
            return Err(Error::OutOfBounds {
                rect: *rect,
                width: self.width,
                height: self.height,
            });
        }
        let tl = rect.top_left();
        Ok(self.window_mean(tl.x, tl.y, rect.width(), rect.height()))
    }

    /// Mean of the `w` x `h` window at `(x, y)`; the caller guarantees it fits.
    pub(crate) fn window_mean(&self, x: u32, y: u32, w: u32, h: u32) -> MeanColor {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let stride = self.width as usize + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);

        let a = self.sums[y0 * stride + x0];
        let b = self.sums[y0 * stride + x1];
        let c = self.sums[y1 * stride + x0];
        let d = self.sums[y1 * stride + x1];

        #[allow(clippy::cast_precision_loss)]
        let n = (u64::from(w) * u64::from(h)) as f64;
        let mut mean = [0.0_f64; 3];
        for ch in 0..3 {
            mean[ch] = self.space.encode((d[ch] - b[ch] - c[ch] + a[ch]) / n);
        }
        MeanColor(mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelate::pixelate;
    use image::RgbImage;

    fn channel(v: u32) -> u8 {
        u8::try_from(v % 256).unwrap()
    }

    fn checker(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn uniform_block_averages_to_itself_in_both_spaces() {
        let img = RgbImage::from_pixel(4, 4, Rgb([12, 130, 251]));
        let rect = Rect::with_size(0, 0, 4, 4).unwrap();
        for space in [ColorSpace::Linear, ColorSpace::GammaCorrected] {
            let mean = average(&img, &rect, space).unwrap();
            assert_eq!(mean.to_rgb(), Rgb([12, 130, 251]));
            assert!(mean.matches(Rgb([12, 130, 251]), 1e-9));
        }
    }

    #[test]
    fn linear_and_gamma_means_differ_on_mixed_content() {
        let img = checker(2, 2);
        let rect = Rect::with_size(0, 0, 2, 2).unwrap();
        let linear = average(&img, &rect, ColorSpace::Linear).unwrap();
        let gamma = average(&img, &rect, ColorSpace::GammaCorrected).unwrap();

        assert!((linear.0[0] - 127.5).abs() < 1e-9);
        let expected = 255.0 * 0.5_f64.powf(1.0 / GAMMA);
        assert!((gamma.0[0] - expected).abs() < 1e-9);
        assert!(!gamma.matches(linear.to_rgb(), DEFAULT_TOLERANCE));
    }

    #[test]
    fn pixelated_fill_matches_the_window_mean_of_the_original() {
        let original = RgbImage::from_fn(7, 5, |x, y| {
            Rgb([channel(x * 50), channel(y * 90), channel(x * y * 17)])
        });
        let window = Rect::with_size(1, 1, 5, 3).unwrap();
        let mut pixelated = original.clone();
        pixelate(&mut pixelated, &window, 5, ColorSpace::GammaCorrected).unwrap();
        let fill = pixelated.color_at(1, 1);
        assert!(window.points().all(|p| pixelated.color_at(p.x, p.y) == fill));

        let gamma = WindowAverager::new(&original, ColorSpace::GammaCorrected);
        assert!(gamma.mean(&window).unwrap().matches(fill, DEFAULT_TOLERANCE));

        let linear = WindowAverager::new(&original, ColorSpace::Linear);
        assert!(!linear.mean(&window).unwrap().matches(fill, DEFAULT_TOLERANCE));
    }

    #[test]
    fn average_rejects_out_of_bounds() {
        let img = checker(3, 3);
        let rect = Rect::with_size(2, 2, 2, 2).unwrap();
        assert!(matches!(
            average(&img, &rect, ColorSpace::Linear),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn window_averager_agrees_with_direct_average() {
        let img = RgbImage::from_fn(9, 7, |x, y| {
            Rgb([
                channel(x * 37 + y * 11),
                channel(x * x + y * 53),
                channel(x * 101 + y * y * 7),
            ])
        });
        for space in [ColorSpace::Linear, ColorSpace::GammaCorrected] {
            let averager = WindowAverager::new(&img, space);
            for (x, y, w, h) in [(0, 0, 9, 7), (2, 3, 4, 2), (8, 6, 1, 1), (1, 0, 3, 7)] {
                let rect = Rect::with_size(x, y, w, h).unwrap();
                let fast = averager.mean(&rect).unwrap();
                let slow = average(&img, &rect, space).unwrap();
                for c in 0..3 {
                    assert!(
                        (fast.0[c] - slow.0[c]).abs() < 1e-6,
                        "{space} {rect} ch {c}: {} vs {}",
                        fast.0[c],
                        slow.0[c]
                    );
                }
            }
            let spill = Rect::with_size(5, 5, 5, 5).unwrap();
            assert!(averager.mean(&spill).is_err());
        }
    }

    #[test]
    fn color_space_parses_and_displays() {
        assert_eq!("linear".parse::<ColorSpace>().unwrap(), ColorSpace::Linear);
        assert_eq!(
            "GammaCorrected".parse::<ColorSpace>().unwrap(),
            ColorSpace::GammaCorrected
        );
        assert!("srgb".parse::<ColorSpace>().is_err());
        assert_eq!(ColorSpace::default().to_string(), "gammacorrected");
    }

    #[test]
    fn parse_color_accepts_rgb_triples() {
        assert_eq!(parse_color("40, 44,52").unwrap(), Rgb([40, 44, 52]));
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("1,2,256").is_err());
        assert!(parse_color("red").is_err());
    }
}
