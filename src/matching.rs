//! Exhaustive search of the reference image for windows matching each block.
//!
//! For every distinct block size the reference image is scanned once: each valid
//! window position is averaged and compared against the colours of all blocks of
//! that size. Positions are recorded in row-major scan order.

use std::collections::HashMap;

use image::Rgb;
use log::debug;

use crate::blocks::ColorBlock;
use crate::color::{ColorSpace, WindowAverager};
use crate::geometry::Point;
use crate::grid::PixelGrid;
use crate::sizes::{SizeGroup, SizeGroups};

/// Outcome for a single block once matching and propagation are done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one candidate survives.
    Resolved(Point),
    /// Several candidates survive; the output shows their average.
    Unresolved(Vec<Point>),
    /// No window in the reference image matches this block.
    Unrecoverable,
}

/// Candidate reference positions for each block, indexed like the block slice.
///
/// Entries are only ever shrunk after matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<Vec<Point>>,
}

impl CandidateSet {
    /// An empty set for `block_count` blocks.
    #[must_use]
    pub fn new(block_count: usize) -> Self {
        Self {
            candidates: vec![Vec::new(); block_count],
        }
    }

    /// Candidates of block `id`, in scan order.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a tracked block.
    #[must_use]
    pub fn get(&self, id: usize) -> &[Point] {
        &self.candidates[id]
    }

    /// Append a candidate position for block `id`.
    pub fn push(&mut self, id: usize, position: Point) {
        self.candidates[id].push(position);
    }

    /// Shrink block `id` to the single candidate `position`.
    ///
    /// Returns `false` (leaving the entry untouched) if `position` is not already a
    /// candidate, so an entry can never grow.
    pub fn narrow_to(&mut self, id: usize, position: Point) -> bool {
        let entry = &mut self.candidates[id];
        if entry.contains(&position) {
            entry.clear();
            entry.push(position);
            true
        } else {
            false
        }
    }

    /// Classify block `id` by its surviving candidates.
    #[must_use]
    pub fn resolution(&self, id: usize) -> Resolution {
        match self.candidates[id].as_slice() {
            [] => Resolution::Unrecoverable,
            [only] => Resolution::Resolved(*only),
            many => Resolution::Unresolved(many.to_vec()),
        }
    }

    /// Partition `ids` into `(with candidates, without candidates)`, keeping order.
    #[must_use]
    pub fn drop_empty(&self, ids: &[usize]) -> (Vec<usize>, Vec<usize>) {
        ids.iter()
            .copied()
            .partition(|&id| !self.candidates[id].is_empty())
    }

    /// Partition `ids` into `(resolved, ambiguous)`: exactly one candidate versus two or more.
    ///
    /// Blocks without candidates belong to neither side.
    #[must_use]
    pub fn split(&self, ids: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut resolved = Vec::new();
        let mut ambiguous = Vec::new();
        for &id in ids {
            match self.candidates[id].len() {
                0 => {}
                1 => resolved.push(id),
                _ => ambiguous.push(id),
            }
        }
        (resolved, ambiguous)
    }
}

/// Colours searched for within one size group, each with the blocks that carry it.
struct ColorTargets {
    colors: Vec<Rgb<u8>>,
    blocks: Vec<Vec<usize>>,
}

impl ColorTargets {
    fn new(group: &SizeGroup, blocks: &[ColorBlock]) -> Self {
        let mut index: HashMap<[u8; 3], usize> = HashMap::new();
        let mut targets = Self {
            colors: Vec::new(),
            blocks: Vec::new(),
        };
        for &id in &group.blocks {
            let color = blocks[id].color;
            let slot = *index.entry(color.0).or_insert_with(|| {
                targets.colors.push(color);
                targets.blocks.push(Vec::new());
                targets.colors.len() - 1
            });
            targets.blocks[slot].push(id);
        }
        targets
    }
}

/// Find, for every block, the reference positions whose window average equals its colour.
///
/// `tolerance` is the largest per-channel difference (in the encoded 0-255 domain)
/// still counted as equal. Size groups larger than the reference yield no candidates.
#[must_use]
pub fn find_candidates<G: PixelGrid + ?Sized>(
    blocks: &[ColorBlock],
    groups: &SizeGroups,
    reference: &G,
    space: ColorSpace,
    tolerance: f64,
) -> CandidateSet {
    let mut set = CandidateSet::new(blocks.len());
    let (ref_w, ref_h) = (reference.width(), reference.height());
    if groups.is_empty() || ref_w == 0 || ref_h == 0 {
        return set;
    }

    let averager = WindowAverager::new(reference, space);

    for group in groups.iter() {
        if group.width > ref_w || group.height > ref_h {
            debug!(
                "size {}x{} exceeds reference {ref_w}x{ref_h}, no candidates",
                group.width, group.height
            );
            continue;
        }

        let targets = ColorTargets::new(group, blocks);
        let rows = scan_group(&averager, group, &targets, ref_w, ref_h, tolerance);

        let mut hits = 0usize;
        for (slot, position) in rows.into_iter().flatten() {
            for &id in &targets.blocks[slot] {
                set.push(id, position);
            }
            hits += 1;
        }
        debug!(
            "size {}x{}: {} blocks, {} colors, {hits} matching windows",
            group.width,
            group.height,
            group.blocks.len(),
            targets.colors.len()
        );
    }

    set
}

/// Per-row hit lists `(colour slot, position)` for one size group, in row order.
fn scan_group(
    averager: &WindowAverager,
    group: &SizeGroup,
    targets: &ColorTargets,
    ref_w: u32,
    ref_h: u32,
    tolerance: f64,
) -> Vec<Vec<(usize, Point)>> {
    let (w, h) = (group.width, group.height);
    let last_y = ref_h - h;

    let scan_row = |y: u32| {
        let mut hits = Vec::new();
        for x in 0..=(ref_w - w) {
            let mean = averager.window_mean(x, y, w, h);
            for (slot, &color) in targets.colors.iter().enumerate() {
                if mean.matches(color, tolerance) {
                    hits.push((slot, Point::new(x, y)));
                }
            }
        }
        hits
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..=last_y).into_par_iter().map(scan_row).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..=last_y).map(scan_row).collect()
    }
}
