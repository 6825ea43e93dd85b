//! Geometric disambiguation of multi-candidate blocks.
//!
//! A reference screenshot rendered with the same editor layout keeps glyphs at the
//! same relative positions. If block `N` is resolved to reference position `P`, then
//! a neighbour `R` sitting at `R.origin - N.origin` in the pixelated image should sit
//! at the same displacement from `P` in the reference. Equivalently, every resolved
//! block defines a *shift* `P - N.origin`, and a candidate `c` of `R` is consistent
//! when `c - R.origin` equals one of those shifts.

use std::collections::HashSet;

use log::debug;

use crate::blocks::ColorBlock;
use crate::geometry::{Offset, Point};
use crate::matching::CandidateSet;

/// Number of propagation passes run by default.
pub const DEFAULT_PASSES: usize = 2;

/// Block counts after one propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassStats {
    /// Blocks resolved after the pass.
    pub resolved: usize,
    /// Blocks still ambiguous after the pass.
    pub ambiguous: usize,
    /// Blocks resolved during the pass.
    pub newly_resolved: usize,
}

/// Result of [`Disambiguator::run`].
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    /// Resolved block indices; propagated blocks follow the initial ones.
    pub resolved: Vec<usize>,
    /// Blocks still carrying two or more candidates.
    pub ambiguous: Vec<usize>,
    /// One entry per configured pass.
    pub passes: Vec<PassStats>,
}

/// Shifts contributed by resolved blocks.
#[derive(Debug, Default)]
struct Anchors {
    shifts: HashSet<Offset>,
}

impl Anchors {
    fn extend(&mut self, blocks: &[ColorBlock], candidates: &CandidateSet, ids: &[usize]) {
        for &id in ids {
            if let [position] = candidates.get(id) {
                self.shifts.insert(*position - blocks[id].origin());
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// The single candidate of `block` consistent with some anchor, if exactly one is.
    fn unique_consistent(&self, block: &ColorBlock, candidates: &[Point]) -> Option<Point> {
        let origin = block.origin();
        let mut consistent = candidates
            .iter()
            .filter(|&&c| self.shifts.contains(&(c - origin)));
        match (consistent.next(), consistent.next()) {
            (Some(&only), None) => Some(only),
            _ => None,
        }
    }
}

/// Runs a bounded number of geometric propagation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disambiguator {
    passes: usize,
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::new(DEFAULT_PASSES)
    }
}

impl Disambiguator {
    /// A disambiguator running `passes` passes.
    #[must_use]
    pub const fn new(passes: usize) -> Self {
        Self { passes }
    }

    /// Run one pass with every block in `resolved` as an anchor.
    ///
    /// Each ambiguous block whose candidates contain exactly one position consistent
    /// with some anchor is narrowed to it and moved to the resolved list. All other
    /// ambiguous blocks keep their candidates unchanged.
    #[must_use]
    pub fn propagate(
        blocks: &[ColorBlock],
        candidates: &mut CandidateSet,
        resolved: Vec<usize>,
        ambiguous: Vec<usize>,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut anchors = Anchors::default();
        anchors.extend(blocks, candidates, &resolved);
        let mut resolved = resolved;
        let (newly, ambiguous) = pass(&anchors, blocks, candidates, ambiguous);
        resolved.extend(newly);
        (resolved, ambiguous)
    }

    /// Run the configured number of passes.
    ///
    /// Blocks resolved in one pass become anchors for the next. Every pass runs and
    /// is recorded, including ones with nothing left to resolve.
    #[must_use]
    pub fn run(
        &self,
        blocks: &[ColorBlock],
        candidates: &mut CandidateSet,
        resolved: Vec<usize>,
        ambiguous: Vec<usize>,
    ) -> Propagation {
        let mut anchors = Anchors::default();
        anchors.extend(blocks, candidates, &resolved);

        let mut out = Propagation {
            resolved,
            ambiguous,
            passes: Vec::with_capacity(self.passes),
        };

        for index in 0..self.passes {
            let ambiguous = std::mem::take(&mut out.ambiguous);
            let (newly, ambiguous) = pass(&anchors, blocks, candidates, ambiguous);

            anchors.extend(blocks, candidates, &newly);
            out.resolved.extend_from_slice(&newly);
            out.ambiguous = ambiguous;

            let stats = PassStats {
                resolved: out.resolved.len(),
                ambiguous: out.ambiguous.len(),
                newly_resolved: newly.len(),
            };
            debug!(
                "propagation pass {}: {} resolved ({} new), {} ambiguous",
                index + 1,
                stats.resolved,
                stats.newly_resolved,
                stats.ambiguous
            );
            out.passes.push(stats);
        }

        out
    }
}

/// One pass against a fixed anchor set; returns `(newly resolved, still ambiguous)`.
fn pass(
    anchors: &Anchors,
    blocks: &[ColorBlock],
    candidates: &mut CandidateSet,
    ambiguous: Vec<usize>,
) -> (Vec<usize>, Vec<usize>) {
    if anchors.is_empty() {
        return (Vec::new(), ambiguous);
    }

    let view: &CandidateSet = candidates;
    let decide = |&id: &usize| anchors.unique_consistent(&blocks[id], view.get(id));

    #[cfg(feature = "parallel")]
    let decisions: Vec<Option<Point>> = {
        use rayon::prelude::*;
        ambiguous.par_iter().map(decide).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let decisions: Vec<Option<Point>> = ambiguous.iter().map(decide).collect();

    let mut newly = Vec::new();
    let mut remaining = Vec::new();
    for (id, decision) in ambiguous.into_iter().zip(decisions) {
        match decision {
            Some(position) if candidates.narrow_to(id, position) => newly.push(id),
            _ => remaining.push(id),
        }
    }
    (newly, remaining)
}
