//! Grouping blocks by dimension so that each distinct size costs one reference scan.

use std::collections::HashMap;

use crate::blocks::ColorBlock;

/// Minimum number of distinct sizes before a region is considered fragmented.
const FRAGMENTATION_MIN_SIZES: usize = 10;

/// Fraction of the region's pixel count above which distinct sizes signal fragmentation.
const FRAGMENTATION_AREA_RATIO: f64 = 0.01;

/// Blocks sharing one `(width, height)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeGroup {
    /// Block width.
    pub width: u32,
    /// Block height.
    pub height: u32,
    /// Indices into the block slice the groups were built from, in input order.
    pub blocks: Vec<usize>,
}

/// Blocks grouped by size, keyed in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SizeGroups {
    groups: Vec<SizeGroup>,
    index: HashMap<(u32, u32), usize>,
}

impl SizeGroups {
    /// Group `blocks` by size.
    #[must_use]
    pub fn group(blocks: &[ColorBlock]) -> Self {
        let mut groups = Self::default();
        for (id, block) in blocks.iter().enumerate() {
            let key = block.size();
            let slot = *groups.index.entry(key).or_insert_with(|| {
                groups.groups.push(SizeGroup {
                    width: key.0,
                    height: key.1,
                    blocks: Vec::new(),
                });
                groups.groups.len() - 1
            });
            groups.groups[slot].blocks.push(id);
        }
        groups
    }

    /// Number of distinct sizes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Block indices of the given size, if any.
    #[must_use]
    pub fn get(&self, width: u32, height: u32) -> Option<&[usize]> {
        self.index
            .get(&(width, height))
            .map(|&slot| self.groups[slot].blocks.as_slice())
    }

    /// Groups in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &SizeGroup> {
        self.groups.iter()
    }

    /// Heuristic for an irregular redaction grid: more than ten sizes and more sizes
    /// than one percent of the region's pixels.
    #[must_use]
    pub fn is_fragmented(&self, region_area: u64) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let area_limit = region_area as f64 * FRAGMENTATION_AREA_RATIO;
        #[allow(clippy::cast_precision_loss)]
        let count = self.len() as f64;
        self.len() > FRAGMENTATION_MIN_SIZES && count > area_limit
    }
}
