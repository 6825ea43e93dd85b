//! Recover pixelated text in screenshots.
//!
//! A mosaic redaction replaces each block of pixels with its average colour. That
//! filter is deterministic: given a reference image rendered with the same font, size
//! and editor theme, every block the redactor could have averaged can be enumerated
//! and compared against the pixelated blocks. This crate does that search and then
//! uses the relative layout of confidently matched blocks to settle ambiguous ones.
//!
//! # Quick Start
//!
//! ```no_run
//! use depixelate::{DepixOptions, Depixelator};
//!
//! let reference = image::open("reference.png").unwrap().to_rgb8();
//! let engine = Depixelator::new(reference).expect("empty reference image");
//! let pixelated = image::open("pixelated.png").unwrap().to_rgb8();
//! let depix = engine.depixelate(&pixelated, &DepixOptions::default()).unwrap();
//! println!(
//!     "{} resolved, {} averaged, {} unrecoverable",
//!     depix.report.resolved, depix.report.ambiguous, depix.report.unrecoverable
//! );
//! depix.output.save("output.png").unwrap();
//! ```
//!
//! # Pipeline
//!
//! 1. [`blocks::extract`] splits the pixelated region into uniform-colour blocks.
//! 2. [`sizes::SizeGroups`] groups them by size so each size costs one scan.
//! 3. [`matching::find_candidates`] scans the reference for windows with the same
//!    average colour, in the [`ColorSpace`] the redactor used.
//! 4. [`propagation::Disambiguator`] narrows multi-candidate blocks using the
//!    displacement to already resolved neighbours.
//! 5. [`compositor::composite`] writes the recovered windows into the output.

#![deny(missing_docs)]

pub mod blocks;
pub mod color;
pub mod compositor;
mod engine;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod matching;
pub mod pixelate;
pub mod propagation;
pub mod sizes;

pub use color::{parse_color, ColorSpace};
pub use engine::{
    is_supported_image, save_image, DepixOptions, DepixReport, Depixelation, Depixelator,
    ProcessResult,
};
pub use error::{Error, Result};
pub use geometry::{Point, Rect};
pub use grid::{PixelGrid, PixelGridMut};
pub use matching::Resolution;
