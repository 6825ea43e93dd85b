//! Core depixelation engine.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use log::{info, warn};

use crate::blocks::{self, ColorBlock};
use crate::color::{ColorSpace, DEFAULT_TOLERANCE};
use crate::compositor::{self, CompositeStats};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::grid::PixelGrid;
use crate::matching::{self, CandidateSet, Resolution};
use crate::propagation::{Disambiguator, PassStats, DEFAULT_PASSES};
use crate::sizes::SizeGroups;

/// Options controlling depixelation.
#[derive(Debug, Clone)]
pub struct DepixOptions {
    /// Space the redaction tool averaged in.
    pub color_space: ColorSpace,
    /// Editor background colour; blocks of exactly this colour are ignored.
    pub background: Option<Rgb<u8>>,
    /// Largest per-channel difference still counted as a colour match.
    pub tolerance: f64,
    /// Maximum number of geometric propagation passes.
    pub passes: usize,
    /// Pixelated area to work on; the whole image when `None`.
    pub region: Option<Rect>,
}

impl Default for DepixOptions {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::GammaCorrected,
            background: None,
            tolerance: DEFAULT_TOLERANCE,
            passes: DEFAULT_PASSES,
            region: None,
        }
    }
}

/// Counters collected at every stage of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepixReport {
    /// Uniform-colour blocks found in the region.
    pub blocks_found: usize,
    /// Blocks left after dropping background-coloured ones.
    pub blocks_considered: usize,
    /// Distinct block sizes.
    pub distinct_sizes: usize,
    /// Whether the number of sizes suggests an irregular redaction grid.
    pub fragmented: bool,
    /// Blocks without any matching reference window.
    pub unrecoverable: usize,
    /// Blocks with exactly one candidate straight after matching.
    pub initially_resolved: usize,
    /// Blocks with several candidates straight after matching.
    pub initially_ambiguous: usize,
    /// Counts after each propagation pass, one entry per configured pass.
    pub passes: Vec<PassStats>,
    /// Blocks resolved in the end.
    pub resolved: usize,
    /// Blocks still ambiguous in the end (written as averages).
    pub ambiguous: usize,
    /// What the compositor did.
    pub composite: CompositeStats,
}

/// Outcome of depixelating one image.
#[derive(Debug, Clone)]
pub struct Depixelation {
    /// The pixelated image with recovered content written over each block.
    pub output: RgbImage,
    /// Blocks considered, in extraction order.
    pub blocks: Vec<ColorBlock>,
    /// Final resolution of each block, parallel to `blocks`.
    pub resolutions: Vec<Resolution>,
    /// Stage counters.
    pub report: DepixReport,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Stage counters, when the pipeline ran.
    pub report: Option<DepixReport>,
    /// Human-readable status message.
    pub message: String,
}

/// Depixelation engine bound to one reference image.
///
/// The reference is usually a screenshot of text rendered with the same editor,
/// font and size as the redacted screenshot. Create once and reuse it for any
/// number of pixelated inputs.
pub struct Depixelator {
    reference: RgbImage,
}

impl Depixelator {
    /// Create an engine searching `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRegion`] if the reference has zero area.
    pub fn new(reference: RgbImage) -> Result<Self> {
        reference.bounds()?;
        Ok(Self { reference })
    }

    /// Load the reference image from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or is empty.
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(image::open(path)?.to_rgb8())
    }

    /// Recover the pixelated region of `pixelated`.
    ///
    /// Runs extraction, size grouping, matching, propagation and compositing, and
    /// returns the output image together with per-block resolutions and counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRegion`] for an empty image or region and
    /// [`Error::OutOfBounds`] if the region does not fit the image.
    pub fn depixelate(&self, pixelated: &RgbImage, opts: &DepixOptions) -> Result<Depixelation> {
        let region = match opts.region {
            Some(region) => region,
            None => pixelated.bounds()?,
        };
        pixelated.ensure_contains(&region)?;

        let mut report = DepixReport::default();

        let found = blocks::extract(pixelated, &region)?;
        report.blocks_found = found.len();
        info!("found {} same-color rectangles in {region}", found.len());

        let blocks = blocks::remove_background(found, opts.background);
        report.blocks_considered = blocks.len();
        if opts.background.is_some() {
            info!("{} rectangles left after background filter", blocks.len());
        }

        let groups = SizeGroups::group(&blocks);
        report.distinct_sizes = groups.len();
        report.fragmented = groups.is_fragmented(region.area());
        info!("found {} different rectangle sizes", groups.len());
        if report.fragmented {
            warn!(
                "too many block size variants ({}); re-pixelating the image might help",
                groups.len()
            );
        }

        info!(
            "searching {}x{} reference ({} averaging)",
            self.reference.width(),
            self.reference.height(),
            opts.color_space
        );
        let mut candidates = matching::find_candidates(
            &blocks,
            &groups,
            &self.reference,
            opts.color_space,
            opts.tolerance,
        );

        let ids: Vec<usize> = (0..blocks.len()).collect();
        let (matched, dropped) = candidates.drop_empty(&ids);
        report.unrecoverable = dropped.len();
        info!("{} blocks have no match and cannot be recovered", dropped.len());

        let (resolved, ambiguous) = candidates.split(&matched);
        report.initially_resolved = resolved.len();
        report.initially_ambiguous = ambiguous.len();
        info!(
            "[{} straight matches | {} multiple matches]",
            resolved.len(),
            ambiguous.len()
        );

        let propagation =
            Disambiguator::new(opts.passes).run(&blocks, &mut candidates, resolved, ambiguous);
        for stats in &propagation.passes {
            info!(
                "[{} straight matches | {} multiple matches] after geometric pass",
                stats.resolved, stats.ambiguous
            );
        }
        report.passes = propagation.passes;
        report.resolved = propagation.resolved.len();
        report.ambiguous = propagation.ambiguous.len();

        let mut output = pixelated.clone();
        report.composite = compositor::composite(&mut output, &blocks, &candidates, &self.reference)?;
        if report.ambiguous > 0 {
            info!("{} blocks written as averaged guesses", report.ambiguous);
        }

        let resolutions = resolutions(&candidates, blocks.len());
        Ok(Depixelation {
            output,
            blocks,
            resolutions,
            report,
        })
    }

    /// Process a single image file: load, depixelate, save.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &DepixOptions) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            report: None,
            message: String::new(),
        };

        // Load image
        let pixelated = match image::open(input) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let depix = match self.depixelate(&pixelated, opts) {
            Ok(d) => d,
            Err(e) => {
                result.message = format!("Failed to depixelate: {e}");
                return result;
            }
        };

        // Save output
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&depix.output, output) {
            Ok(()) => {
                let r = &depix.report;
                result.success = true;
                result.message = format!(
                    "{} resolved, {} averaged, {} unrecoverable",
                    r.resolved, r.ambiguous, r.unrecoverable
                );
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }
        result.report = Some(depix.report);

        result
    }

    /// Process all supported images in a directory against the same reference.
    ///
    /// Uses parallel iteration when the `parallel` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &DepixOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![failure(input_dir, format!("Failed to read directory: {e}"))];
            }
        };

        // Create output directory
        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![failure(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        let process = |input_path: &PathBuf| match input_path.file_name() {
            Some(filename) => self.process_file(input_path, &output_dir.join(filename), opts),
            None => failure(input_path, "Path has no file name".to_string()),
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries.iter().map(process).collect()
        }
    }
}

fn failure(path: &Path, message: String) -> ProcessResult {
    ProcessResult {
        path: path.to_path_buf(),
        success: false,
        report: None,
        message,
    }
}

fn resolutions(candidates: &CandidateSet, count: usize) -> Vec<Resolution> {
    (0..count).map(|id| candidates.resolution(id)).collect()
}

/// Formats accepted as pixelated input and written as output.
const IMAGE_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Bmp,
    ImageFormat::WebP,
    ImageFormat::Jpeg,
];

/// Whether `path` names an image format the depixelator reads and writes.
///
/// The format is taken from the extension, so `shot.JPG` and `shot.jpeg` both count.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|f| IMAGE_FORMATS.contains(&f))
}

/// Write a recovered image, picking the codec from the extension.
///
/// Recovered blocks only survive another run if their colours are stored exactly,
/// so lossless formats are preferred. JPEG is written at maximum quality with a
/// warning.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for an unknown or unsupported extension and
/// an I/O or encoding error if writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    if !IMAGE_FORMATS.contains(&format) {
        return Err(Error::UnsupportedFormat(format!("{format:?}")));
    }

    if format == ImageFormat::Jpeg {
        warn!(
            "{} is lossy; recovered blocks will not match exactly if re-read",
            path.display()
        );
        let file = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(file, 100).encode_image(img)?;
    } else {
        img.save_with_format(path, format)?;
    }
    Ok(())
}
