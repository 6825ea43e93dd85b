use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use image::Rgb;

use depixelate::{parse_color, ColorSpace, DepixOptions, Depixelator, ProcessResult, Rect};

/// Output file used for a single input when `-o` is not given.
const DEFAULT_OUTPUT_IMAGE: &str = "output.png";

#[derive(Parser)]
#[command(
    name = "depixelate",
    about = "Recover pixelated text by searching a reference image for matching block averages",
    version,
    after_help = "The pixelated image should be cut down to the pixelated area, or use --region.\n\
                  The search image is usually a screenshot of a De Bruijn sequence of the expected\n\
                  characters, taken with the same editor, font and text size as the original."
)]
struct Cli {
    /// Image with the pixelated rectangle, or a directory of such images
    #[arg(short, long = "pixelimage")]
    pixel_image: PathBuf,

    /// Image with patterns to search
    #[arg(short, long = "searchimage")]
    search_image: PathBuf,

    /// Type of RGB average to use (linear or gammacorrected)
    #[arg(short, long = "averagetype", default_value = "gammacorrected")]
    average_type: ColorSpace,

    /// Original editor background color as r,g,b
    #[arg(short, long = "backgroundcolor", value_parser = parse_color)]
    background_color: Option<Rgb<u8>>,

    /// Output image, or directory for batch processing (default: output.png)
    #[arg(short, long = "outputimage")]
    output_image: Option<PathBuf>,

    /// Pixelated area as x,y,width,height (default: the whole image)
    #[arg(short, long)]
    region: Option<Rect>,

    /// Number of geometric propagation passes
    #[arg(long, default_value_t = depixelate::propagation::DEFAULT_PASSES)]
    passes: usize,

    /// Largest per-channel difference still treated as a color match
    #[arg(long, default_value_t = depixelate::color::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Where a single-file run writes its result.
    fn single_output(&self) -> PathBuf {
        self.output_image
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_IMAGE))
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.tolerance < 0.0 {
        eprintln!("Error: Tolerance must not be negative");
        process::exit(1);
    }

    init_logging(cli.verbose, cli.quiet);

    let opts = DepixOptions {
        color_space: cli.average_type,
        background: cli.background_color,
        tolerance: cli.tolerance,
        passes: cli.passes,
        region: cli.region,
    };

    log::info!("Loading search image from {}", cli.search_image.display());
    let engine = match Depixelator::open(&cli.search_image) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: Failed to load search image: {e}");
            process::exit(1);
        }
    };

    let input_path = cli.pixel_image.as_path();
    if !input_path.exists() {
        eprintln!(
            "Error: Input path does not exist: {}",
            input_path.display()
        );
        process::exit(1);
    }

    let results = if input_path.is_dir() {
        let Some(output_dir) = &cli.output_image else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: depixelate -p <input_dir> -s <search_image> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, output_dir, &opts)
    } else {
        vec![engine.process_file(input_path, &cli.single_output(), &opts)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, cli.verbose, cli.quiet);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn print_result(result: &ProcessResult, verbose: bool, quiet: bool) {
    if quiet && result.success {
        return;
    }

    let filename = file_label(&result.path);

    if result.success {
        if !quiet {
            eprintln!("[OK] {filename}: {}", result.message);
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if verbose {
        if let Some(report) = &result.report {
            eprintln!(
                "  -> {} blocks ({} after background filter), {} sizes{}",
                report.blocks_found,
                report.blocks_considered,
                report.distinct_sizes,
                if report.fragmented { " (fragmented)" } else { "" }
            );
            eprintln!(
                "  -> matching: {} single, {} multiple, {} none",
                report.initially_resolved, report.initially_ambiguous, report.unrecoverable
            );
            for (i, pass) in report.passes.iter().enumerate() {
                eprintln!(
                    "  -> pass {}: {} single, {} multiple",
                    i + 1,
                    pass.resolved,
                    pass.ambiguous
                );
            }
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_output_defaults_to_output_png() {
        let cli =
            Cli::try_parse_from(["depixelate", "-p", "secret.png", "-s", "search.png"]).unwrap();
        assert_eq!(cli.single_output(), PathBuf::from("output.png"));
        assert_eq!(cli.average_type, ColorSpace::GammaCorrected);
        assert!(cli.background_color.is_none());
    }

    #[test]
    fn explicit_output_and_options_are_parsed() {
        let cli = Cli::try_parse_from([
            "depixelate",
            "-p",
            "secret.png",
            "-s",
            "search.png",
            "-o",
            "recovered.bmp",
            "-a",
            "linear",
            "-b",
            "40,44,52",
            "-r",
            "4,5,10,2",
            "--passes",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.single_output(), PathBuf::from("recovered.bmp"));
        assert_eq!(cli.average_type, ColorSpace::Linear);
        assert_eq!(cli.background_color, Some(Rgb([40, 44, 52])));
        assert_eq!(cli.region, Some(Rect::with_size(4, 5, 10, 2).unwrap()));
        assert_eq!(cli.passes, 3);
    }
}
