//! Depixelate a single image against a reference image.
//!
//! Usage:
//! ```sh
//! cargo run --example depixelate_image -- pixelated.png reference.png output.png
//! ```

use std::env;
use std::process;

use depixelate::{DepixOptions, Depixelator};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <pixelated> <reference> <output>", args[0]);
        process::exit(1);
    }

    let pixelated = &args[1];
    let reference = &args[2];
    let output = &args[3];

    let engine = Depixelator::open(reference.as_ref()).expect("failed to load reference image");
    let opts = DepixOptions::default();
    let result = engine.process_file(pixelated.as_ref(), output.as_ref(), &opts);

    if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
