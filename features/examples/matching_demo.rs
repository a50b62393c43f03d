//! Feature Matching Example
//!
//! Compares two images with the default ORB pipeline and writes the
//! side-by-side visualization next to the source image.
//!
//! ```text
//! cargo run -p easymatch-features --example matching_demo -- source.png target.png [out.png]
//! ```
//!
//! Detector thresholds are read from the `EASYMATCH_*` environment variables.

use easymatch_core::{Image, ThresholdConfig};
use easymatch_features::{MatchPipeline, MatchPolicy};
use std::error::Error;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(source_path), Some(target_path)) = (args.next(), args.next()) else {
        eprintln!("usage: matching_demo <source> <target> [output]");
        std::process::exit(2);
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("matches.png"));

    let source = Image::from(&image::open(&source_path)?);
    let target = Image::from(&image::open(&target_path)?);

    let pipeline = MatchPipeline::default()
        .with_threshold(ThresholdConfig::from_env()?)
        .with_cross_check(true)
        .with_policy(MatchPolicy::with_max_distance(64.0));
    let outcome = pipeline.run(0, &source, 1, &target)?;

    println!("{source_path}: {} keypoints", outcome.source.keypoints().len());
    println!("{target_path}: {} keypoints", outcome.target.keypoints().len());
    println!(
        "{} correspondences, {} accepted, match rate {:.3}",
        outcome.matches.len(),
        outcome.accepted_matches().len(),
        outcome.match_rate
    );

    if let Some(rgba) = outcome.visualization.as_ref().and_then(Image::to_rgba_image) {
        rgba.save(&output)?;
        println!("visualization written to {}", output.display());
    }

    Ok(())
}
