//! Detect tags in an image file and print the readouts as JSON.

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use clap::Parser;
use image::ImageReader;
use maytags::{detect, DetectorConfigFile};

#[derive(Parser, Debug)]
#[command(name = "detect_tags")]
#[command(about = "Detect fiducial tags in an image")]
struct Cli {
    /// Path to the input image.
    image: PathBuf,

    /// Detector configuration (JSON); defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of partitions processed in parallel.
    #[arg(long)]
    workers: Option<usize>,

    /// Tag families to decode, overriding the configuration.
    #[arg(long, value_delimiter = ',')]
    families: Vec<String>,

    /// Write the full frame readout (JSON) here instead of printing readouts.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    maytags::core::init_from_env()?;
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => DetectorConfigFile::load_json(path)?,
        None => DetectorConfigFile::default(),
    };
    if !cli.families.is_empty() {
        cfg.detection.families = cli.families.clone();
    }
    let workers = cli.workers.unwrap_or(cfg.partition.max_workers);

    let img = load_image(&cli.image)?;
    let mut detector = cfg.build_detector()?;

    let start = Instant::now();
    let frame = detect::detect_gray(&mut detector, &img, workers)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;

    eprintln!(
        "{}: {} tags from {} quads in {elapsed_ms:.1} ms ({workers} workers)",
        cli.image.display(),
        frame.detections.len(),
        frame.quad_count
    );
    match &cli.out {
        Some(path) => {
            frame.write_json(path)?;
            eprintln!("wrote readout JSON to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&frame.readouts())?),
    }
    Ok(())
}

fn load_image(path: &Path) -> Result<image::GrayImage, Box<dyn std::error::Error>> {
    Ok(ImageReader::open(path)?.decode()?.to_luma8())
}
