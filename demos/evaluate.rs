//! Compare a predicted mask image against a ground-truth mask image.
//!
//! Usage: cargo run --bin evaluate -- --pred mask.png --gt label.png [--depth depth.png]

use anyhow::{bail, Context, Result};
use clap::Parser;
use ndarray::Array2;
use pothole_eval::{evaluate, severity_score};
use pothole_seg::SegmentationMetrics;
use std::path::{Path, PathBuf};

#[derive(Parser)]
struct CliArgs {
    #[arg(long)]
    pred: PathBuf,

    #[arg(long)]
    gt: PathBuf,

    /// Grayscale depth map aligned with the prediction, for severity
    #[arg(long)]
    depth: Option<PathBuf>,
}

/// Any nonzero luma counts as foreground.
fn load_mask(path: &Path) -> Result<Array2<u8>> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .to_luma8();
    let (w, h) = img.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        (img.get_pixel(x as u32, y as u32)[0] != 0) as u8
    }))
}

fn load_depth(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .to_luma32f();
    let (w, h) = img.dimensions();
    Ok(Array2::from_shape_vec((h as usize, w as usize), img.into_raw())?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();

    let pred = load_mask(&args.pred)?;
    let gt = load_mask(&args.gt)?;
    if pred.dim() != gt.dim() {
        bail!("prediction is {:?} but ground truth is {:?}", pred.dim(), gt.dim());
    }

    let mut metrics = SegmentationMetrics::from(evaluate(pred.view(), gt.view())?);
    metrics.area_pixels = Some(pred.iter().filter(|&&v| v != 0).count());
    metrics.area_ratio = Some(metrics.area_pixels.unwrap_or(0) as f64 / pred.len() as f64);
    if let Some(depth) = &args.depth {
        let depth = load_depth(depth)?;
        metrics.severity = Some(severity_score(pred.view(), depth.view())?);
    }

    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
