//! Single-image pothole check.
//!
//! Loads the model once, runs one photo through preprocess → model →
//! post-processing, prints the response JSON and optionally saves the mask.
//!
//! Usage: cargo run --bin predict -- --image road.jpg --mask-out mask.png
//!        cargo run --bin predict -- --model best.onnx --check-model

use anyhow::{Context, Result};
use clap::Parser;
use image::GrayImage;
use log::info;
use ndarray::Array2;
use pothole_model::{shared, validate_onnx_model, AppConfig};
use pothole_preprocess::Preprocessor;
use pothole_seg::{Pipeline, PredictionResponse};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(about = "Is this a pothole?")]
struct CliArgs {
    /// Photo to check
    #[arg(long, required_unless_present = "check_model")]
    image: Option<PathBuf>,

    /// Only load the model and print its inputs and outputs
    #[arg(long)]
    check_model: bool,

    /// JSON config (model, preprocess, pipeline sections)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the model path from the config
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write the binary mask here as an 8-bit PNG
    #[arg(long)]
    mask_out: Option<PathBuf>,

    #[arg(long)]
    conf: Option<f32>,

    #[arg(long)]
    iou: Option<f32>,

    #[arg(long)]
    min_area: Option<usize>,
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {:?}", path))?,
        None => AppConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model.model_path = model.clone();
    }
    if let Some(v) = args.conf {
        config.pipeline.conf_threshold = v;
    }
    if let Some(v) = args.iou {
        config.pipeline.iou_threshold = v;
    }
    if let Some(v) = args.min_area {
        config.pipeline.min_area_pixels = v;
    }
    config.validate()?;
    Ok(config)
}

fn save_mask(mask: &Array2<u8>, path: &Path) -> Result<()> {
    let (h, w) = mask.dim();
    let img = GrayImage::from_fn(w as u32, h as u32, |x, y| {
        image::Luma([if mask[[y as usize, x as usize]] != 0 { 255 } else { 0 }])
    });
    img.save(path)
        .with_context(|| format!("Failed to write mask {:?}", path))
}

fn predict(config: &AppConfig, image: &Path, mask_out: Option<&Path>) -> Result<()> {
    let (model, _release) =
        shared::init_guarded(&config.model).context("Failed to load model")?;
    let preprocessor = Preprocessor::new(config.preprocess.clone());
    let pipeline = Pipeline::new(config.pipeline.clone());

    let bytes =
        std::fs::read(image).with_context(|| format!("Failed to read image {:?}", image))?;
    let input = preprocessor.run_bytes(&bytes)?;
    let prediction = pipeline.run(model.as_ref(), input.view())?;
    info!(
        "{:?}: pothole={} area={}px confidence={:.3}",
        image, prediction.is_pothole, prediction.area_pixels, prediction.confidence
    );

    if let (Some(path), Some(mask)) = (mask_out, &prediction.mask) {
        save_mask(mask, path)?;
        info!("mask written to {:?}", path);
    }

    let response = PredictionResponse::from(&prediction);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();
    let config = load_config(&args)?;

    if args.check_model {
        let summary = validate_onnx_model(&config.model)
            .with_context(|| format!("Model {:?} is not usable", config.model.model_path))?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let image = args.image.as_deref().context("--image is required")?;
    predict(&config, image, args.mask_out.as_deref())
}
