//! Batch pothole check over a glob of photos.
//!
//! One shared model, several predictions in flight at once on blocking
//! worker threads. Prints one JSON line per image.
//!
//! Usage: cargo run --release --bin batch_predict -- --pattern "photos/*.jpg" --jobs 4

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use pothole_model::{shared, AppConfig};
use pothole_preprocess::Preprocessor;
use pothole_seg::{Pipeline, PredictionResponse};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Semaphore;

#[derive(Parser)]
struct CliArgs {
    /// Glob of images, e.g. "data/*.jpg"
    #[arg(long)]
    pattern: String,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    model: Option<PathBuf>,

    /// Predictions in flight (default: number of CPUs)
    #[arg(long)]
    jobs: Option<usize>,
}

fn predict_one(
    path: &Path,
    preprocessor: &Preprocessor,
    pipeline: &Pipeline,
) -> Result<serde_json::Value> {
    let model = shared::get()?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let input = preprocessor.run_bytes(&bytes)?;
    let prediction = pipeline.run(model.as_ref(), input.view())?;
    let response = PredictionResponse::from(&prediction);
    Ok(serde_json::json!({
        "image": path,
        "detections": prediction.detections,
        "area_pixels": prediction.area_pixels,
        "response": response,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model.model_path = model.clone();
    }
    config.validate()?;

    let paths: Vec<PathBuf> = glob::glob(&args.pattern)
        .with_context(|| format!("Bad glob pattern {:?}", args.pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    info!("{} images match {:?}", paths.len(), args.pattern);

    let (_, _release) =
        shared::init_guarded(&config.model).context("Failed to load model")?;
    let jobs = args.jobs.unwrap_or_else(num_cpus::get).max(1);
    predict_all(paths, config, jobs).await
}

async fn predict_all(paths: Vec<PathBuf>, config: AppConfig, jobs: usize) -> Result<()> {
    let preprocessor = Arc::new(Preprocessor::new(config.preprocess));
    let pipeline = Arc::new(Pipeline::new(config.pipeline));
    let permits = Arc::new(Semaphore::new(jobs));

    let started = Instant::now();
    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let permit = Arc::clone(&permits).acquire_owned().await?;
        let preprocessor = Arc::clone(&preprocessor);
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = predict_one(&path, &preprocessor, &pipeline);
            (path, result)
        }));
    }

    let (mut ok, mut failed) = (0usize, 0usize);
    for handle in handles {
        let (path, result) = handle.await?;
        match result {
            Ok(line) => {
                ok += 1;
                println!("{}", line);
            }
            Err(e) => {
                failed += 1;
                error!("{:?}: {:#}", path, e);
            }
        }
    }
    info!(
        "{} ok, {} failed in {:.2}s",
        ok,
        failed,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
