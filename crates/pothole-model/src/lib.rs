//! # pothole-model
//!
//! Loads the exported YOLOv8-seg pothole model into ONNX Runtime and exposes
//! it to `pothole-seg` as a [`SegmentationBackend`](pothole_seg::SegmentationBackend).
//!
//! ## Features
//!
//! - JSON configuration covering model, pre-processing and pipeline thresholds
//! - One session per process, initialised at startup and torn down explicitly
//! - Raw outputs handed over untyped; the pipeline sorts out which is which

use ort::session::builder::GraphOptimizationLevel;
use pothole_preprocess::PreprocessConfig;
use pothole_seg::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod session;
pub mod shared;

pub use session::SegmentationModel;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad configuration file: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("model has no inputs")]
    NoInputs,
    #[error("expected 2 model outputs, got {0}")]
    OutputCount(usize),
    #[error("expected input (1, 3, {expected_h}, {expected_w}), got {found:?}")]
    InputShape {
        expected_h: u32,
        expected_w: u32,
        found: Vec<usize>,
    },
    #[error("output tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("model session lock poisoned")]
    SessionPoisoned,
    #[error("shared model not initialised")]
    NotInitialised,
    #[error("shared model already initialised")]
    AlreadyInitialised,
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Where the model lives and how to run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the exported ONNX file
    pub model_path: PathBuf,
    /// Model input dimensions (height, width)
    pub input_size: (u32, u32),
    /// Intra-op threads; `None` leaves the runtime default
    pub intra_threads: Option<usize>,
    /// Graph optimisation level, 0 (off) to 3 (all)
    pub optimization_level: u8,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/best.onnx"),
            input_size: (640, 640),
            intra_threads: None,
            optimization_level: 3,
        }
    }
}

impl ModelConfig {
    pub(crate) fn graph_optimization_level(&self) -> GraphOptimizationLevel {
        match self.optimization_level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        }
    }
}

/// Everything a binary needs to go from a photo to a verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub preprocess: PreprocessConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Read a JSON config; missing sections and fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Thresholds in range, and the pre-processor feeding the size the
    /// model was exported at.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        for (name, v) in [
            ("conf_threshold", p.conf_threshold),
            ("iou_threshold", p.iou_threshold),
            ("mask_threshold", p.mask_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }
        let (h, w) = self.model.input_size;
        if (self.preprocess.height, self.preprocess.width) != (h, w) {
            return Err(ModelError::InvalidConfig(format!(
                "preprocess size {}x{} does not match model input {}x{}",
                self.preprocess.width, self.preprocess.height, w, h
            )));
        }
        Ok(())
    }
}

/// What a model exposes once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_path: PathBuf,
    pub input_name: String,
    pub output_names: Vec<String>,
    pub input_size: (u32, u32),
}

/// Load `config.model_path` exactly as serving would and report its
/// interface. Fails unless the model has an input and two outputs.
pub fn validate_onnx_model(config: &ModelConfig) -> Result<ModelSummary> {
    let model = SegmentationModel::load(config)?;
    Ok(ModelSummary {
        model_path: config.model_path.clone(),
        input_name: model.input_name().to_string(),
        output_names: model.output_names().to_vec(),
        input_size: model.input_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.input_size, (640, 640));
        assert_eq!(config.optimization_level, 3);
        assert!(config.intra_threads.is_none());
    }

    #[test]
    fn test_default_app_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let mut config = AppConfig::default();
        config.preprocess.width = 320;
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = AppConfig::default();
        config.pipeline.iou_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("iou_threshold"));
    }
}
