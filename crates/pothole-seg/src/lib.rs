// pothole-seg/src/lib.rs
// ============================================================
// pothole-seg  –  Post-processing stage for single-class
// YOLOv8-seg pothole models.
// ------------------------------------------------------------
// Pipeline: [RawOutputs] → decode → NMS → masks → verdict
// ------------------------------------------------------------
// Public API
//   * Pipeline::run(backend, input)   – infer + post-process
//   * Pipeline::postprocess(raw, hw)  – post-process only
//   * SegmentationBackend             – what a model must provide
// ============================================================

//! pothole-seg – segmentation post-processing
//!
//! Turns the two raw tensors of a YOLOv8-seg head (candidate rows with
//! mask coefficients, plus shared prototype masks) into one binary mask
//! and an area-based pothole verdict. Everything here is pure and
//! synchronous; the model itself lives behind [`SegmentationBackend`].

use thiserror::Error;

pub mod decision;
pub mod decode;
pub mod geometry;
pub mod mask;
pub mod nms;
pub mod pipeline;
pub mod report;

pub use decision::Assessment;
pub use decode::{Decoded, RawOutputs, ResolvedOutputs};
pub use pipeline::{BackendError, Pipeline, PipelineConfig, Prediction, SegmentationBackend};
pub use report::{PredictionResponse, SegmentationMetrics};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("unexpected output rank, shape {0:?}")]
    Rank(Vec<usize>),
    #[error("both outputs have the same role: {0:?} and {1:?}")]
    AmbiguousOutputs(Vec<usize>, Vec<usize>),
    #[error("batch size must be 1, got {0}")]
    Batch(usize),
    #[error("invalid input channels: expected 3, got {0}")]
    InvalidChannels(usize),
    #[error("expected {expected} features per candidate, got shape {found:?}")]
    Shape { expected: usize, found: Vec<usize> },
    #[error("{coeffs} mask coefficients for {prototypes} prototypes")]
    Coefficients { coeffs: usize, prototypes: usize },
    #[error("reshape failed: {0}")]
    Reshape(#[from] ndarray::ShapeError),
    #[error("inference backend failed: {0}")]
    Backend(#[source] BackendError),
}

pub type Result<T> = std::result::Result<T, DetectError>;
