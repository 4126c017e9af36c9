//! pothole-eval – offline mask quality metrics.
//!
//! None of this runs during inference: every metric here needs a
//! ground-truth mask (or depth map) that only exists in labelled datasets.
//! Masks are `u8` arrays where any nonzero pixel is foreground.

use ndarray::ArrayView2;
use pothole_seg::SegmentationMetrics;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod boundary;
pub mod overlap;
pub mod severity;
pub mod shape;

pub use boundary::boundary_f1;
pub use overlap::{area_error, dice_score, is_genuine_pothole, mask_iou};
pub use severity::{severity_rank_correlation, severity_score};
pub use shape::{length_error, major_axis_length};

/// Denominator guard shared by every ratio.
pub const EPS: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("mask shapes differ: {0:?} vs {1:?}")]
    ShapeMismatch((usize, usize), (usize, usize)),
    #[error("score lists differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),
}

pub type Result<T> = std::result::Result<T, EvalError>;

pub(crate) fn check_shapes(a: ArrayView2<u8>, b: ArrayView2<u8>) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(EvalError::ShapeMismatch(a.dim(), b.dim()));
    }
    Ok(())
}

pub(crate) fn count(mask: ArrayView2<u8>) -> usize {
    mask.iter().filter(|&&v| v != 0).count()
}

/// Every ground-truth comparison for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub iou: f64,
    pub dice: f64,
    pub boundary_f1: f64,
    pub area_error: f64,
    pub length_error: f64,
}

impl From<Evaluation> for SegmentationMetrics {
    fn from(e: Evaluation) -> Self {
        SegmentationMetrics {
            iou: Some(e.iou),
            dice: Some(e.dice),
            boundary_f1: Some(e.boundary_f1),
            area_error: Some(e.area_error),
            length_error: Some(e.length_error),
            ..Default::default()
        }
    }
}

pub fn evaluate(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> Result<Evaluation> {
    check_shapes(pred, gt)?;
    Ok(Evaluation {
        iou: mask_iou(pred, gt)?,
        dice: dice_score(pred, gt)?,
        boundary_f1: boundary_f1(pred, gt)?,
        area_error: area_error(pred, gt),
        length_error: length_error(pred, gt),
    })
}
