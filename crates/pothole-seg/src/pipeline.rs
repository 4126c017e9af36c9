//! End-to-end post-processing: raw tensors → [`Prediction`].

use log::{debug, info};
use ndarray::{Array2, ArrayView4, Axis};
use serde::{Deserialize, Serialize};

use crate::decision::{assess, Assessment, FULL_CONFIDENCE_AREA};
use crate::decode::{decode, RawOutputs, ResolvedOutputs};
use crate::mask::synthesize;
use crate::nms::non_max_suppression;
use crate::{DetectError, Result};

/// Error type a backend may surface; boxed so backends keep their own enums.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The only thing the pipeline knows about the model: one `(1, 3, H, W)`
/// input in, two untyped tensors out.
///
/// Implementations must be shareable across threads; the pipeline never
/// mutates the backend.
pub trait SegmentationBackend: Send + Sync {
    fn infer(&self, input: ArrayView4<f32>) -> std::result::Result<RawOutputs, BackendError>;
}

/// Thresholds for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Keep candidates whose objectness × class score is strictly above this.
    pub conf_threshold: f32,
    /// Suppress candidates overlapping a kept one at or above this IoU.
    pub iou_threshold: f32,
    /// Binarisation level for synthesized masks.
    pub mask_threshold: f32,
    /// Minimum mask area (pixels) for a positive verdict.
    pub min_area_pixels: usize,
    /// Mask area at which confidence reaches 1.0.
    pub full_confidence_area: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.4,
            iou_threshold: 0.5,
            mask_threshold: 0.5,
            min_area_pixels: 1000,
            full_confidence_area: FULL_CONFIDENCE_AREA,
        }
    }
}

/// Outcome of one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Binary canvas (0/1) at model input resolution; `None` if nothing
    /// cleared the confidence threshold.
    pub mask: Option<Array2<u8>>,
    pub is_pothole: bool,
    pub confidence: f64,
    pub area_pixels: usize,
    pub area_ratio: f64,
    /// Candidates that survived suppression.
    pub detections: usize,
}

impl Prediction {
    pub fn none() -> Self {
        Self::from_parts(None, Assessment::NONE, 0)
    }

    fn from_parts(mask: Option<Array2<u8>>, a: Assessment, detections: usize) -> Self {
        Self {
            mask,
            is_pothole: a.is_pothole,
            confidence: a.confidence,
            area_pixels: a.area_pixels,
            area_ratio: a.area_ratio,
            detections,
        }
    }

    pub fn assessment(&self) -> Assessment {
        Assessment {
            is_pothole: self.is_pothole,
            confidence: self.confidence,
            area_pixels: self.area_pixels,
            area_ratio: self.area_ratio,
        }
    }

    /// `(mask, is_pothole, confidence, area_pixels, area_ratio)`.
    pub fn into_tuple(self) -> (Option<Array2<u8>>, bool, f64, usize, f64) {
        (
            self.mask,
            self.is_pothole,
            self.confidence,
            self.area_pixels,
            self.area_ratio,
        )
    }
}

/// Stateless apart from its thresholds; one instance can serve any number
/// of concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `backend` on `input` (`(1, 3, H, W)`) and post-process the result
    /// onto an `H × W` canvas.
    pub fn run<B>(&self, backend: &B, input: ArrayView4<f32>) -> Result<Prediction>
    where
        B: SegmentationBackend + ?Sized,
    {
        let (n, c, h, w) = input.dim();
        if n != 1 {
            return Err(DetectError::Batch(n));
        }
        if c != 3 {
            return Err(DetectError::InvalidChannels(c));
        }
        let raw = backend.infer(input).map_err(DetectError::Backend)?;
        self.postprocess(raw, (h, w))
    }

    /// decode → suppress → synthesize → assess.
    pub fn postprocess(&self, raw: RawOutputs, canvas: (usize, usize)) -> Result<Prediction> {
        let cfg = &self.config;
        let resolved = ResolvedOutputs::resolve(raw)?;
        let Some(decoded) = decode(resolved, cfg.conf_threshold) else {
            debug!("no candidate above {}", cfg.conf_threshold);
            return Ok(Prediction::none());
        };

        let keep = non_max_suppression(
            decoded.boxes.view(),
            decoded.scores.view(),
            cfg.iou_threshold,
        );
        let boxes = decoded.boxes.select(Axis(0), &keep);
        let coeffs = decoded.mask_coeffs.select(Axis(0), &keep);

        let mask = synthesize(
            coeffs.view(),
            decoded.prototypes.view(),
            boxes.view(),
            canvas,
            cfg.mask_threshold,
        )?;
        let a = assess(mask.view(), cfg.min_area_pixels, cfg.full_confidence_area);
        info!(
            "{} detections, area {} px ({:.4}), confidence {:.3}, pothole: {}",
            keep.len(),
            a.area_pixels,
            a.area_ratio,
            a.confidence,
            a.is_pothole
        );
        Ok(Prediction::from_parts(Some(mask), a, keep.len()))
    }
}
