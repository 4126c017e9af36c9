//! Caller-facing summary of a [`Prediction`], serialisable as JSON.

use serde::{Deserialize, Serialize};

use crate::pipeline::Prediction;

pub const ACCEPTED_MESSAGE: &str = "Thanks, your response has been recorded.";
pub const REJECTED_MESSAGE: &str = "Please click a genuine photo of a pothole or try again.";

/// Mask statistics. The area fields come from inference; the rest need
/// ground truth and are only filled in by offline evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_pixels: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dice: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_f1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub is_pothole: bool,
    pub confidence: f64,
    pub message: String,
    pub metrics: Option<SegmentationMetrics>,
}

impl From<&Prediction> for PredictionResponse {
    fn from(p: &Prediction) -> Self {
        if !p.is_pothole {
            return Self {
                is_pothole: false,
                confidence: p.confidence,
                message: REJECTED_MESSAGE.to_string(),
                metrics: None,
            };
        }
        Self {
            is_pothole: true,
            confidence: p.confidence,
            message: ACCEPTED_MESSAGE.to_string(),
            metrics: Some(SegmentationMetrics {
                area_pixels: Some(p.area_pixels),
                area_ratio: Some(p.area_ratio),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_has_no_metrics() {
        let r = PredictionResponse::from(&Prediction::none());
        assert!(!r.is_pothole);
        assert_eq!(r.message, REJECTED_MESSAGE);
        assert!(r.metrics.is_none());
    }

    #[test]
    fn accepted_carries_area_only() {
        let p = Prediction {
            mask: None,
            is_pothole: true,
            confidence: 0.5,
            area_pixels: 2500,
            area_ratio: 0.006,
            detections: 1,
        };
        let json = serde_json::to_value(PredictionResponse::from(&p)).unwrap();
        assert_eq!(json["message"], ACCEPTED_MESSAGE);
        assert_eq!(json["metrics"]["area_pixels"], 2500);
        assert!(json["metrics"].get("iou").is_none());
    }
}
