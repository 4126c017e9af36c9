//! Area-based verdict: is the synthesized mask big enough to be a pothole?

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Pixels of mask area at which confidence saturates at 1.0.
pub const FULL_CONFIDENCE_AREA: usize = 5000;

/// What the mask's area says about the photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub is_pothole: bool,
    pub confidence: f64,
    pub area_pixels: usize,
    pub area_ratio: f64,
}

impl Assessment {
    /// The negative result reported when nothing was detected.
    pub const NONE: Self = Self {
        is_pothole: false,
        confidence: 0.0,
        area_pixels: 0,
        area_ratio: 0.0,
    };
}

/// `min(area / full_area, 1.0)`, a linear ramp capped at one.
pub fn area_confidence(area_pixels: usize, full_confidence_area: usize) -> f64 {
    if full_confidence_area == 0 {
        return if area_pixels > 0 { 1.0 } else { 0.0 };
    }
    (area_pixels as f64 / full_confidence_area as f64).min(1.0)
}

/// Score a final mask. Nonzero pixels count as foreground.
pub fn assess(mask: ArrayView2<u8>, min_area_pixels: usize, full_confidence_area: usize) -> Assessment {
    let area_pixels = mask.iter().filter(|&&v| v != 0).count();
    let total = mask.len();
    let area_ratio = if total == 0 {
        0.0
    } else {
        area_pixels as f64 / total as f64
    };
    Assessment {
        is_pothole: area_pixels >= min_area_pixels,
        confidence: area_confidence(area_pixels, full_confidence_area),
        area_pixels,
        area_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array2};

    #[test]
    fn fifty_by_fifty_on_640_canvas() {
        let mut mask = Array2::<u8>::zeros((640, 640));
        mask.slice_mut(s![100..150, 200..250]).fill(1);
        let a = assess(mask.view(), 2500, FULL_CONFIDENCE_AREA);
        assert_eq!(a.area_pixels, 2500);
        assert_eq!(a.area_ratio, 2500.0 / (640.0 * 640.0));
        assert!((a.area_ratio - 0.0061).abs() < 1e-4);
        assert_eq!(a.confidence, 0.5);
        assert!(a.is_pothole);

        let strict = assess(mask.view(), 2501, FULL_CONFIDENCE_AREA);
        assert!(!strict.is_pothole);
    }

    #[test]
    fn confidence_ramp_is_monotone_and_capped() {
        let mut prev = 0.0;
        for area in (0..20_000).step_by(250) {
            let c = area_confidence(area, FULL_CONFIDENCE_AREA);
            assert!(c >= prev);
            assert!(c <= 1.0);
            if area < FULL_CONFIDENCE_AREA {
                assert_eq!(c, area as f64 / 5000.0);
            }
            prev = c;
        }
        assert_eq!(area_confidence(7000, FULL_CONFIDENCE_AREA), 1.0);
    }

    #[test]
    fn empty_mask() {
        let mask = Array2::<u8>::zeros((8, 8));
        let a = assess(mask.view(), 1, FULL_CONFIDENCE_AREA);
        assert_eq!(a.area_pixels, 0);
        assert_eq!(a.area_ratio, 0.0);
        assert!(!a.is_pothole);
    }
}
