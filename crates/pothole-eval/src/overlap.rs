//! Pixel-overlap metrics.

use ndarray::{ArrayView2, Zip};

use crate::{check_shapes, count, Result, EPS};

/// `(|P ∧ G|, |P ∨ G|)`
fn intersection_union(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> (usize, usize) {
    let (mut inter, mut union) = (0usize, 0usize);
    Zip::from(pred).and(gt).for_each(|&p, &g| {
        let (p, g) = (p != 0, g != 0);
        inter += (p && g) as usize;
        union += (p || g) as usize;
    });
    (inter, union)
}

pub fn mask_iou(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> Result<f64> {
    check_shapes(pred, gt)?;
    let (inter, union) = intersection_union(pred, gt);
    Ok(inter as f64 / (union as f64 + EPS))
}

pub fn dice_score(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> Result<f64> {
    check_shapes(pred, gt)?;
    let (inter, _) = intersection_union(pred, gt);
    Ok(2.0 * inter as f64 / (count(pred) as f64 + count(gt) as f64 + EPS))
}

/// Relative area error `||P| - |G|| / |G|`.
pub fn area_error(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> f64 {
    let (p, g) = (count(pred) as f64, count(gt) as f64);
    (p - g).abs() / (g + EPS)
}

/// Same rule the live decision uses: enough foreground pixels.
pub fn is_genuine_pothole(mask: ArrayView2<u8>, min_area_pixels: usize) -> bool {
    count(mask) >= min_area_pixels
}
