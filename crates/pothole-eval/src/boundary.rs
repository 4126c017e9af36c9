//! Boundary agreement between two masks.

use ndarray::{Array2, ArrayView2, Zip};

use crate::{check_shapes, Result, EPS};

/// Binary erosion with the 3×3 cross; pixels outside the image count as
/// background, so foreground touching the border is eroded.
pub fn erode(mask: ArrayView2<u8>) -> Array2<bool> {
    let (h, w) = mask.dim();
    let on = |y: usize, x: usize| mask[[y, x]] != 0;
    Array2::from_shape_fn((h, w), |(y, x)| {
        on(y, x)
            && y > 0
            && x > 0
            && y + 1 < h
            && x + 1 < w
            && on(y - 1, x)
            && on(y + 1, x)
            && on(y, x - 1)
            && on(y, x + 1)
    })
}

/// Foreground pixels that do not survive erosion.
pub fn boundary(mask: ArrayView2<u8>) -> Array2<bool> {
    let mut edge = erode(mask);
    Zip::from(&mut edge).and(mask).for_each(|e, &m| *e = (m != 0) ^ *e);
    edge
}

/// F1 of predicted vs ground-truth boundary pixels (exact pixel matches).
pub fn boundary_f1(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> Result<f64> {
    check_shapes(pred, gt)?;
    let (bp, bg) = (boundary(pred), boundary(gt));

    let (mut inter, mut np, mut ng) = (0usize, 0usize, 0usize);
    Zip::from(&bp).and(&bg).for_each(|&p, &g| {
        inter += (p && g) as usize;
        np += p as usize;
        ng += g as usize;
    });

    let precision = inter as f64 / (np as f64 + EPS);
    let recall = inter as f64 / (ng as f64 + EPS);
    Ok(2.0 * precision * recall / (precision + recall + EPS))
}
