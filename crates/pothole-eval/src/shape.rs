//! Crack/pothole length along the mask's principal axis.

use ndarray::ArrayView2;

use crate::EPS;

/// Extent of the foreground along its first principal component.
///
/// Pixel coordinates `(row, col)` are centred, the dominant eigenvector of
/// their 2×2 covariance is taken, and the spread of the projections onto it
/// is returned. Fewer than two foreground pixels give `0.0`.
pub fn major_axis_length(mask: ArrayView2<u8>) -> f64 {
    let coords: Vec<(f64, f64)> = mask
        .indexed_iter()
        .filter(|&(_, &v)| v != 0)
        .map(|((y, x), _)| (y as f64, x as f64))
        .collect();
    if coords.len() < 2 {
        return 0.0;
    }

    let n = coords.len() as f64;
    let (my, mx) = coords
        .iter()
        .fold((0.0, 0.0), |(sy, sx), &(y, x)| (sy + y, sx + x));
    let (my, mx) = (my / n, mx / n);

    let (mut syy, mut sxx, mut sxy) = (0.0, 0.0, 0.0);
    for &(y, x) in &coords {
        let (dy, dx) = (y - my, x - mx);
        syy += dy * dy;
        sxx += dx * dx;
        sxy += dy * dx;
    }

    let (vy, vx) = principal_axis(syy, sxy, sxx);
    let (lo, hi) = coords.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &(y, x)| {
        let p = (y - my) * vy + (x - mx) * vx;
        (lo.min(p), hi.max(p))
    });
    hi - lo
}

/// Unit eigenvector for the larger eigenvalue of `[[a, b], [b, c]]`.
fn principal_axis(a: f64, b: f64, c: f64) -> (f64, f64) {
    if b.abs() < f64::EPSILON {
        return if a >= c { (1.0, 0.0) } else { (0.0, 1.0) };
    }
    let half_trace = (a + c) / 2.0;
    let lambda = half_trace + (((a - c) / 2.0).powi(2) + b * b).sqrt();
    let (vy, vx) = (lambda - c, b);
    let norm = (vy * vy + vx * vx).sqrt();
    (vy / norm, vx / norm)
}

pub fn length_error(pred: ArrayView2<u8>, gt: ArrayView2<u8>) -> f64 {
    let gt_len = major_axis_length(gt);
    (major_axis_length(pred) - gt_len).abs() / (gt_len + EPS)
}
