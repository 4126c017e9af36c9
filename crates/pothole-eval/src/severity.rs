//! Depth-weighted severity and how well it ranks potholes.

use ndarray::{ArrayView2, Zip};

use crate::{EvalError, Result};

/// `|M| × mean depth over M`; `0.0` for an empty mask.
pub fn severity_score(mask: ArrayView2<u8>, depth: ArrayView2<f32>) -> Result<f64> {
    if mask.dim() != depth.dim() {
        return Err(EvalError::ShapeMismatch(mask.dim(), depth.dim()));
    }
    let (mut n, mut sum) = (0usize, 0.0f64);
    Zip::from(mask).and(depth).for_each(|&m, &d| {
        if m != 0 {
            n += 1;
            sum += d as f64;
        }
    });
    if n == 0 {
        return Ok(0.0);
    }
    Ok(n as f64 * (sum / n as f64))
}

/// Ranks starting at 1; ties share the mean of the ranks they span.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation between predicted and reference severities.
///
/// `None` when it is undefined: fewer than two samples, or either side has
/// all-equal values.
pub fn severity_rank_correlation(pred: &[f64], gt: &[f64]) -> Result<Option<f64>> {
    if pred.len() != gt.len() {
        return Err(EvalError::LengthMismatch(pred.len(), gt.len()));
    }
    if pred.len() < 2 {
        return Ok(None);
    }
    let (rp, rg) = (average_ranks(pred), average_ranks(gt));
    let n = rp.len() as f64;
    let (mp, mg) = (rp.iter().sum::<f64>() / n, rg.iter().sum::<f64>() / n);

    let (mut cov, mut vp, mut vg) = (0.0, 0.0, 0.0);
    for (&a, &b) in rp.iter().zip(&rg) {
        cov += (a - mp) * (b - mg);
        vp += (a - mp).powi(2);
        vg += (b - mg).powi(2);
    }
    if vp == 0.0 || vg == 0.0 {
        return Ok(None);
    }
    Ok(Some(cov / (vp * vg).sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array2};

    #[test]
    fn severity_is_area_times_mean_depth() {
        let mut mask = Array2::<u8>::zeros((6, 6));
        mask.slice_mut(s![0..2, 0..2]).fill(1);
        let mut depth = Array2::<f32>::from_elem((6, 6), 9.0);
        depth.slice_mut(s![0..2, 0..2]).assign(&ndarray::array![[1.0, 2.0], [3.0, 4.0]]);
        let s = severity_score(mask.view(), depth.view()).unwrap();
        assert!((s - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_mask_has_no_severity() {
        let mask = Array2::<u8>::zeros((3, 3));
        let depth = Array2::<f32>::ones((3, 3));
        assert_eq!(severity_score(mask.view(), depth.view()).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_depth_map() {
        let mask = Array2::<u8>::zeros((3, 3));
        let depth = Array2::<f32>::ones((3, 4));
        assert!(severity_score(mask.view(), depth.view()).is_err());
    }

    #[test]
    fn ties_get_average_rank() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
    }

    #[test]
    fn perfect_and_inverse_ordering() {
        let gt = [1.0, 2.0, 3.0, 4.0];
        let same = severity_rank_correlation(&[10.0, 20.0, 30.0, 45.0], &gt).unwrap();
        let flipped = severity_rank_correlation(&[4.0, 3.0, 2.0, 1.0], &gt).unwrap();
        assert!((same.unwrap() - 1.0).abs() < 1e-12);
        assert!((flipped.unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_cases() {
        assert_eq!(severity_rank_correlation(&[1.0], &[2.0]).unwrap(), None);
        assert_eq!(
            severity_rank_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap(),
            None
        );
        assert!(severity_rank_correlation(&[1.0, 2.0], &[1.0]).is_err());
    }
}
