//! Greedy single-class non-maximum suppression.

use log::debug;
use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::geometry::iou;

/// Indices of the boxes to keep, highest score first.
///
/// Candidates are visited in descending score order; each kept box drops
/// every remaining box whose IoU with it is `>= iou_threshold`. The sort is
/// stable, so equal scores keep their original row order.
pub fn non_max_suppression(
    boxes: ArrayView2<f32>,
    scores: ArrayView1<f32>,
    iou_threshold: f32,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut keep = Vec::with_capacity(order.len());
    while let Some((&best, rest)) = order.split_first() {
        keep.push(best);
        if rest.is_empty() {
            break;
        }
        let overlaps = iou(boxes.row(best), boxes.select(Axis(0), rest).view());
        order = rest
            .iter()
            .zip(overlaps.iter())
            .filter(|&(_, &o)| o < iou_threshold)
            .map(|(&i, _)| i)
            .collect();
    }

    debug!("nms kept {} / {} boxes", keep.len(), scores.len());
    keep
}
