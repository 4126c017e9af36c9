//! Box geometry: center/corner conversion and batched IoU.
//!
//! Boxes are stored one per row in an `(N, 4)` array. The model emits
//! center form `[cx, cy, w, h]`; suppression and cropping work on corner
//! form `[x1, y1, x2, y2]`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

/// Added to every IoU denominator so two zero-area boxes give 0, not NaN.
pub const IOU_EPS: f32 = 1e-6;

/// Center form `[cx, cy, w, h]` → corner form `[x1, y1, x2, y2]`, row-wise.
pub fn xywh_to_xyxy(boxes: ArrayView2<f32>) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros(boxes.raw_dim());
    Zip::from(out.rows_mut())
        .and(boxes.rows())
        .for_each(|mut dst, src| {
            let (half_w, half_h) = (src[2] / 2.0, src[3] / 2.0);
            dst[0] = src[0] - half_w;
            dst[1] = src[1] - half_h;
            dst[2] = src[0] + half_w;
            dst[3] = src[1] + half_h;
        });
    out
}

/// Corner form back to center form. Inverse of [`xywh_to_xyxy`].
pub fn xyxy_to_xywh(boxes: ArrayView2<f32>) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros(boxes.raw_dim());
    Zip::from(out.rows_mut())
        .and(boxes.rows())
        .for_each(|mut dst, src| {
            dst[0] = (src[0] + src[2]) / 2.0;
            dst[1] = (src[1] + src[3]) / 2.0;
            dst[2] = src[2] - src[0];
            dst[3] = src[3] - src[1];
        });
    out
}

/// Area of a corner-form box. Inverted boxes yield a negative area, same
/// as the plain product would.
#[inline]
pub fn area(b: ArrayView1<f32>) -> f32 {
    (b[2] - b[0]) * (b[3] - b[1])
}

/// IoU of one corner-form `bx` against every row of `boxes`.
///
/// The overlap rectangle is clipped to non-negative width and height and
/// the denominator carries [`IOU_EPS`], so degenerate boxes never fault.
pub fn iou(bx: ArrayView1<f32>, boxes: ArrayView2<f32>) -> Array1<f32> {
    let area_a = area(bx);
    boxes
        .axis_iter(Axis(0))
        .map(|b| {
            let iw = (bx[2].min(b[2]) - bx[0].max(b[0])).max(0.0);
            let ih = (bx[3].min(b[3]) - bx[1].max(b[1])).max(0.0);
            let inter = iw * ih;
            inter / (area_a + area(b) - inter + IOU_EPS)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn center_to_corner_is_exact() {
        let b = array![[10.0f32, 20.0, 4.0, 6.0], [0.0, 0.0, 0.0, 0.0]];
        let c = xywh_to_xyxy(b.view());
        assert_eq!(c, array![[8.0f32, 17.0, 12.0, 23.0], [0.0, 0.0, 0.0, 0.0]]);
    }

    #[test]
    fn conversion_round_trips() {
        let b = array![
            [320.5f32, 100.25, 50.0, 12.5],
            [3.0, 4.0, 1.0, 1.0],
            [600.0, 639.0, 80.0, 2.0],
        ];
        let back = xyxy_to_xywh(xywh_to_xyxy(b.view()).view());
        for (x, y) in b.iter().zip(back.iter()) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }

    #[test]
    fn self_iou_is_one() {
        let b = array![[5.0f32, 5.0, 55.0, 25.0]];
        let v = iou(b.row(0), b.view());
        assert!((v[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn disjoint_and_partial_overlap() {
        let a = array![0.0f32, 0.0, 10.0, 10.0];
        let others = array![[20.0f32, 20.0, 30.0, 30.0], [5.0, 0.0, 15.0, 10.0]];
        let v = iou(a.view(), others.view());
        assert_eq!(v[0], 0.0);
        // 50 / (100 + 100 - 50)
        assert!((v[1] - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn zero_area_boxes_do_not_divide_by_zero() {
        let a = array![3.0f32, 3.0, 3.0, 3.0];
        let v = iou(a.view(), a.clone().insert_axis(Axis(0)).view());
        assert!(v[0].is_finite());
        assert_eq!(v[0], 0.0);
    }

    #[test]
    fn empty_batch_gives_empty_result() {
        let a = array![0.0f32, 0.0, 1.0, 1.0];
        let none = Array2::<f32>::zeros((0, 4));
        assert!(iou(a.view(), none.view()).is_empty());
    }
}
