//! Raw output decoding for a single-class YOLOv8-seg head.
//!
//! The runtime hands back two tensors in no guaranteed order:
//!
//! * detections `[1, N, 4+1+C+M]` (or the column-major export `[1, 4+1+C+M, N]`)
//! * prototypes `[1, M, H, W]`
//!
//! [`ResolvedOutputs::resolve`] tells them apart by rank exactly once, after
//! which everything downstream reads the named fields.

use log::{debug, warn};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayD, Axis, Ix3, Ix4};

use crate::geometry::xywh_to_xyxy;
use crate::{DetectError, Result};

/// The head is trained on potholes only.
pub const NUM_CLASSES: usize = 1;

const BOX_COLS: usize = 4;
const OBJECTNESS_COL: usize = 4;
const CLASS_START: usize = 5;
const COEFF_START: usize = CLASS_START + NUM_CLASSES;

/// Number of features per candidate for a head with `mask_dim` prototypes.
pub const fn feature_count(mask_dim: usize) -> usize {
    COEFF_START + mask_dim
}

/// The two untyped tensors exactly as the backend returned them.
#[derive(Debug, Clone)]
pub struct RawOutputs(pub ArrayD<f32>, pub ArrayD<f32>);

/// One raw output after its role has been identified by rank.
#[derive(Debug)]
pub enum OutputTensor {
    /// Rank 3: `[batch, rows, cols]`.
    Detections(Array3<f32>),
    /// Rank 4: `[batch, M, H, W]`.
    Prototypes(Array4<f32>),
}

impl OutputTensor {
    pub fn classify(t: ArrayD<f32>) -> Result<Self> {
        match t.ndim() {
            3 => Ok(Self::Detections(t.into_dimensionality::<Ix3>()?)),
            4 => Ok(Self::Prototypes(t.into_dimensionality::<Ix4>()?)),
            _ => Err(DetectError::Rank(t.shape().to_vec())),
        }
    }
}

/// Batch-stripped outputs with roles settled.
///
/// Only [`ResolvedOutputs::resolve`] builds one, so the detection width
/// always equals `feature_count(M)` for the prototypes it carries.
#[derive(Debug, Clone)]
pub struct ResolvedOutputs {
    detections: Array2<f32>,
    prototypes: Array3<f32>,
}

impl ResolvedOutputs {
    /// One candidate per row, `4 + 1 + C + M` columns.
    pub fn detections(&self) -> &Array2<f32> {
        &self.detections
    }

    /// `M` basis masks of `H × W`.
    pub fn prototypes(&self) -> &Array3<f32> {
        &self.prototypes
    }

    pub fn resolve(raw: RawOutputs) -> Result<Self> {
        let (det, proto) = match (OutputTensor::classify(raw.0)?, OutputTensor::classify(raw.1)?) {
            (OutputTensor::Detections(d), OutputTensor::Prototypes(p)) => (d, p),
            (OutputTensor::Prototypes(p), OutputTensor::Detections(d)) => {
                debug!("output order swapped: prototypes came first");
                (d, p)
            }
            (a, b) => {
                let shapes = |t: &OutputTensor| match t {
                    OutputTensor::Detections(d) => d.shape().to_vec(),
                    OutputTensor::Prototypes(p) => p.shape().to_vec(),
                };
                return Err(DetectError::AmbiguousOutputs(shapes(&a), shapes(&b)));
            }
        };

        if det.len_of(Axis(0)) != 1 {
            return Err(DetectError::Batch(det.len_of(Axis(0))));
        }
        if proto.len_of(Axis(0)) != 1 {
            return Err(DetectError::Batch(proto.len_of(Axis(0))));
        }
        let prototypes = proto.index_axis_move(Axis(0), 0);
        let det = det.index_axis_move(Axis(0), 0);

        let features = feature_count(prototypes.len_of(Axis(0)));
        let (rows, cols) = det.dim();
        let detections = if cols == features {
            det
        } else if rows == features {
            debug!("detections are column-major ({rows}×{cols}), transposing");
            det.reversed_axes().as_standard_layout().into_owned()
        } else {
            warn!(
                "detection tensor {rows}×{cols} does not carry {features} features per candidate"
            );
            return Err(DetectError::Shape {
                expected: features,
                found: vec![rows, cols],
            });
        };

        debug!(
            "resolved {} candidates, {} prototypes of {}×{}",
            detections.nrows(),
            prototypes.len_of(Axis(0)),
            prototypes.len_of(Axis(1)),
            prototypes.len_of(Axis(2)),
        );
        Ok(Self {
            detections,
            prototypes,
        })
    }
}

/// Candidates that cleared the confidence threshold.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Corner form `[x1, y1, x2, y2]`, one row per candidate.
    pub boxes: Array2<f32>,
    /// objectness × class score.
    pub scores: Array1<f32>,
    /// `K × M`, row `i` weights the prototypes for candidate `i`.
    pub mask_coeffs: Array2<f32>,
    pub prototypes: Array3<f32>,
}

impl Decoded {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Score, filter and convert resolved outputs.
///
/// Returns `None` when no candidate scores strictly above `conf_threshold`,
/// including the zero-row case. NaN scores never pass.
pub fn decode(outputs: ResolvedOutputs, conf_threshold: f32) -> Option<Decoded> {
    let det = outputs.detections.view();
    let mask_dim = outputs.prototypes.len_of(Axis(0));

    let scores = &det.column(OBJECTNESS_COL) * &det.column(CLASS_START);
    let keep: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s > conf_threshold)
        .map(|(i, _)| i)
        .collect();

    debug!("{} / {} candidates above {conf_threshold}", keep.len(), det.nrows());
    if keep.is_empty() {
        return None;
    }

    let boxes = det.slice(s![.., ..BOX_COLS]).select(Axis(0), &keep);
    let mask_coeffs = det
        .slice(s![.., COEFF_START..COEFF_START + mask_dim])
        .select(Axis(0), &keep);

    Some(Decoded {
        boxes: xywh_to_xyxy(boxes.view()),
        scores: scores.select(Axis(0), &keep),
        mask_coeffs,
        prototypes: outputs.prototypes,
    })
}

/// [`ResolvedOutputs::resolve`] followed by [`decode`].
pub fn decode_raw(raw: RawOutputs, conf_threshold: f32) -> Result<Option<Decoded>> {
    Ok(decode(ResolvedOutputs::resolve(raw)?, conf_threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    const M: usize = 2;

    /// Build `[1, N, 4+1+1+M]` from rows of (cx, cy, w, h, obj, cls, coeffs...).
    fn det_tensor(rows: &[[f32; 8]]) -> ArrayD<f32> {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Array::from_shape_vec(IxDyn(&[1, rows.len(), 8]), flat).unwrap()
    }

    fn proto_tensor() -> ArrayD<f32> {
        Array4::<f32>::zeros((1, M, 4, 4)).into_dyn()
    }

    #[test]
    fn resolves_either_order() {
        let det = det_tensor(&[[1.0, 1.0, 2.0, 2.0, 0.9, 0.9, 0.1, 0.2]]);
        let a = ResolvedOutputs::resolve(RawOutputs(det.clone(), proto_tensor())).unwrap();
        let b = ResolvedOutputs::resolve(RawOutputs(proto_tensor(), det)).unwrap();
        assert_eq!(a.detections, b.detections);
        assert_eq!(a.detections.dim(), (1, 8));
        assert_eq!(a.prototypes.dim(), (M, 4, 4));
    }

    #[test]
    fn column_major_detections_are_transposed() {
        let row_major = det_tensor(&[
            [1.0, 1.0, 2.0, 2.0, 0.9, 0.9, 0.1, 0.2],
            [5.0, 5.0, 2.0, 2.0, 0.5, 0.5, 0.3, 0.4],
        ]);
        let col_major = row_major
            .clone()
            .into_dimensionality::<Ix3>()
            .unwrap()
            .permuted_axes([0, 2, 1])
            .as_standard_layout()
            .into_owned()
            .into_dyn();
        let a = ResolvedOutputs::resolve(RawOutputs(row_major, proto_tensor())).unwrap();
        let b = ResolvedOutputs::resolve(RawOutputs(col_major, proto_tensor())).unwrap();
        assert_eq!(a.detections, b.detections);
    }

    #[test]
    fn rejects_bad_rank_and_shape() {
        let flat = Array::<f32, _>::zeros(IxDyn(&[10]));
        assert!(matches!(
            ResolvedOutputs::resolve(RawOutputs(flat, proto_tensor())),
            Err(DetectError::Rank(_))
        ));

        let wrong_cols = Array::<f32, _>::zeros(IxDyn(&[1, 3, 7]));
        assert!(matches!(
            ResolvedOutputs::resolve(RawOutputs(wrong_cols, proto_tensor())),
            Err(DetectError::Shape { expected: 8, .. })
        ));

        let two_dets = det_tensor(&[[0.0; 8]]);
        assert!(matches!(
            ResolvedOutputs::resolve(RawOutputs(two_dets.clone(), two_dets)),
            Err(DetectError::AmbiguousOutputs(..))
        ));

        let batched = Array::<f32, _>::zeros(IxDyn(&[2, 3, 8]));
        assert!(matches!(
            ResolvedOutputs::resolve(RawOutputs(batched, proto_tensor())),
            Err(DetectError::Batch(2))
        ));
    }

    #[test]
    fn short_rows_never_reach_decoding() {
        // four box columns only, nothing for scores or coefficients
        let short = Array::<f32, _>::from_elem(IxDyn(&[1, 2, 4]), 0.9);
        assert!(matches!(
            decode_raw(RawOutputs(short, proto_tensor()), 0.4),
            Err(DetectError::Shape { expected: 8, .. })
        ));

        let wide = Array::<f32, _>::from_elem(IxDyn(&[1, 2, 9]), 0.9);
        assert!(matches!(
            decode_raw(RawOutputs(wide, proto_tensor()), 0.4),
            Err(DetectError::Shape { expected: 8, .. })
        ));
    }

    #[test]
    fn zero_rows_is_no_detection() {
        let empty = Array::<f32, _>::zeros(IxDyn(&[1, 0, 8]));
        let out = decode_raw(RawOutputs(empty, proto_tensor()), 0.4).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn scores_are_objectness_times_class() {
        let det = det_tensor(&[
            [10.0, 10.0, 4.0, 4.0, 0.9, 0.8, 0.1, 0.2], // 0.72
            [20.0, 20.0, 4.0, 4.0, 0.5, 0.8, 0.3, 0.4], // 0.40, not strictly above
            [30.0, 30.0, 4.0, 4.0, 1.0, 0.41, 0.5, 0.6], // 0.41
        ]);
        let d = decode_raw(RawOutputs(det, proto_tensor()), 0.4)
            .unwrap()
            .unwrap();
        assert_eq!(d.len(), 2);
        assert!((d.scores[0] - 0.72).abs() < 1e-6);
        assert!((d.scores[1] - 0.41).abs() < 1e-6);
        assert!(d.scores.iter().all(|&s| s > 0.4));
        assert_eq!(d.boxes.row(0).to_vec(), vec![8.0, 8.0, 12.0, 12.0]);
        assert_eq!(d.mask_coeffs.row(1).to_vec(), vec![0.5, 0.6]);
        assert_eq!(d.mask_coeffs.ncols(), M);
    }

    #[test]
    fn all_below_threshold_is_none() {
        let det = det_tensor(&[
            [10.0, 10.0, 4.0, 4.0, 0.5, 0.8, 0.1, 0.2],
            [10.0, 10.0, 4.0, 4.0, f32::NAN, 1.0, 0.1, 0.2],
        ]);
        assert!(decode_raw(RawOutputs(det, proto_tensor()), 0.4)
            .unwrap()
            .is_none());
    }
}
