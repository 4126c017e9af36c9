//! Mask synthesis: coefficients × prototypes → one binary canvas.
//!
//! Each surviving candidate's mask is the linear combination of the shared
//! prototype basis, upsampled bilinearly to the canvas, binarised and
//! OR-ed into the canvas inside that candidate's box only.

use std::ops::Range;

use log::debug;
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use crate::{DetectError, Result};

/// Sampling table for one axis of a half-pixel-centred bilinear resize
/// (the convention OpenCV's `INTER_LINEAR` uses). The `resize` crate's
/// triangle filter widens its support when shrinking, so it is not used here.
struct AxisMap {
    lo: Vec<usize>,
    hi: Vec<usize>,
    frac: Vec<f32>,
}

impl AxisMap {
    fn new(src: usize, dst: usize) -> Self {
        let scale = src as f32 / dst as f32;
        let last = src.saturating_sub(1);
        let mut map = Self {
            lo: Vec::with_capacity(dst),
            hi: Vec::with_capacity(dst),
            frac: Vec::with_capacity(dst),
        };
        for d in 0..dst {
            let f = (d as f32 + 0.5) * scale - 0.5;
            let (lo, hi, t) = if f <= 0.0 {
                (0, 0, 0.0)
            } else {
                let i = f.floor() as usize;
                if i >= last {
                    (last, last, 0.0)
                } else {
                    (i, i + 1, f - i as f32)
                }
            };
            map.lo.push(lo);
            map.hi.push(hi);
            map.frac.push(t);
        }
        map
    }
}

/// Bilinear resampler from one fixed source size to one fixed target size.
struct Bilinear {
    rows: AxisMap,
    cols: AxisMap,
}

impl Bilinear {
    fn new(src: (usize, usize), dst: (usize, usize)) -> Self {
        Self {
            rows: AxisMap::new(src.0, dst.0),
            cols: AxisMap::new(src.1, dst.1),
        }
    }

    /// Evaluate `src` on the target grid over `ys × xs`, calling `f(y, x, v)`
    /// for every target pixel in the window.
    fn for_each_in(
        &self,
        src: ArrayView2<f32>,
        ys: Range<usize>,
        xs: Range<usize>,
        mut f: impl FnMut(usize, usize, f32),
    ) {
        let w = src.ncols();
        let mut blended = vec![0.0f32; w];
        for y in ys {
            let (r0, r1, ty) = (self.rows.lo[y], self.rows.hi[y], self.rows.frac[y]);
            let (a, b) = (src.row(r0), src.row(r1));
            for ((dst, &p), &q) in blended.iter_mut().zip(a.iter()).zip(b.iter()) {
                *dst = p + (q - p) * ty;
            }
            for x in xs.clone() {
                let (c0, c1, tx) = (self.cols.lo[x], self.cols.hi[x], self.cols.frac[x]);
                let v = blended[c0] + (blended[c1] - blended[c0]) * tx;
                f(y, x, v);
            }
        }
    }
}

/// Integer pixel window of a corner-form box on an `(h, w)` canvas.
///
/// Corners truncate toward zero, then clamp to the canvas, so boxes hanging
/// off the edge are cut and inverted boxes produce an empty window.
pub fn box_window(b: [f32; 4], (h, w): (usize, usize)) -> (Range<usize>, Range<usize>) {
    let clamp = |v: f32, hi: usize| (v as i64).clamp(0, hi as i64) as usize;
    let (x1, y1) = (clamp(b[0], w), clamp(b[1], h));
    let (x2, y2) = (clamp(b[2], w), clamp(b[3], h));
    (y1..y2.max(y1), x1..x2.max(x1))
}

/// Build the final binary mask (values 0 or 1) of shape `out_shape`.
///
/// * `mask_coeffs`: `K × M`
/// * `prototypes`: `M × H × W`
/// * `boxes`: `K × 4` corner form, in canvas pixels
///
/// `K = 0` yields an all-zero canvas.
pub fn synthesize(
    mask_coeffs: ArrayView2<f32>,
    prototypes: ArrayView3<f32>,
    boxes: ArrayView2<f32>,
    out_shape: (usize, usize),
    threshold: f32,
) -> Result<Array2<u8>> {
    let (m, h, w) = prototypes.dim();
    let k = mask_coeffs.nrows();
    if mask_coeffs.ncols() != m {
        return Err(DetectError::Coefficients {
            coeffs: mask_coeffs.ncols(),
            prototypes: m,
        });
    }
    if boxes.nrows() != k || boxes.ncols() != 4 {
        return Err(DetectError::Shape {
            expected: 4,
            found: boxes.shape().to_vec(),
        });
    }

    let mut canvas = Array2::<u8>::zeros(out_shape);
    if k == 0 || h == 0 || w == 0 {
        return Ok(canvas);
    }

    let basis = prototypes.to_shape((m, h * w))?;
    let raw = mask_coeffs.dot(&basis).into_shape_with_order((k, h, w))?;
    let sampler = Bilinear::new((h, w), out_shape);

    for (i, (proto_mask, b)) in raw.axis_iter(Axis(0)).zip(boxes.rows()).enumerate() {
        let (ys, xs) = box_window([b[0], b[1], b[2], b[3]], out_shape);
        debug!("candidate {i}: rows {ys:?} cols {xs:?}");
        sampler.for_each_in(proto_mask, ys, xs, |y, x, v| {
            if v > threshold {
                canvas[[y, x]] = 1;
            }
        });
    }
    Ok(canvas)
}
