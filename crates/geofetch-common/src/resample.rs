//! 1-D coordinate interpolation and nearest-neighbour mask zoom used when
//! changing a domain's resolution.

use ndarray::Array2;

/// Linear interpolation of `(xp, fp)` at each of `x`, extrapolating beyond
/// the first and last sample with the slope of the end segments.
///
/// `xp` must be strictly increasing and hold at least two samples; callers
/// handle the single-sample case themselves.
pub fn interp1d_extrapolate(xp: &[f64], fp: &[f64], x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(xp.len() >= 2);

    let last = xp.len() - 1;
    x.iter()
        .map(|&xi| {
            // index of the segment [xp[i], xp[i+1]] used for xi
            let i = match xp.partition_point(|&v| v <= xi) {
                0 => 0,
                n if n > last => last - 1,
                n => n - 1,
            };
            let (x0, x1) = (xp[i], xp[i + 1]);
            let (y0, y1) = (fp[i], fp[i + 1]);
            y0 + (xi - x0) * (y1 - y0) / (x1 - x0)
        })
        .collect()
}

/// Nearest-neighbour zoom of a boolean mask to `shape` (height, width).
///
/// Each output pixel takes the value of the input pixel its centre falls in,
/// so an integer zoom factor replicates every input pixel exactly.
pub fn zoom_nearest(mask: &Array2<bool>, shape: (usize, usize)) -> Array2<bool> {
    let (in_h, in_w) = mask.dim();
    let (out_h, out_w) = shape;
    if in_h == 0 || in_w == 0 {
        return Array2::from_elem(shape, true);
    }

    let row_scale = in_h as f64 / out_h as f64;
    let col_scale = in_w as f64 / out_w as f64;

    Array2::from_shape_fn(shape, |(row, col)| {
        let src_row = (((row as f64 + 0.5) * row_scale) as usize).min(in_h - 1);
        let src_col = (((col as f64 + 0.5) * col_scale) as usize).min(in_w - 1);
        mask[[src_row, src_col]]
    })
}
