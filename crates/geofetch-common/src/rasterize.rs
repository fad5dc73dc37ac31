//! Burning vector geometries into boolean pixel masks.
//!
//! Polygons are filled with an even-odd scanline through pixel centres, so
//! holes are respected. With `all_touched`, every pixel touched by a polygon
//! boundary is also set. Lines and points have no interior and always burn
//! the pixels they touch.

use ndarray::Array2;
use rayon::prelude::*;

use crate::{AffineTransform, Geometry, Position};

type PixelPoint = (f64, f64);
type Ring = Vec<PixelPoint>;

/// Geometry reduced to pixel space and split by how it is burned.
#[derive(Default)]
struct PixelShapes {
    polygons: Vec<Vec<Ring>>,
    paths: Vec<Vec<PixelPoint>>,
    points: Vec<PixelPoint>,
}

/// Rasterize `geometries` onto a grid of `shape` (height, width).
///
/// Returns `true` for pixels inside (or, with `all_touched`, touching) any
/// geometry.
pub fn rasterize(
    geometries: &[Geometry],
    shape: (usize, usize),
    transform: &AffineTransform,
    all_touched: bool,
) -> Array2<bool> {
    let (height, width) = shape;
    let mut mask = Array2::from_elem(shape, false);

    let mut shapes = PixelShapes::default();
    for geometry in geometries {
        if !collect_shapes(geometry, transform, &mut shapes) {
            return mask;
        }
    }

    let rows: Vec<Vec<bool>> = (0..height)
        .into_par_iter()
        .map(|row| fill_row(&shapes.polygons, row, width))
        .collect();
    for (row, values) in rows.into_iter().enumerate() {
        for (col, inside) in values.into_iter().enumerate() {
            if inside {
                mask[[row, col]] = true;
            }
        }
    }

    if all_touched {
        for polygon in &shapes.polygons {
            for ring in polygon {
                burn_path(&mut mask, ring);
            }
        }
    }
    for path in &shapes.paths {
        burn_path(&mut mask, path);
    }
    for &(col, row) in &shapes.points {
        if let Some(cell) = cell_of(col, row, height, width) {
            mask[cell] = true;
        }
    }

    mask
}

/// Convert a geometry to pixel space. Returns false if the transform cannot
/// be inverted.
fn collect_shapes(geometry: &Geometry, transform: &AffineTransform, out: &mut PixelShapes) -> bool {
    let to_pixel = |p: &Position| transform.coord_to_pixel(p.x, p.y);
    let convert =
        |ring: &[Position]| -> Option<Vec<PixelPoint>> { ring.iter().map(|p| to_pixel(p)).collect() };

    let converted = match geometry {
        Geometry::Point { coordinates } => to_pixel(coordinates).map(|p| out.points.push(p)),
        Geometry::MultiPoint { coordinates } => {
            convert(coordinates).map(|pts| out.points.extend(pts))
        }
        Geometry::LineString { coordinates } => convert(coordinates).map(|p| out.paths.push(p)),
        Geometry::MultiLineString { coordinates } => coordinates
            .iter()
            .map(|line| convert(line))
            .collect::<Option<Vec<_>>>()
            .map(|lines| out.paths.extend(lines)),
        Geometry::Polygon { coordinates } => coordinates
            .iter()
            .map(|ring| convert(ring))
            .collect::<Option<Vec<_>>>()
            .map(|rings| out.polygons.push(rings)),
        Geometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                let rings = polygon
                    .iter()
                    .map(|ring| convert(ring))
                    .collect::<Option<Vec<_>>>();
                match rings {
                    Some(rings) => out.polygons.push(rings),
                    None => return false,
                }
            }
            Some(())
        }
        Geometry::GeometryCollection { geometries } => {
            return geometries
                .iter()
                .all(|g| collect_shapes(g, transform, out));
        }
    };
    converted.is_some()
}

/// Pixels of one row whose centre lies inside any polygon.
fn fill_row(polygons: &[Vec<Ring>], row: usize, width: usize) -> Vec<bool> {
    let mut values = vec![false; width];
    let cy = row as f64 + 0.5;
    let mut crossings = Vec::new();

    for polygon in polygons {
        crossings.clear();
        for ring in polygon {
            for edge in ring.windows(2) {
                let (a, b) = (edge[0], edge[1]);
                if (a.1 <= cy) != (b.1 <= cy) {
                    crossings.push(a.0 + (cy - a.1) * (b.0 - a.0) / (b.1 - a.1));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let first = (span[0] - 0.5).ceil().max(0.0);
            let last = (span[1] - 0.5).ceil() - 1.0;
            if last < first {
                continue;
            }
            let first = first as usize;
            let last = (last as usize).min(width.saturating_sub(1));
            for value in values.iter_mut().take(last + 1).skip(first) {
                *value = true;
            }
        }
    }
    values
}

fn burn_path(mask: &mut Array2<bool>, path: &[PixelPoint]) {
    let (height, width) = mask.dim();
    if path.len() == 1 {
        if let Some(cell) = cell_of(path[0].0, path[0].1, height, width) {
            mask[cell] = true;
        }
        return;
    }
    for edge in path.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        // Cells are closed, so a segment on a cell boundary also touches the
        // cell before it.
        let col_lo = (a.0.min(b.0).floor() - 1.0).max(0.0);
        let col_hi = a.0.max(b.0).floor().min(width as f64 - 1.0);
        let row_lo = (a.1.min(b.1).floor() - 1.0).max(0.0);
        let row_hi = a.1.max(b.1).floor().min(height as f64 - 1.0);
        if col_hi < col_lo || row_hi < row_lo {
            continue;
        }
        for row in row_lo as usize..=row_hi as usize {
            for col in col_lo as usize..=col_hi as usize {
                if segment_touches_cell(a, b, col as f64, row as f64) {
                    mask[[row, col]] = true;
                }
            }
        }
    }
}

/// Liang-Barsky clip of segment `a`-`b` against the closed unit cell whose
/// upper-left corner is (`col`, `row`).
fn segment_touches_cell(a: PixelPoint, b: PixelPoint, col: f64, row: f64) -> bool {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-dx, a.0 - col),
        (dx, col + 1.0 - a.0),
        (-dy, a.1 - row),
        (dy, row + 1.0 - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                if t > t1 {
                    return false;
                }
                t0 = t0.max(t);
            } else {
                if t < t0 {
                    return false;
                }
                t1 = t1.min(t);
            }
        }
    }
    true
}

/// Cell containing a pixel-space point. Points on the far edges of the grid
/// belong to the last row/column.
fn cell_of(col: f64, row: f64, height: usize, width: usize) -> Option<[usize; 2]> {
    if height == 0 || width == 0 {
        return None;
    }
    if !(0.0..=width as f64).contains(&col) || !(0.0..=height as f64).contains(&row) {
        return None;
    }
    Some([
        (row.floor() as usize).min(height - 1),
        (col.floor() as usize).min(width - 1),
    ])
}
