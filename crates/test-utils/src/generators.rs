//! Test data generators for creating synthetic band data.
//!
//! These generators create predictable, verifiable patterns so tests can
//! check that values survive encoding, decoding and assembly in the right
//! place.

use ndarray::Array2;

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row + offset`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5, 0.0);
/// assert_eq!(grid.dim(), (5, 10));
/// assert_eq!(grid[[0, 1]], 1000.0); // row=0, col=1
/// assert_eq!(grid[[1, 0]], 1.0);    // row=1, col=0
/// ```
pub fn create_test_grid(width: usize, height: usize, offset: f64) -> Array2<f64> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        (col * 1000 + row) as f64 + offset
    })
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f64) -> Array2<f64> {
    Array2::from_elem((height, width), value)
}

/// Creates a grid of zeros with `value` at specified positions.
///
/// Useful for testing no-data handling.
///
/// * `positions` - List of (row, col) positions set to `value`
pub fn create_grid_with_value_at(
    width: usize,
    height: usize,
    value: f64,
    positions: &[(usize, usize)],
) -> Array2<f64> {
    let mut data = Array2::zeros((height, width));
    for &(row, col) in positions {
        if row < height && col < width {
            data[[row, col]] = value;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pattern() {
        let grid = create_test_grid(3, 2, 0.5);
        assert_eq!(grid[[1, 2]], 2001.5);
    }

    #[test]
    fn test_value_positions_out_of_range_ignored() {
        let grid = create_grid_with_value_at(2, 2, -9999.0, &[(0, 1), (5, 5)]);
        assert_eq!(grid[[0, 1]], -9999.0);
        assert_eq!(grid.iter().filter(|&&v| v == -9999.0).count(), 1);
    }
}
