//! Shared test utilities for the geofetch workspace.
//!
//! This crate provides common testing infrastructure including:
//! - NPY payload builders matching what `image:computePixels` returns
//! - Grid data generators
//! - Canned response bodies and other fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, npy_structured};
//! ```

pub mod fixtures;
pub mod generators;
pub mod npy;
pub mod paths;

// Re-export commonly used items at the crate root
pub use generators::*;
pub use npy::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Asserts two float arrays are equal where NaN matches NaN.
///
/// ```ignore
/// use test_utils::assert_nan_eq;
///
/// assert_nan_eq!(vec![1.0, f64::NAN], vec![1.0, f64::NAN]);
/// ```
#[macro_export]
macro_rules! assert_nan_eq {
    ($left:expr, $right:expr) => {{
        let left: Vec<f64> = $left.iter().copied().collect();
        let right: Vec<f64> = $right.iter().copied().collect();
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let same = (l.is_nan() && r.is_nan()) || l == r;
            if !same {
                panic!(
                    "assertion failed at index {}: `{:?}` != `{:?}`\n  left: `{:?}`,\n right: `{:?}`",
                    i, l, r, left, right
                );
            }
        }
    }};
}
