//! BoundingBox parsing, set operations and grid alignment.

use geofetch_common::bbox::{BboxParseError, BoundingBox};

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_bounds_floating() {
    let bbox: BoundingBox = "-125.5,24.75,-66.25,50.125".parse().unwrap();
    assert_eq!(bbox.to_array(), [-125.5, 24.75, -66.25, 50.125]);
}

#[test]
fn test_parse_bounds_scientific_notation() {
    let bbox = BoundingBox::from_bounds_str("1e-6,2e-6,1e6,2e6").unwrap();
    assert!((bbox.min_x - 1e-6).abs() < 1e-12);
    assert!((bbox.max_y - 2e6).abs() < 1e-6);
}

#[test]
fn test_parse_bounds_wrong_count() {
    assert!(matches!(
        BoundingBox::from_bounds_str("0,0,100"),
        Err(BboxParseError::InvalidFormat(_))
    ));
    assert!(matches!(
        BoundingBox::from_bounds_str("0,0,100,100,200"),
        Err(BboxParseError::InvalidFormat(_))
    ));
    assert!(matches!(
        BoundingBox::from_bounds_str(""),
        Err(BboxParseError::InvalidFormat(_))
    ));
}

#[test]
fn test_parse_bounds_invalid_number() {
    assert!(matches!(
        BoundingBox::from_bounds_str("abc,0,100,100"),
        Err(BboxParseError::InvalidNumber(_))
    ));
}

#[test]
fn test_from_array_round_trip() {
    let wsen = [-180.0, -60.0, 180.0, 85.0];
    assert_eq!(BoundingBox::from_array(wsen).to_array(), wsen);
}

// ============================================================================
// Validity and dimensions
// ============================================================================

#[test]
fn test_width_height_crossing_zero() {
    let bbox = BoundingBox::new(-10.0, -2.5, 10.0, 2.5);
    assert_eq!(bbox.width(), 20.0);
    assert_eq!(bbox.height(), 5.0);
}

#[test]
fn test_is_valid() {
    assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_valid());
    assert!(!BoundingBox::new(1.0, 0.0, 0.0, 1.0).is_valid());
    assert!(!BoundingBox::new(0.0, 0.0, 0.0, 1.0).is_valid());
    assert!(!BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0).is_valid());
    assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
}

// ============================================================================
// Set operations
// ============================================================================

#[test]
fn test_intersects_is_symmetric() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
}

#[test]
fn test_adjacent_boxes_do_not_intersect() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert!(!a.intersects(&b));
    assert!(a.intersection(&b).is_none());
}

#[test]
fn test_union_covers_both() {
    let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let b = BoundingBox::new(-3.0, 0.5, 0.5, 4.0);
    let u = a.union(&b);
    assert_eq!(u, BoundingBox::new(-3.0, 0.0, 1.0, 4.0));
    assert!(u.contains(&a));
    assert!(u.contains(&b));
}

#[test]
fn test_contains_point_includes_edges() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(0.0, 5.0));
    assert!(bbox.contains_point(10.0, 10.0));
    assert!(!bbox.contains_point(-0.1, 5.0));
    assert!(!bbox.contains_point(5.0, 10.1));
}

// ============================================================================
// Grid alignment
// ============================================================================

#[test]
fn test_round_out_contains_original() {
    let cases = [
        (BoundingBox::new(-10.3, -5.2, 3.1, 7.9), 1.0),
        (BoundingBox::new(0.01, 0.01, 0.99, 0.51), 0.1),
        (BoundingBox::new(501_013.0, 4_100_007.0, 503_999.0, 4_102_001.0), 30.0),
        (BoundingBox::new(-179.99, -89.9, 179.99, 89.9), 0.25),
    ];
    for (bbox, res) in cases {
        let rounded = bbox.round_out(res);
        assert!(rounded.contains(&bbox), "{:?} at {}", bbox, res);
        assert!(rounded.is_aligned(res), "{:?} at {}", rounded, res);
        // never grows by a full pixel on any edge
        assert!(bbox.min_x - rounded.min_x < res);
        assert!(rounded.max_y - bbox.max_y < res);
    }
}

#[test]
fn test_round_out_is_idempotent() {
    let once = BoundingBox::new(-10.3, -5.2, 3.1, 7.9).round_out(0.5);
    assert_eq!(once.round_out(0.5), once);
}

#[test]
fn test_round_out_keeps_float_noise_edges() {
    // 0.1 + 0.2 is not exactly 0.3 but is within tolerance of a multiple
    let bbox = BoundingBox::new(0.0, 0.0, 0.1 + 0.2, 1.0);
    let rounded = bbox.round_out(0.1);
    assert!((rounded.max_x - 0.3).abs() < 1e-12);
}

#[test]
fn test_is_aligned() {
    assert!(BoundingBox::new(-180.0, -60.0, 180.0, 85.0).is_aligned(1.0));
    assert!(!BoundingBox::new(-180.0, -60.0, 180.0, 85.5).is_aligned(1.0));
    assert!(BoundingBox::new(-180.0, -60.0, 180.0, 85.5).is_aligned(0.5));
}
