//! GeoJSON geometry types.
//!
//! These mirror the GeoJSON geometry objects (RFC 7946) closely enough to
//! round-trip what the remote service returns from table requests, and are
//! what [`crate::rasterize`] burns into domain masks.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// A single coordinate. Extra ordinates (z, m) are accepted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        if v.len() < 2 {
            return Err(format!(
                "position needs at least 2 ordinates, got {}",
                v.len()
            ));
        }
        Ok(Self { x: v[0], y: v[1] })
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    /// Rings; the first is the exterior, the rest are holes.
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: Position::new(x, y),
        }
    }

    /// Polygon from a single exterior ring. The ring is closed if needed.
    pub fn polygon(exterior: Vec<Position>) -> Self {
        Geometry::Polygon {
            coordinates: vec![close_ring(exterior)],
        }
    }

    /// Axis-aligned rectangle covering `bbox`, counter-clockwise.
    pub fn rectangle(bbox: &BoundingBox) -> Self {
        Self::polygon(vec![
            Position::new(bbox.min_x, bbox.min_y),
            Position::new(bbox.max_x, bbox.min_y),
            Position::new(bbox.max_x, bbox.max_y),
            Position::new(bbox.min_x, bbox.max_y),
        ])
    }

    /// Bounds of all coordinates, or `None` when the geometry is empty.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut acc: Option<BoundingBox> = None;
        self.for_each_position(&mut |p| {
            let point = BoundingBox::new(p.x, p.y, p.x, p.y);
            acc = Some(match acc {
                Some(b) => b.union(&point),
                None => point,
            });
        });
        acc
    }

    /// Visit every coordinate in the geometry.
    pub fn for_each_position(&self, f: &mut dyn FnMut(&Position)) {
        match self {
            Geometry::Point { coordinates } => f(coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().for_each(|p| f(p))
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().for_each(|p| f(p))
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(|p| f(p))
            }
            Geometry::GeometryCollection { geometries } => {
                for g in geometries {
                    g.for_each_position(f);
                }
            }
        }
    }
}

/// Combined bounds of a set of geometries.
pub fn total_bounds<'a, I>(geometries: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a Geometry>,
{
    geometries
        .into_iter()
        .filter_map(Geometry::bounds)
        .reduce(|a, b| a.union(&b))
}

fn close_ring(mut ring: Vec<Position>) -> Vec<Position> {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polygon_with_z() {
        let json = r#"{"type":"Polygon","coordinates":[[[0,0,5],[4,0,5],[4,3,5],[0,0,5]]]}"#;
        let geom: Geometry = serde_json::from_str(json).unwrap();
        assert_eq!(geom.bounds(), Some(BoundingBox::new(0.0, 0.0, 4.0, 3.0)));
    }

    #[test]
    fn test_rejects_short_position() {
        let json = r#"{"type":"Point","coordinates":[1.0]}"#;
        assert!(serde_json::from_str::<Geometry>(json).is_err());
    }

    #[test]
    fn test_rectangle_is_closed() {
        let rect = Geometry::rectangle(&BoundingBox::new(0.0, 0.0, 2.0, 1.0));
        match rect {
            Geometry::Polygon { coordinates } => {
                assert_eq!(coordinates[0].len(), 5);
                assert_eq!(coordinates[0].first(), coordinates[0].last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_total_bounds_spans_collection() {
        let geoms = vec![Geometry::point(-3.0, 2.0), Geometry::point(5.0, -1.0)];
        assert_eq!(
            total_bounds(&geoms),
            Some(BoundingBox::new(-3.0, -1.0, 5.0, 2.0))
        );
        assert_eq!(total_bounds(&Vec::<Geometry>::new()), None);
    }

    #[test]
    fn test_serializes_point_as_geojson() {
        let json = serde_json::to_string(&Geometry::point(1.5, 2.0)).unwrap();
        assert_eq!(json, r#"{"type":"Point","coordinates":[1.5,2.0]}"#);
    }
}
