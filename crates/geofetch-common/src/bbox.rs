//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// Relative tolerance used when deciding whether an edge already sits on a
/// multiple of the grid resolution.
const ALIGN_TOLERANCE: f64 = 1e-9;

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from a `[W, S, E, N]` array.
    pub fn from_array(bounds: [f64; 4]) -> Self {
        Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
    }

    /// Parse a bbox string: "minx,miny,maxx,maxy"
    pub fn from_bounds_str(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        Ok(Self {
            min_x: parts[0]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[0].to_string()))?,
            min_y: parts[1]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[1].to_string()))?,
            max_x: parts[2]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[2].to_string()))?,
            max_y: parts[3]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[3].to_string()))?,
        })
    }

    /// `[W, S, E, N]` ordering, as sent to the remote service.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when all edges are finite and min < max on both axes.
    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Smallest bbox covering both inputs.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if another bbox lies entirely inside this one.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    /// Whether every edge already sits on a multiple of `resolution`.
    pub fn is_aligned(&self, resolution: f64) -> bool {
        self.to_array()
            .iter()
            .all(|&v| nearest_multiple(v, resolution).is_some())
    }

    /// Round every edge outward to a multiple of `resolution`.
    ///
    /// Minimum edges move down, maximum edges move up; an edge that is
    /// already aligned is left where it is. The result always contains `self`.
    pub fn round_out(&self, resolution: f64) -> BoundingBox {
        BoundingBox {
            min_x: snap_down(self.min_x, resolution),
            min_y: snap_down(self.min_y, resolution),
            max_x: snap_up(self.max_x, resolution),
            max_y: snap_up(self.max_y, resolution),
        }
    }
}

/// Returns the multiple of `resolution` closest to `value` if `value` is
/// within tolerance of it.
fn nearest_multiple(value: f64, resolution: f64) -> Option<f64> {
    let q = value / resolution;
    let r = q.round();
    if (q - r).abs() <= ALIGN_TOLERANCE * r.abs().max(1.0) {
        Some(r * resolution)
    } else {
        None
    }
}

fn snap_down(value: f64, resolution: f64) -> f64 {
    nearest_multiple(value, resolution)
        .map(|v| v.min(value))
        .unwrap_or_else(|| (value / resolution).floor() * resolution)
}

fn snap_up(value: f64, resolution: f64) -> f64 {
    nearest_multiple(value, resolution)
        .map(|v| v.max(value))
        .unwrap_or_else(|| (value / resolution).ceil() * resolution)
}

impl std::str::FromStr for BoundingBox {
    type Err = BboxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bounds_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}
