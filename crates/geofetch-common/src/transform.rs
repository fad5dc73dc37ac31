//! Affine geotransforms and the wire-format pixel grid descriptor.

use serde::{Deserialize, Serialize};

use crate::Crs;

/// Six-coefficient affine transform mapping (col, row) pixel indices to CRS
/// coordinates.
///
/// Field order follows GDAL (`c, a, b, f, d, e`), which is also the order
/// the remote service expects inside `affineTransform`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffineTransform {
    pub translate_x: f64,
    pub scale_x: f64,
    pub shear_x: f64,
    pub translate_y: f64,
    pub shear_y: f64,
    pub scale_y: f64,
}

impl AffineTransform {
    /// North-up transform with square pixels and no rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, resolution: f64) -> Self {
        Self {
            translate_x: origin_x,
            scale_x: resolution,
            shear_x: 0.0,
            translate_y: origin_y,
            shear_y: 0.0,
            scale_y: -resolution,
        }
    }

    /// Build from GDAL geotransform ordering.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            translate_x: gt[0],
            scale_x: gt[1],
            shear_x: gt[2],
            translate_y: gt[3],
            shear_y: gt[4],
            scale_y: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.translate_x,
            self.scale_x,
            self.shear_x,
            self.translate_y,
            self.shear_y,
            self.scale_y,
        ]
    }

    /// CRS coordinate of the pixel corner at fractional (col, row).
    pub fn pixel_to_coord(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.translate_x + col * self.scale_x + row * self.shear_x,
            self.translate_y + col * self.shear_y + row * self.scale_y,
        )
    }

    /// Fractional (col, row) of a CRS coordinate. `None` for a degenerate
    /// transform.
    pub fn coord_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.scale_x * self.scale_y - self.shear_x * self.shear_y;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.translate_x;
        let dy = y - self.translate_y;
        let col = (dx * self.scale_y - dy * self.shear_x) / det;
        let row = (dy * self.scale_x - dx * self.shear_y) / det;
        Some((col, row))
    }

    /// Pixel sizes along x and y as positive numbers.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.scale_x.hypot(self.shear_y),
            self.scale_y.hypot(self.shear_x),
        )
    }
}

/// Grid dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

/// The `grid` object embedded in pixel requests.
///
/// Serializes as
/// `{"affineTransform":{...},"dimensions":{"width":..,"height":..},"crsCode":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelGrid {
    pub affine_transform: AffineTransform,
    pub dimensions: Dimensions,
    pub crs_code: Crs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_round_trip() {
        let t = AffineTransform::north_up(-180.0, 85.0, 0.5);
        let (x, y) = t.pixel_to_coord(10.0, 4.0);
        assert_eq!((x, y), (-175.0, 83.0));
        let (col, row) = t.coord_to_pixel(x, y).unwrap();
        assert!((col - 10.0).abs() < 1e-12);
        assert!((row - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_gdal_order() {
        let gt = [100.0, 30.0, 0.0, 500.0, 0.0, -30.0];
        assert_eq!(AffineTransform::from_gdal(gt).to_gdal(), gt);
        assert_eq!(AffineTransform::from_gdal(gt).pixel_size(), (30.0, 30.0));
    }

    #[test]
    fn test_degenerate_transform_has_no_inverse() {
        let t = AffineTransform::from_gdal([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(t.coord_to_pixel(1.0, 1.0).is_none());
    }

    #[test]
    fn test_pixel_grid_wire_format() {
        let grid = PixelGrid {
            affine_transform: AffineTransform::north_up(-180.0, 85.0, 1.0),
            dimensions: Dimensions {
                width: 360,
                height: 145,
            },
            crs_code: Crs::wgs84(),
        };
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(
            json,
            r#"{"affineTransform":{"translateX":-180.0,"scaleX":1.0,"shearX":0.0,"translateY":85.0,"shearY":0.0,"scaleY":-1.0},"dimensions":{"width":360,"height":145},"crsCode":"EPSG:4326"}"#
        );
    }
}
