//! The request domain: a regular, north-up pixel grid in a single CRS.
//!
//! A [`Domain`] is built from a bounding box, a resolution and a CRS. The
//! bounding box is rounded outward so that it is tiled exactly by pixels of
//! the requested resolution, and everything else (coordinates, shape,
//! affine transform, the wire-format [`PixelGrid`]) is derived from that.
//!
//! Coordinates are pixel upper-left corners: `x_coords[j] = min_x + j * res`
//! and `y_coords[i] = max_y - i * res`, so `width = (max_x - min_x) / res`
//! and `height = (max_y - min_y) / res`.
//!
//! ```
//! use geofetch_common::{BoundingBox, Domain};
//!
//! let domain = Domain::new(BoundingBox::new(-180.0, -60.0, 180.0, 85.0), 1.0, "EPSG:4326").unwrap();
//! assert_eq!(domain.shape(), (145, 360));
//! ```

use ndarray::Array2;

use crate::geometry::total_bounds;
use crate::rasterize::rasterize;
use crate::resample::{interp1d_extrapolate, zoom_nearest};
use crate::{
    AffineTransform, BoundingBox, Crs, Dimensions, DomainError, DomainResult, Geometry,
    PixelGrid,
};

/// Spatial region, resolution and mask for image requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    crs: Crs,
    resolution: f64,
    bbox: BoundingBox,
    x_coords: Vec<f64>,
    y_coords: Vec<f64>,
    transform: AffineTransform,
    mask: Array2<bool>,
}

/// Georeferencing of an existing raster, used to build a matching domain.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterProfile {
    pub transform: AffineTransform,
    pub width: usize,
    pub height: usize,
    pub crs: Crs,
}

impl RasterProfile {
    /// Bounds of the raster derived from its transform and size.
    pub fn bounds(&self) -> BoundingBox {
        let corners = [
            self.transform.pixel_to_coord(0.0, 0.0),
            self.transform.pixel_to_coord(self.width as f64, 0.0),
            self.transform.pixel_to_coord(0.0, self.height as f64),
            self.transform
                .pixel_to_coord(self.width as f64, self.height as f64),
        ];
        corners
            .iter()
            .map(|&(x, y)| BoundingBox::new(x, y, x, y))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Mean of the x and y pixel sizes.
    pub fn resolution(&self) -> f64 {
        let (sx, sy) = self.transform.pixel_size();
        (sx + sy) / 2.0
    }
}

impl Domain {
    /// Create a domain covering `bbox` at `resolution` CRS units per pixel.
    ///
    /// Edges not already on a multiple of `resolution` are rounded outward,
    /// so the resulting grid always contains the requested box.
    pub fn new(bbox: BoundingBox, resolution: f64, crs: impl Into<Crs>) -> DomainResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(DomainError::InvalidResolution(resolution));
        }
        if !bbox.is_valid() {
            return Err(DomainError::invalid_bbox(format!(
                "{:?} must be finite with min < max on both axes",
                bbox.to_array()
            )));
        }

        let bbox = bbox.round_out(resolution);
        let width = ((bbox.max_x - bbox.min_x) / resolution).round() as usize;
        let height = ((bbox.max_y - bbox.min_y) / resolution).round() as usize;

        let x_coords = (0..width)
            .map(|j| bbox.min_x + j as f64 * resolution)
            .collect();
        let y_coords = (0..height)
            .map(|i| bbox.max_y - i as f64 * resolution)
            .collect();

        Ok(Self {
            crs: crs.into(),
            resolution,
            bbox,
            x_coords,
            y_coords,
            transform: AffineTransform::north_up(bbox.min_x, bbox.max_y, resolution),
            mask: Array2::from_elem((height, width), true),
        })
    }

    /// Domain covering `geometries`, masked to their footprint.
    ///
    /// Every pixel touched by a geometry is inside the mask.
    pub fn from_geometries(
        geometries: &[Geometry],
        resolution: f64,
        crs: impl Into<Crs>,
    ) -> DomainResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(DomainError::InvalidResolution(resolution));
        }
        let mut bounds = total_bounds(geometries)
            .ok_or(DomainError::EmptyGeometry)?
            .round_out(resolution);
        // A point or an axis-parallel line still needs one pixel of extent.
        if bounds.max_x <= bounds.min_x {
            bounds.max_x = bounds.min_x + resolution;
        }
        if bounds.max_y <= bounds.min_y {
            bounds.max_y = bounds.min_y + resolution;
        }

        let mut domain = Self::new(bounds, resolution, crs)?;
        let mask = rasterize(geometries, domain.shape(), &domain.transform, true);
        domain.set_mask(mask)?;
        Ok(domain)
    }

    /// Domain with the same CRS and extent as an existing raster.
    pub fn from_raster(profile: &RasterProfile) -> DomainResult<Self> {
        Self::new(profile.bounds(), profile.resolution(), profile.crs.clone())
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Column coordinates, ascending.
    pub fn x_coords(&self) -> &[f64] {
        &self.x_coords
    }

    /// Row coordinates, descending.
    pub fn y_coords(&self) -> &[f64] {
        &self.y_coords
    }

    pub fn width(&self) -> usize {
        self.x_coords.len()
    }

    pub fn height(&self) -> usize {
        self.y_coords.len()
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// Replace the mask. The existing mask is kept if the shapes differ.
    pub fn set_mask(&mut self, mask: Array2<bool>) -> DomainResult<()> {
        if mask.dim() != self.shape() {
            return Err(DomainError::ShapeMismatch {
                expected: self.shape(),
                actual: mask.dim(),
            });
        }
        self.mask = mask;
        Ok(())
    }

    /// Builder-style [`Domain::set_mask`].
    pub fn with_mask(mut self, mask: Array2<bool>) -> DomainResult<Self> {
        self.set_mask(mask)?;
        Ok(self)
    }

    /// Number of pixels inside the mask.
    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&inside| inside).count()
    }

    /// Wire-format grid descriptor for pixel requests.
    pub fn pixel_grid(&self) -> PixelGrid {
        PixelGrid {
            affine_transform: self.transform,
            dimensions: Dimensions {
                width: self.width(),
                height: self.height(),
            },
            crs_code: self.crs.clone(),
        }
    }

    /// The domain bounding box as a polygon.
    pub fn bbox_polygon(&self) -> Geometry {
        Geometry::rectangle(&self.bbox)
    }

    /// Coordinates of pixel (`row`, `col`).
    pub fn coords_of(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        Some((*self.x_coords.get(col)?, *self.y_coords.get(row)?))
    }

    /// Full 2-D coordinate arrays `(xx, yy)`, each of `shape`.
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let xx = Array2::from_shape_fn(self.shape(), |(_, col)| self.x_coords[col]);
        let yy = Array2::from_shape_fn(self.shape(), |(row, _)| self.y_coords[row]);
        (xx, yy)
    }

    /// Same region at a different resolution.
    ///
    /// `factor = 2` halves the pixel size and doubles the shape. The mask is
    /// zoomed with nearest neighbour; `self` is left untouched.
    pub fn resample(&self, factor: f64) -> DomainResult<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(DomainError::InvalidFactor(factor));
        }

        let resolution = self.resolution / factor;
        let width = ((self.width() as f64 * factor).round() as usize).max(1);
        let height = ((self.height() as f64 * factor).round() as usize).max(1);

        let x_coords = rescale_coords(&self.x_coords, factor, width, resolution);
        let y_coords = rescale_coords(&self.y_coords, factor, height, -resolution);

        let min_x = x_coords[0];
        let max_y = y_coords[0];
        let bbox = BoundingBox::new(
            min_x,
            max_y - height as f64 * resolution,
            min_x + width as f64 * resolution,
            max_y,
        );

        Ok(Self {
            crs: self.crs.clone(),
            resolution,
            bbox,
            x_coords,
            y_coords,
            transform: AffineTransform::north_up(bbox.min_x, bbox.max_y, resolution),
            mask: zoom_nearest(&self.mask, (height, width)),
        })
    }
}

/// Coordinates at the new sample count, interpolated from the old ones placed
/// at `index * factor`. `step` is the new signed spacing, used when there are
/// too few samples to interpolate.
fn rescale_coords(old: &[f64], factor: f64, count: usize, step: f64) -> Vec<f64> {
    let targets: Vec<f64> = (0..count).map(|i| i as f64).collect();
    if old.len() < 2 {
        let origin = old.first().copied().unwrap_or(0.0);
        return targets.iter().map(|&i| origin + i * step).collect();
    }
    let sample_at: Vec<f64> = (0..old.len()).map(|i| i as f64 * factor).collect();
    interp1d_extrapolate(&sample_at, old, &targets)
}
