//! Grid geometry shared by every geofetch crate.
//!
//! The central type is [`Domain`]: a bounding box, resolution and CRS turned
//! into a regular pixel grid with coordinates, an affine transform, a mask
//! and the [`PixelGrid`] descriptor sent with pixel requests.

pub mod bbox;
pub mod crs;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod rasterize;
pub mod resample;
pub mod transform;

pub use bbox::BoundingBox;
pub use crs::{AxisLabels, Crs};
pub use domain::{Domain, RasterProfile};
pub use error::{DomainError, DomainResult};
pub use geometry::{Geometry, Position};
pub use transform::{AffineTransform, Dimensions, PixelGrid};
