//! Wire protocol for the remote compute service.
//!
//! This crate turns logical objects into request payloads and turns response
//! bodies back into arrays and tables. It performs no I/O beyond the
//! explicit file writers.
//!
//! # Example
//!
//! ```rust
//! use geofetch_common::{BoundingBox, Domain};
//! use geofetch_protocol::{build_image_payload, DataFormat, Image};
//!
//! let domain = Domain::new(BoundingBox::new(-10.0, 40.0, 0.0, 45.0), 0.1, "EPSG:4326").unwrap();
//! let payload = build_image_payload(
//!     &Image::load("USGS/SRTMGL1_003"),
//!     &domain.pixel_grid(),
//!     &["elevation".to_string()],
//!     DataFormat::Npy,
//! )
//! .unwrap();
//! assert_eq!(payload.grid.dimensions.width, 100);
//! ```

pub mod error;
pub mod expression;
pub mod format;
pub mod npy;
pub mod objects;
pub mod payload;
pub mod response;
pub mod table;

pub use error::{ProtocolError, ProtocolResult};
pub use expression::{Expression, FunctionInvocation, ValueNode};
pub use format::DataFormat;
pub use npy::{decode_npy, NpyArray};
pub use objects::{
    ComputedValue, FeatureCollection, Image, ImageCollection, LogicalObject, ObjectKind,
    TIME_START_PROPERTY,
};
pub use payload::{
    build_image_payload, build_table_payload, build_value_payload, ExpressionPayload,
    ImagePayload,
};
pub use response::{
    decode_error_body, decode_image_response, decode_value_response, Band, ImagePixels,
};
pub use table::{decode_table_response, Feature, FeatureTable};
