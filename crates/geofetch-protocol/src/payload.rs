//! Request bodies for the three compute endpoints.

use serde::Serialize;

use geofetch_common::PixelGrid;

use crate::error::{ProtocolError, ProtocolResult};
use crate::expression::Expression;
use crate::format::DataFormat;
use crate::objects::{ComputedValue, FeatureCollection, Image, LogicalObject};

/// Body of `image:computePixels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub expression: Expression,
    pub file_format: DataFormat,
    pub band_ids: Vec<String>,
    pub grid: PixelGrid,
}

/// Body of `table:computeFeatures` and `value:compute`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionPayload {
    pub expression: Expression,
}

pub fn build_image_payload(
    image: &Image,
    grid: &PixelGrid,
    bands: &[String],
    format: DataFormat,
) -> ProtocolResult<ImagePayload> {
    if format == DataFormat::TfRecordImage {
        return Err(ProtocolError::NotImplemented(format!(
            "{} pixel format",
            format
        )));
    }
    Ok(ImagePayload {
        expression: image.expression(),
        file_format: format,
        band_ids: bands.to_vec(),
        grid: grid.clone(),
    })
}

pub fn build_table_payload(collection: &FeatureCollection) -> ExpressionPayload {
    ExpressionPayload {
        expression: collection.expression(),
    }
}

pub fn build_value_payload(value: &ComputedValue) -> ExpressionPayload {
    ExpressionPayload {
        expression: value.expression(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofetch_common::{BoundingBox, Domain};
    use serde_json::json;

    fn grid() -> PixelGrid {
        Domain::new(BoundingBox::new(0.0, 0.0, 2.0, 1.0), 0.5, "EPSG:4326")
            .unwrap()
            .pixel_grid()
    }

    #[test]
    fn test_image_payload_fields() {
        let payload = build_image_payload(
            &Image::load("A"),
            &grid(),
            &["B1".to_string()],
            DataFormat::Npy,
        )
        .unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["fileFormat"], "NPY");
        assert_eq!(json["bandIds"], json!(["B1"]));
        assert_eq!(json["grid"]["dimensions"], json!({"width": 4, "height": 2}));
        assert_eq!(json["grid"]["crsCode"], "EPSG:4326");
        assert_eq!(json["expression"]["result"], "0");
    }

    #[test]
    fn test_tfrecord_is_not_implemented() {
        let err = build_image_payload(&Image::load("A"), &grid(), &[], DataFormat::TfRecordImage)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NotImplemented(_)));
    }

    #[test]
    fn test_table_payload_has_no_grid() {
        let payload = build_table_payload(&FeatureCollection::load("T"));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
        assert!(json.get("expression").is_some());
    }
}
