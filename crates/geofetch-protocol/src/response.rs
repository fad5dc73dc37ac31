//! Decoding of successful and failed endpoint responses.

use std::path::Path;

use bytes::Bytes;
use ndarray::Array2;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::format::DataFormat;
use crate::npy::decode_npy;

/// One named band of a decoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub data: Array2<f64>,
}

/// Result of a pixel request.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixels {
    /// Decoded NPY bands, each of the requested (height, width).
    Bands(Vec<Band>),
    /// GeoTIFF bytes exactly as returned.
    GeoTiff(Bytes),
}

impl ImagePixels {
    pub fn bands(&self) -> Option<&[Band]> {
        match self {
            ImagePixels::Bands(bands) => Some(bands),
            ImagePixels::GeoTiff(_) => None,
        }
    }

    pub fn into_bands(self) -> Option<Vec<Band>> {
        match self {
            ImagePixels::Bands(bands) => Some(bands),
            ImagePixels::GeoTiff(_) => None,
        }
    }

    /// Write GeoTIFF bytes verbatim. Decoded bands have no file form here.
    pub fn write_geotiff(&self, path: impl AsRef<Path>) -> ProtocolResult<()> {
        match self {
            ImagePixels::GeoTiff(bytes) => {
                std::fs::write(path, bytes)?;
                Ok(())
            }
            ImagePixels::Bands(_) => Err(ProtocolError::NotImplemented(
                "writing NPY pixels as raw GeoTIFF bytes".to_string(),
            )),
        }
    }
}

/// Decode a pixel response for a grid of `shape` (height, width).
pub fn decode_image_response(
    bytes: Bytes,
    format: DataFormat,
    shape: (usize, usize),
) -> ProtocolResult<ImagePixels> {
    match format {
        DataFormat::GeoTiff => Ok(ImagePixels::GeoTiff(bytes)),
        DataFormat::TfRecordImage => Err(ProtocolError::NotImplemented(format!(
            "decoding {} responses",
            format
        ))),
        DataFormat::Npy => {
            let array = decode_npy(&bytes)?;
            if array.shape != [shape.0, shape.1] {
                return Err(ProtocolError::shape_mismatch(shape, &array.shape));
            }
            let bands = array
                .fields
                .into_iter()
                .map(|(name, values)| {
                    Array2::from_shape_vec(shape, values)
                        .map(|data| Band { name, data })
                        .map_err(|e| ProtocolError::invalid_npy(e.to_string()))
                })
                .collect::<ProtocolResult<Vec<_>>>()?;
            Ok(ImagePixels::Bands(bands))
        }
    }
}

/// The `result` member of a `value:compute` response.
pub fn decode_value_response(bytes: &[u8]) -> ProtocolResult<Value> {
    let mut body: Value = serde_json::from_slice(bytes)?;
    body.as_object_mut()
        .and_then(|obj| obj.remove("result"))
        .ok_or(ProtocolError::MissingResult)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Server message from an `{"error": {"message": ...}}` body, if present.
pub fn decode_error_body(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelope>(bytes)
        .ok()
        .and_then(|envelope| envelope.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_response() {
        assert_eq!(
            decode_value_response(br#"{"result": [1, 2]}"#).unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            decode_value_response(br#"{"result": null}"#).unwrap(),
            Value::Null
        );
        assert!(matches!(
            decode_value_response(br#"{"other": 1}"#),
            Err(ProtocolError::MissingResult)
        ));
    }

    #[test]
    fn test_error_body() {
        let body = br#"{"error": {"code": 400, "message": "Image.load: Asset 'X' not found.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            decode_error_body(body).as_deref(),
            Some("Image.load: Asset 'X' not found.")
        );
        assert_eq!(decode_error_body(b"<html>Bad Gateway</html>"), None);
    }

    #[test]
    fn test_geotiff_passes_through() {
        let raw = Bytes::from_static(b"II*\x00fake");
        let pixels = decode_image_response(raw.clone(), DataFormat::GeoTiff, (1, 1)).unwrap();
        assert_eq!(pixels, ImagePixels::GeoTiff(raw));
        assert!(pixels.bands().is_none());
    }
}
