//! Pixel payload formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// File format requested from `image:computePixels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFormat {
    /// NumPy `.npy` container, decoded into per-band arrays.
    #[default]
    Npy,
    /// GeoTIFF bytes, passed through untouched.
    GeoTiff,
    /// Accepted by the service but not decoded by this client.
    TfRecordImage,
}

impl DataFormat {
    pub fn wire_name(&self) -> &'static str {
        match self {
            DataFormat::Npy => "NPY",
            DataFormat::GeoTiff => "GEO_TIFF",
            DataFormat::TfRecordImage => "TF_RECORD_IMAGE",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for DataFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NPY" => Ok(DataFormat::Npy),
            "GEO_TIFF" => Ok(DataFormat::GeoTiff),
            "TF_RECORD_IMAGE" => Ok(DataFormat::TfRecordImage),
            _ => Err(ProtocolError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("NPY".parse::<DataFormat>().unwrap(), DataFormat::Npy);
        assert_eq!("geo_tiff".parse::<DataFormat>().unwrap(), DataFormat::GeoTiff);
        assert_eq!(
            "TF_RECORD_IMAGE".parse::<DataFormat>().unwrap(),
            DataFormat::TfRecordImage
        );
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = "PNG".parse::<DataFormat>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedFormat(ref s) if s == "PNG"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_serde_matches_wire_name() {
        for format in [DataFormat::Npy, DataFormat::GeoTiff, DataFormat::TfRecordImage] {
            assert_eq!(
                serde_json::to_value(format).unwrap(),
                serde_json::Value::String(format.wire_name().to_string())
            );
        }
    }
}
