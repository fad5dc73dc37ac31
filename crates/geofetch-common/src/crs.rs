//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes of geographic (lat/lon, degree-based) CRSs that show up in
/// practice. Anything not listed is treated as projected.
const GEOGRAPHIC_EPSG: &[u32] = &[
    4326, // WGS84
    4269, // NAD83
    4267, // NAD27
    4258, // ETRS89
    4283, // GDA94
    4674, // SIRGAS 2000
    4612, // JGD2000
    4490, // CGCS2000
    7844, // GDA2020
];

/// A coordinate reference system identifier such as `"EPSG:4326"`.
///
/// The identifier is sent to the remote service verbatim as `crsCode`; the
/// only local interpretation is deciding whether the CRS is geographic so
/// that coordinate axes can be labelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// WGS84 geographic, the service default.
    pub fn wgs84() -> Self {
        Self::new("EPSG:4326")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric EPSG code, if the identifier is of the form `EPSG:<n>`.
    ///
    /// Accepts the case-insensitive `epsg:` prefix and the URN form
    /// `urn:ogc:def:crs:EPSG::<n>`.
    pub fn epsg_code(&self) -> Option<u32> {
        let upper = self.0.trim().to_uppercase();
        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))?;
        code.parse().ok()
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        let upper = self.0.trim().to_uppercase();
        if matches!(upper.as_str(), "CRS:84" | "OGC:CRS84") {
            return true;
        }
        self.epsg_code()
            .map(|code| GEOGRAPHIC_EPSG.contains(&code))
            .unwrap_or(false)
    }

    /// Names, long names and units for the x/y axes of data in this CRS.
    pub fn axis_labels(&self) -> AxisLabels {
        if self.is_geographic() {
            AxisLabels {
                x_name: "lon",
                y_name: "lat",
                x_long_name: "Longitude",
                y_long_name: "Latitude",
                x_units: "degrees_east",
                y_units: "degrees_north",
            }
        } else {
            // Projected CRSs are assumed to use meters.
            AxisLabels {
                x_name: "x",
                y_name: "y",
                x_long_name: "Eastings",
                y_long_name: "Northings",
                x_units: "meters",
                y_units: "meters",
            }
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Crs {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Crs {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Axis metadata attached to fetched datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLabels {
    pub x_name: &'static str,
    pub y_name: &'static str,
    pub x_long_name: &'static str,
    pub y_long_name: &'static str,
    pub x_units: &'static str,
    pub y_units: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_code() {
        assert_eq!(Crs::new("EPSG:4326").epsg_code(), Some(4326));
        assert_eq!(Crs::new("epsg:3857").epsg_code(), Some(3857));
        assert_eq!(Crs::new("urn:ogc:def:crs:EPSG::32633").epsg_code(), Some(32633));
        assert_eq!(Crs::new("SR-ORG:6974").epsg_code(), None);
    }

    #[test]
    fn test_is_geographic() {
        assert!(Crs::new("EPSG:4326").is_geographic());
        assert!(Crs::new("CRS:84").is_geographic());
        assert!(!Crs::new("EPSG:3857").is_geographic());
        assert!(!Crs::new("EPSG:32633").is_geographic());
    }

    #[test]
    fn test_axis_labels() {
        let geo = Crs::wgs84().axis_labels();
        assert_eq!((geo.x_name, geo.y_name), ("lon", "lat"));
        assert_eq!(geo.x_units, "degrees_east");

        let proj = Crs::new("EPSG:5070").axis_labels();
        assert_eq!((proj.x_name, proj.y_name), ("x", "y"));
        assert_eq!(proj.y_units, "meters");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Crs::new("EPSG:3857")).unwrap();
        assert_eq!(json, "\"EPSG:3857\"");
    }
}
