//! Common test fixtures for geofetch tests.
//!
//! This module provides pre-defined inputs and canned service responses for
//! common request scenarios.

/// Common bounding box definitions for testing, as (W, S, E, N).
pub mod bbox {
    /// Pseudo-global extent used by many global datasets
    pub const PSEUDO_GLOBAL: (f64, f64, f64, f64) = (-180.0, -60.0, 180.0, 85.0);

    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// A small area around Boulder, Colorado (not aligned to whole degrees)
    pub const BOULDER: (f64, f64, f64, f64) = (-105.35, 39.95, -105.15, 40.1);

    /// UTM zone 33N extent in meters
    pub const UTM_33N: (f64, f64, f64, f64) = (499_980.0, 4_099_980.0, 529_980.0, 4_129_980.0);

    /// Invalid bbox (min > max)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// Common CRS identifiers for testing.
pub mod crs {
    /// WGS 84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";

    /// Web Mercator
    pub const EPSG_3857: &str = "EPSG:3857";

    /// WGS 84 / UTM zone 33N
    pub const EPSG_32633: &str = "EPSG:32633";
}

/// Asset ids and canned bodies shaped like the compute service's responses.
pub mod service {
    use serde_json::{json, Value};

    pub const PROJECT: &str = "test-project";
    pub const IMAGE_ID: &str = "USGS/SRTMGL1_003";
    pub const COLLECTION_ID: &str = "MODIS/061/MOD13A2";
    pub const TABLE_ID: &str = "TIGER/2018/States";

    /// 2020-01-01, 2020-01-17 and 2020-02-02 at 00:00 UTC in milliseconds.
    pub const TIMESTAMPS_MS: [i64; 3] = [1_577_836_800_000, 1_579_219_200_000, 1_580_601_600_000];

    /// `{"result": value}`
    pub fn value_body(result: Value) -> Value {
        json!({ "result": result })
    }

    /// `{"error": {"code", "message", "status"}}`
    pub fn error_body(code: u16, message: &str) -> Value {
        json!({
            "error": {
                "code": code,
                "message": message,
                "status": "INVALID_ARGUMENT",
            }
        })
    }

    /// Two square polygon features with a `name` property.
    pub fn two_squares() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "a",
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 2], [0, 2], [0, 0]]]},
                    "properties": {"name": "south-west"}
                },
                {
                    "type": "Feature",
                    "id": "b",
                    "geometry": {"type": "Polygon", "coordinates": [[[3, 3], [4, 3], [4, 4], [3, 4], [3, 3]]]},
                    "properties": {"name": "north-east"}
                }
            ]
        })
    }
}
