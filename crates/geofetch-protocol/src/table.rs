//! Feature tables returned by `table:computeFeatures`.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use geofetch_common::{geometry::total_bounds, BoundingBox, Crs, Domain, DomainResult, Geometry};

use crate::error::{ProtocolError, ProtocolResult};

const FEATURE_COLLECTION: &str = "FeatureCollection";
const FEATURE: &str = "Feature";

/// A GeoJSON feature. Geometry and properties may be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default)]
    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

fn feature_type() -> String {
    FEATURE.to_string()
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            type_: feature_type(),
            id: None,
            geometry,
            properties: Some(properties),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(name)
    }
}

/// A decoded GeoJSON FeatureCollection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl Default for FeatureTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureTable {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: FEATURE_COLLECTION.to_string(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Non-null geometries, in feature order.
    pub fn geometries(&self) -> Vec<Geometry> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.clone())
            .collect()
    }

    /// Bounds of every geometry, `None` if there are none.
    pub fn bounds(&self) -> Option<BoundingBox> {
        total_bounds(self.features.iter().filter_map(|f| f.geometry.as_ref()))
    }

    /// WGS84 domain at `resolution` covering the features, masked to them.
    pub fn domain(&self, resolution: f64) -> DomainResult<Domain> {
        Domain::from_geometries(&self.geometries(), resolution, Crs::wgs84())
    }

    /// Union of property names across all features.
    pub fn columns(&self) -> BTreeSet<String> {
        self.features
            .iter()
            .filter_map(|f| f.properties.as_ref())
            .flat_map(|p| p.keys().cloned())
            .collect()
    }

    /// Values of one property, `None` where a feature lacks it.
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.features.iter().map(|f| f.property(name)).collect()
    }

    pub fn to_geojson_string(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn write_geojson(&self, path: impl AsRef<Path>) -> ProtocolResult<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }
}

/// Decode the body of a successful table response.
pub fn decode_table_response(bytes: &[u8]) -> ProtocolResult<FeatureTable> {
    let table: FeatureTable = serde_json::from_slice(bytes)?;
    if table.type_ != FEATURE_COLLECTION {
        return Err(ProtocolError::InvalidTable(format!(
            "expected a FeatureCollection, got '{}'",
            table.type_
        )));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STATES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "0000000000000000000a",
             "geometry": {"type": "Polygon", "coordinates": [[[-104,37],[-102,37],[-102,41],[-104,41],[-104,37]]]},
             "properties": {"NAME": "Colorado", "ALAND": 268422891711}},
            {"type": "Feature", "id": 7, "geometry": null,
             "properties": {"NAME": "Nowhere"}},
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [-110.5, 44.0]},
             "properties": null}
        ]
    }"#;

    #[test]
    fn test_decode_mixed_features() {
        let table = decode_table_response(STATES.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.features[1].id, Some(json!(7)));
        assert!(table.features[1].geometry.is_none());
        assert!(table.features[2].properties.is_none());
        assert_eq!(table.geometries().len(), 2);
        assert_eq!(
            table.bounds(),
            Some(BoundingBox::new(-110.5, 37.0, -102.0, 44.0))
        );
    }

    #[test]
    fn test_domain_covers_geometries() {
        let table = decode_table_response(STATES.as_bytes()).unwrap();
        let domain = table.domain(1.0).unwrap();
        assert_eq!(*domain.bbox(), BoundingBox::new(-111.0, 37.0, -102.0, 44.0));
        assert_eq!(domain.shape(), (7, 9));
        assert!(domain.masked_count() > 0);
        assert!(domain.masked_count() < 7 * 9);

        let empty = FeatureTable::new(vec![Feature::new(None, Map::new())]);
        assert!(empty.domain(1.0).is_err());
    }

    #[test]
    fn test_columns() {
        let table = decode_table_response(STATES.as_bytes()).unwrap();
        assert_eq!(
            table.columns().into_iter().collect::<Vec<_>>(),
            vec!["ALAND", "NAME"]
        );
        assert_eq!(
            table.column("NAME"),
            vec![Some(&json!("Colorado")), Some(&json!("Nowhere")), None]
        );
    }

    #[test]
    fn test_rejects_non_collection() {
        let err = decode_table_response(br#"{"type": "Feature", "features": []}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidTable(_)));
        assert!(matches!(
            decode_table_response(b"[1,2]"),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_geojson_round_trip() {
        let table = decode_table_response(STATES.as_bytes()).unwrap();
        let text = table.to_geojson_string().unwrap();
        assert_eq!(decode_table_response(text.as_bytes()).unwrap(), table);
    }
}
