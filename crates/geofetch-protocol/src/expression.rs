//! Server-side expression graphs.
//!
//! The compute service evaluates a graph of value nodes keyed by id, with
//! `result` naming the node to evaluate:
//!
//! ```json
//! {"result": "0", "values": {"0": {"functionInvocationValue": {
//!     "functionName": "Image.load",
//!     "arguments": {"id": {"constantValue": "USGS/SRTMGL1_003"}}}}}}
//! ```
//!
//! Graphs built here are always a single inlined tree under `"0"`. Graphs
//! read from elsewhere may use `valueReference` nodes; [`Expression::resolve`]
//! inlines them so they can be wrapped in further calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use geofetch_common::BoundingBox;

use crate::error::{ProtocolError, ProtocolResult};

const ROOT_KEY: &str = "0";

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(Value),
    FunctionInvocationValue(FunctionInvocation),
    ArrayValue { values: Vec<ValueNode> },
    DictionaryValue { values: BTreeMap<String, ValueNode> },
    ValueReference(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    pub function_name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, ValueNode>,
}

impl ValueNode {
    pub fn constant(value: impl Into<Value>) -> Self {
        ValueNode::ConstantValue(value.into())
    }

    pub fn invoke<'a>(
        function_name: &str,
        arguments: impl IntoIterator<Item = (&'a str, ValueNode)>,
    ) -> Self {
        ValueNode::FunctionInvocationValue(FunctionInvocation {
            function_name: function_name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
        })
    }

    pub fn array(values: Vec<ValueNode>) -> Self {
        ValueNode::ArrayValue { values }
    }

    /// Name of the invoked function, if this node is an invocation.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::FunctionInvocationValue(f) => Some(&f.function_name),
            _ => None,
        }
    }
}

/// A complete expression graph, as sent in every request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// Single-tree expression rooted at `root`.
    pub fn new(root: ValueNode) -> Self {
        let mut values = BTreeMap::new();
        values.insert(ROOT_KEY.to_string(), root);
        Self {
            result: ROOT_KEY.to_string(),
            values,
        }
    }

    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The result node with every `valueReference` inlined.
    ///
    /// Fails on dangling or cyclic references.
    pub fn resolve(&self) -> ProtocolResult<ValueNode> {
        let root = self.values.get(&self.result).ok_or_else(|| {
            ProtocolError::InvalidExpression(format!("result '{}' has no value", self.result))
        })?;
        inline(root, &self.values, 0)
    }
}

impl From<ValueNode> for Expression {
    fn from(root: ValueNode) -> Self {
        Self::new(root)
    }
}

fn inline(
    node: &ValueNode,
    values: &BTreeMap<String, ValueNode>,
    depth: usize,
) -> ProtocolResult<ValueNode> {
    if depth > values.len() {
        return Err(ProtocolError::InvalidExpression(
            "cyclic value references".to_string(),
        ));
    }
    Ok(match node {
        ValueNode::ValueReference(key) => {
            let target = values.get(key).ok_or_else(|| {
                ProtocolError::InvalidExpression(format!("dangling reference '{}'", key))
            })?;
            inline(target, values, depth + 1)?
        }
        ValueNode::FunctionInvocationValue(f) => {
            let mut arguments = BTreeMap::new();
            for (name, arg) in &f.arguments {
                arguments.insert(name.clone(), inline(arg, values, depth)?);
            }
            ValueNode::FunctionInvocationValue(FunctionInvocation {
                function_name: f.function_name.clone(),
                arguments,
            })
        }
        ValueNode::ArrayValue { values: items } => ValueNode::ArrayValue {
            values: items
                .iter()
                .map(|item| inline(item, values, depth))
                .collect::<ProtocolResult<_>>()?,
        },
        ValueNode::DictionaryValue { values: entries } => {
            let mut out = BTreeMap::new();
            for (name, entry) in entries {
                out.insert(name.clone(), inline(entry, values, depth)?);
            }
            ValueNode::DictionaryValue { values: out }
        }
        ValueNode::ConstantValue(v) => ValueNode::ConstantValue(v.clone()),
    })
}

// ============================================================================
// Function builders
// ============================================================================

/// `Image.load(id)`
pub fn image_load(asset_id: &str) -> ValueNode {
    ValueNode::invoke("Image.load", [("id", ValueNode::constant(asset_id))])
}

/// `ImageCollection.load(id)`
pub fn image_collection_load(asset_id: &str) -> ValueNode {
    ValueNode::invoke(
        "ImageCollection.load",
        [("id", ValueNode::constant(asset_id))],
    )
}

/// `Collection.loadTable(tableId)`
pub fn table_load(table_id: &str) -> ValueNode {
    ValueNode::invoke(
        "Collection.loadTable",
        [("tableId", ValueNode::constant(table_id))],
    )
}

/// `Image.bandNames(image)`
pub fn band_names(image: ValueNode) -> ValueNode {
    ValueNode::invoke("Image.bandNames", [("image", image)])
}

/// `Collection.size(collection)`
pub fn collection_size(collection: ValueNode) -> ValueNode {
    ValueNode::invoke("Collection.size", [("collection", collection)])
}

/// `AggregateFeatureCollection.array(collection, property)`: the values of
/// `property` across every element, in collection order.
pub fn aggregate_array(collection: ValueNode, property: &str) -> ValueNode {
    ValueNode::invoke(
        "AggregateFeatureCollection.array",
        [
            ("collection", collection),
            ("property", ValueNode::constant(property)),
        ],
    )
}

/// `Element.get(object, property)`
pub fn element_get(object: ValueNode, property: &str) -> ValueNode {
    ValueNode::invoke(
        "Element.get",
        [
            ("object", object),
            ("property", ValueNode::constant(property)),
        ],
    )
}

/// `Collection.first(collection)`
pub fn collection_first(collection: ValueNode) -> ValueNode {
    ValueNode::invoke("Collection.first", [("collection", collection)])
}

/// `Collection.toList(collection, count)`
pub fn collection_to_list(collection: ValueNode, count: usize) -> ValueNode {
    ValueNode::invoke(
        "Collection.toList",
        [
            ("collection", collection),
            ("count", ValueNode::constant(count)),
        ],
    )
}

/// `List.get(list, index)`
pub fn list_get(list: ValueNode, index: usize) -> ValueNode {
    ValueNode::invoke(
        "List.get",
        [("list", list), ("index", ValueNode::constant(index))],
    )
}


/// `GeometryConstructors.Rectangle(coordinates, crs)` over `[W, S, E, N]`.
pub fn rectangle(bbox: &BoundingBox, crs: &str) -> ValueNode {
    ValueNode::invoke(
        "GeometryConstructors.Rectangle",
        [
            ("coordinates", ValueNode::constant(bbox.to_array().to_vec())),
            ("crs", ValueNode::constant(crs)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_load_wire_format() {
        let expr = Expression::new(image_load("USGS/SRTMGL1_003"));
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({
                "result": "0",
                "values": {"0": {"functionInvocationValue": {
                    "functionName": "Image.load",
                    "arguments": {"id": {"constantValue": "USGS/SRTMGL1_003"}}
                }}}
            })
        );
    }

    #[test]
    fn test_nested_calls() {
        let node = list_get(collection_to_list(image_collection_load("C"), 3), 2);
        let json = serde_json::to_value(&node).unwrap();
        let args = &json["functionInvocationValue"]["arguments"];
        assert_eq!(args["index"], json!({"constantValue": 2}));
        assert_eq!(
            args["list"]["functionInvocationValue"]["functionName"],
            "Collection.toList"
        );
    }

    #[test]
    fn test_resolve_inlines_references() {
        let json = r#"{
            "result": "1",
            "values": {
                "0": {"functionInvocationValue": {"functionName": "Image.load",
                      "arguments": {"id": {"constantValue": "A"}}}},
                "1": {"functionInvocationValue": {"functionName": "Image.bandNames",
                      "arguments": {"image": {"valueReference": "0"}}}}
            }
        }"#;
        let resolved = Expression::from_json(json).unwrap().resolve().unwrap();
        assert_eq!(resolved, band_names(image_load("A")));
    }

    #[test]
    fn test_resolve_rejects_cycles_and_dangling() {
        let mut values = BTreeMap::new();
        values.insert("0".to_string(), ValueNode::ValueReference("1".to_string()));
        values.insert("1".to_string(), ValueNode::ValueReference("0".to_string()));
        let cyclic = Expression {
            result: "0".to_string(),
            values,
        };
        assert!(matches!(
            cyclic.resolve(),
            Err(ProtocolError::InvalidExpression(_))
        ));

        let dangling = Expression::new(ValueNode::ValueReference("9".to_string()));
        assert!(dangling.resolve().is_err());
    }

    #[test]
    fn test_rectangle_coordinates() {
        let node = rectangle(&BoundingBox::new(-10.0, 0.0, 10.0, 5.0), "EPSG:4326");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json["functionInvocationValue"]["arguments"]["coordinates"],
            json!({"constantValue": [-10.0, 0.0, 10.0, 5.0]})
        );
    }
}
