//! Handles to server-side objects.
//!
//! Nothing here is evaluated locally: each object is an expression tree plus
//! a label, and derived objects (band names, collection size, an item of a
//! collection) are new trees wrapping the original.

use std::fmt;

use crate::error::ProtocolResult;
use crate::expression::{self, Expression, ValueNode};

/// Property holding an image's acquisition time in milliseconds since epoch.
pub const TIME_START_PROPERTY: &str = "system:time_start";
/// Property holding an asset's id.
pub const ID_PROPERTY: &str = "system:id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Image,
    ImageCollection,
    FeatureCollection,
    Value,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Image => "Image",
            ObjectKind::ImageCollection => "ImageCollection",
            ObjectKind::FeatureCollection => "FeatureCollection",
            ObjectKind::Value => "Value",
        };
        f.write_str(name)
    }
}

/// Anything that can be sent to the compute service for evaluation.
pub trait LogicalObject {
    fn kind(&self) -> ObjectKind;

    /// Human-readable name used in logs and errors.
    fn label(&self) -> &str;

    /// Root node of the object's expression tree.
    fn node(&self) -> &ValueNode;

    fn expression(&self) -> Expression {
        Expression::new(self.node().clone())
    }
}

macro_rules! logical_object {
    ($ty:ident, $kind:expr) => {
        impl $ty {
            /// Wrap an existing expression, inlining any value references.
            pub fn from_expression(
                expression: &Expression,
                label: impl Into<String>,
            ) -> ProtocolResult<Self> {
                Ok(Self::from_node(expression.resolve()?, label))
            }

            pub fn from_node(node: ValueNode, label: impl Into<String>) -> Self {
                Self {
                    node,
                    label: label.into(),
                }
            }
        }

        impl LogicalObject for $ty {
            fn kind(&self) -> ObjectKind {
                $kind
            }

            fn label(&self) -> &str {
                &self.label
            }

            fn node(&self) -> &ValueNode {
                &self.node
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    node: ValueNode,
    label: String,
}

logical_object!(Image, ObjectKind::Image);

impl Image {
    pub fn load(asset_id: &str) -> Self {
        Self::from_node(expression::image_load(asset_id), asset_id)
    }

    /// List of the image's band names.
    pub fn band_names(&self) -> ComputedValue {
        ComputedValue::from_node(
            expression::band_names(self.node.clone()),
            format!("{}.bandNames", self.label),
        )
    }

    /// A property of the image, e.g. [`TIME_START_PROPERTY`].
    pub fn get(&self, property: &str) -> ComputedValue {
        ComputedValue::from_node(
            expression::element_get(self.node.clone(), property),
            format!("{}.{}", self.label, property),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCollection {
    node: ValueNode,
    label: String,
}

logical_object!(ImageCollection, ObjectKind::ImageCollection);

impl ImageCollection {
    pub fn load(asset_id: &str) -> Self {
        Self::from_node(expression::image_collection_load(asset_id), asset_id)
    }

    /// Number of images.
    pub fn size(&self) -> ComputedValue {
        ComputedValue::from_node(
            expression::collection_size(self.node.clone()),
            format!("{}.size", self.label),
        )
    }

    /// Acquisition times of every image, in collection order.
    pub fn timestamps(&self) -> ComputedValue {
        ComputedValue::from_node(
            expression::aggregate_array(self.node.clone(), TIME_START_PROPERTY),
            format!("{}.timestamps", self.label),
        )
    }

    /// The collection's asset id; evaluates to null for computed collections.
    pub fn collection_id(&self) -> ComputedValue {
        ComputedValue::from_node(
            expression::element_get(self.node.clone(), ID_PROPERTY),
            format!("{}.id", self.label),
        )
    }

    pub fn first(&self) -> Image {
        Image::from_node(
            expression::collection_first(self.node.clone()),
            format!("{}[0]", self.label),
        )
    }

    /// Image `index` of a collection of `count` images.
    pub fn image_at(&self, index: usize, count: usize) -> Image {
        let list = expression::collection_to_list(self.node.clone(), count);
        Image::from_node(
            expression::list_get(list, index),
            format!("{}[{}]", self.label, index),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    node: ValueNode,
    label: String,
}

logical_object!(FeatureCollection, ObjectKind::FeatureCollection);

impl FeatureCollection {
    pub fn load(table_id: &str) -> Self {
        Self::from_node(expression::table_load(table_id), table_id)
    }

    pub fn size(&self) -> ComputedValue {
        ComputedValue::from_node(
            expression::collection_size(self.node.clone()),
            format!("{}.size", self.label),
        )
    }
}

/// Any other expression, evaluated to a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedValue {
    node: ValueNode,
    label: String,
}

logical_object!(ComputedValue, ObjectKind::Value);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_labels() {
        let col = ImageCollection::load("MODIS/061/MOD13A2");
        assert_eq!(col.kind(), ObjectKind::ImageCollection);
        assert_eq!(col.label(), "MODIS/061/MOD13A2");
        assert_eq!(col.size().kind(), ObjectKind::Value);
        assert_eq!(col.first().kind(), ObjectKind::Image);
        assert_eq!(col.image_at(4, 10).label(), "MODIS/061/MOD13A2[4]");
    }

    #[test]
    fn test_timestamps_aggregate_time_start() {
        let ts = ImageCollection::load("C").timestamps();
        let json = serde_json::to_value(ts.node()).unwrap();
        let inv = &json["functionInvocationValue"];
        assert_eq!(inv["functionName"], "AggregateFeatureCollection.array");
        assert_eq!(
            inv["arguments"]["property"]["constantValue"],
            "system:time_start"
        );
    }

    #[test]
    fn test_get_reads_image_property() {
        let value = Image::load("X").get(TIME_START_PROPERTY);
        assert_eq!(value.label(), "X.system:time_start");
        let json = serde_json::to_value(value.node()).unwrap();
        let inv = &json["functionInvocationValue"];
        assert_eq!(inv["functionName"], "Element.get");
        assert_eq!(inv["arguments"]["property"]["constantValue"], "system:time_start");
    }

    #[test]
    fn test_from_expression_round_trip() {
        let original = FeatureCollection::load("TIGER/2018/States");
        let rebuilt =
            FeatureCollection::from_expression(&original.expression(), "states").unwrap();
        assert_eq!(rebuilt.node(), original.node());
        assert_eq!(rebuilt.label(), "states");
    }
}
