//! Expression graphs for the image collection service.
//!
//! The service evaluates a DAG of function invocations. Nodes live in a flat
//! `values` map keyed by string ids, and `result` names the node to compute.
//! Function definitions (used by `Collection.map`) must refer to their body by
//! key, so the builder hands out references for every pushed node.

use crate::types::{CollectionQuery, GeoPoint, Rectangle};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Image property holding the acquisition timestamp
pub const TIME_PROPERTY: &str = "system:time_start";

/// Argument name bound by the per-image mapping function
const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

/// A complete, serializable expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    pub function_name: String,
    pub arguments: BTreeMap<String, ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    pub argument_names: Vec<String>,
    pub body: String,
}

/// One node of the expression graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(Value),
    ValueReference(String),
    ArgumentReference(String),
    FunctionInvocationValue(FunctionInvocation),
    FunctionDefinitionValue(FunctionDefinition),
    ArrayValue { values: Vec<ValueNode> },
}

impl ValueNode {
    pub fn constant(value: impl Into<Value>) -> Self {
        ValueNode::ConstantValue(value.into())
    }

    /// Invoke `name` with named arguments
    pub fn invoke<'a>(name: &str, arguments: impl IntoIterator<Item = (&'a str, ValueNode)>) -> Self {
        ValueNode::FunctionInvocationValue(FunctionInvocation {
            function_name: name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        })
    }
}

/// Allocates value keys while an expression is being assembled
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    values: BTreeMap<String, ValueNode>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: ValueNode) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        key
    }

    /// Store `node` under a fresh key and return a reference to it
    pub fn push(&mut self, node: ValueNode) -> ValueNode {
        ValueNode::ValueReference(self.insert(node))
    }

    /// Finish with `node` as the result
    pub fn finish(mut self, node: ValueNode) -> Expression {
        let result = match node {
            ValueNode::ValueReference(key) => key,
            other => self.insert(other),
        };
        Expression {
            result,
            values: self.values,
        }
    }

    /// Load `query.dataset`, keep `query.band`, restrict to `[start, end)` and sort by time
    pub fn collection(&mut self, query: &CollectionQuery) -> ValueNode {
        let loaded = ValueNode::invoke(
            "ImageCollection.load",
            [("id", ValueNode::constant(query.dataset.as_str()))],
        );

        let body = self.insert(ValueNode::invoke(
            "Image.select",
            [
                ("input", ValueNode::ArgumentReference(MAPPING_VAR.to_string())),
                (
                    "bandSelectors",
                    ValueNode::constant(vec![query.band.clone()]),
                ),
            ],
        ));

        let selected = ValueNode::invoke(
            "Collection.map",
            [
                ("collection", loaded),
                (
                    "baseAlgorithm",
                    ValueNode::FunctionDefinitionValue(FunctionDefinition {
                        argument_names: vec![MAPPING_VAR.to_string()],
                        body,
                    }),
                ),
            ],
        );

        let filtered = filter_date(selected, query.start, Some(query.end));

        ValueNode::invoke(
            "Collection.limit",
            [
                ("collection", filtered),
                ("key", ValueNode::constant(TIME_PROPERTY)),
            ],
        )
    }
}

/// Restrict a collection to `[start, end)`; without `end` the range is a single millisecond
pub fn filter_date(collection: ValueNode, start: NaiveDate, end: Option<NaiveDate>) -> ValueNode {
    let mut range = vec![("start", ValueNode::constant(date_string(start)))];
    if let Some(end) = end {
        range.push(("end", ValueNode::constant(date_string(end))));
    }

    let filter = ValueNode::invoke(
        "Filter.dateRangeContains",
        [
            ("leftValue", ValueNode::invoke("DateRange", range)),
            ("rightField", ValueNode::constant(TIME_PROPERTY)),
        ],
    );

    ValueNode::invoke(
        "Collection.filter",
        [("collection", collection), ("filter", filter)],
    )
}

pub fn point(p: &GeoPoint) -> ValueNode {
    ValueNode::invoke(
        "GeometryConstructors.Point",
        [("coordinates", ValueNode::constant(vec![p.lon, p.lat]))],
    )
}

pub fn rectangle(r: &Rectangle) -> ValueNode {
    ValueNode::invoke(
        "GeometryConstructors.Rectangle",
        [(
            "coordinates",
            ValueNode::constant(r.coordinates().to_vec()),
        )],
    )
}

/// Table of per-image values at `point`; first row is the header
pub fn get_region(query: &CollectionQuery, point_geom: &GeoPoint, scale: f64) -> Expression {
    let mut builder = ExpressionBuilder::new();
    let collection = builder.collection(query);
    let region = ValueNode::invoke(
        "ImageCollection.getRegion",
        [
            ("collection", collection),
            ("geometry", point(point_geom)),
            ("scale", ValueNode::constant(scale)),
        ],
    );
    builder.finish(region)
}

/// Band matrix of the first image acquired on `date`, sampled over `region`
pub fn sample_rectangle(query: &CollectionQuery, date: NaiveDate, region: &Rectangle) -> Expression {
    let mut builder = ExpressionBuilder::new();
    let collection = builder.collection(query);
    let image = ValueNode::invoke(
        "Collection.first",
        [("collection", filter_date(collection, date, None))],
    );
    let sampled = ValueNode::invoke(
        "Image.sampleRectangle",
        [("image", image), ("region", rectangle(region))],
    );
    let band = ValueNode::invoke(
        "Element.get",
        [
            ("object", sampled),
            ("property", ValueNode::constant(query.band.as_str())),
        ],
    );
    builder.finish(band)
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
