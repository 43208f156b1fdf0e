//! `jsonb_build_object` / `jsonb_build_array` rendering for nested literals.
//!
//! Every key and every leaf becomes a bound parameter. Nested objects and
//! arrays are rendered inline as nested function calls, so bindings follow a
//! pre-order walk of the structure. Object keys are kept in a `BTreeMap` and
//! therefore always render in ascending order.

use crate::qb::param::{Param, ParamList};
use std::collections::BTreeMap;
use tokio_postgres::types::ToSql;

#[derive(Clone, Debug)]
pub enum JsonbBuilder {
    Object(BTreeMap<String, JsonbBuilder>),
    Array(Vec<JsonbBuilder>),
    Value(Param),
}

impl JsonbBuilder {
    /// An empty `jsonb_build_object()` call.
    pub fn object() -> Self {
        JsonbBuilder::Object(BTreeMap::new())
    }

    /// An empty `jsonb_build_array()` call.
    pub fn array() -> Self {
        JsonbBuilder::Array(Vec::new())
    }

    /// Set `key` on an object. Ignored for arrays and leaf values.
    pub fn insert(mut self, key: impl Into<String>, value: impl IntoJsonb) -> Self {
        if let JsonbBuilder::Object(fields) = &mut self {
            fields.insert(key.into(), value.into_jsonb());
        }
        self
    }

    /// Append an element to an array. Ignored for objects and leaf values.
    pub fn push(mut self, value: impl IntoJsonb) -> Self {
        if let JsonbBuilder::Array(items) = &mut self {
            items.push(value.into_jsonb());
        }
        self
    }

    /// Expand a JSON document into nested builder calls.
    ///
    /// Integers bind as `i64`, other numbers as `f64`, `null` as a NULL text
    /// parameter.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Object(fields) => JsonbBuilder::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), JsonbBuilder::from_json(v)))
                    .collect(),
            ),
            Json::Array(items) => JsonbBuilder::Array(items.iter().map(JsonbBuilder::from_json).collect()),
            Json::String(s) => JsonbBuilder::Value(Param::new(s.clone())),
            Json::Bool(b) => JsonbBuilder::Value(Param::new(*b)),
            Json::Null => JsonbBuilder::Value(Param::new(None::<String>)),
            Json::Number(n) => {
                let param = if let Some(i) = n.as_i64() {
                    Param::new(i)
                } else if let Some(f) = n.as_f64() {
                    Param::new(f)
                } else {
                    Param::new(n.to_string())
                };
                JsonbBuilder::Value(param)
            }
        }
    }

    /// Render the call, pushing keys and leaves in pre-order.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            JsonbBuilder::Object(fields) => {
                let mut parts = Vec::with_capacity(fields.len() * 2);
                for (key, value) in fields {
                    params.push(key.clone());
                    parts.push("?".to_string());
                    parts.push(value.build(params));
                }
                format!("jsonb_build_object({})", parts.join(", "))
            }
            JsonbBuilder::Array(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.build(params)).collect();
                format!("jsonb_build_array({})", parts.join(", "))
            }
            JsonbBuilder::Value(param) => {
                params.push_param(param.clone());
                "?".to_string()
            }
        }
    }
}

/// Build an object from `(key, value)` pairs.
pub fn jsonb_object<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> JsonbBuilder
where
    K: Into<String>,
    V: IntoJsonb,
{
    JsonbBuilder::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into_jsonb()))
            .collect(),
    )
}

/// Build an array from elements.
pub fn jsonb_array<V: IntoJsonb>(items: impl IntoIterator<Item = V>) -> JsonbBuilder {
    JsonbBuilder::Array(items.into_iter().map(IntoJsonb::into_jsonb).collect())
}

/// Conversion into a JSONB builder node. Any `ToSql` value becomes a leaf.
pub trait IntoJsonb {
    fn into_jsonb(self) -> JsonbBuilder;
}

impl<T: ToSql + Send + Sync + 'static> IntoJsonb for T {
    fn into_jsonb(self) -> JsonbBuilder {
        JsonbBuilder::Value(Param::new(self))
    }
}

impl IntoJsonb for JsonbBuilder {
    fn into_jsonb(self) -> JsonbBuilder {
        self
    }
}
