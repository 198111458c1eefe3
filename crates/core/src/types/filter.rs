//! Filter criteria accepted by the order export API.
//!
//! A filter map pairs field names with either one scalar value or a list of
//! scalars. The map is parsed from untyped request JSON here; routing the
//! fields onto query columns is the server's concern.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Error returned when the `filters` argument cannot be interpreted as a
/// map of filter criteria.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidFilters {
    /// The `filters` value is not a JSON object.
    #[error("no filters specified")]
    NotAnObject,

    /// A filter value (or list element) is not a scalar.
    #[error("filter '{0}' has a non-scalar value")]
    NonScalarValue(String),
}

/// A single filter criterion: one scalar or a list of scalars.
///
/// Scalars are carried as strings regardless of their JSON type; the query
/// layer compares them against text-cast columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Exact or prefix match against a single value.
    One(String),
    /// Set-membership match against any of the values.
    Many(Vec<String>),
}

/// A set of filter criteria, unique per field name.
///
/// Backed by a `BTreeMap` so iteration order (and therefore the generated
/// query) is deterministic for a given set of filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMap(BTreeMap<String, FilterValue>);

impl FilterMap {
    /// Create an empty filter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter map from the request's `filters` JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFilters`] if the value is not an object, or if any
    /// field value is neither a scalar nor a list of scalars.
    pub fn from_value(value: &Value) -> Result<Self, InvalidFilters> {
        let Value::Object(fields) = value else {
            return Err(InvalidFilters::NotAnObject);
        };

        let mut map = BTreeMap::new();

        for (field, value) in fields {
            let parsed = match value {
                Value::Array(values) => {
                    let scalars = values
                        .iter()
                        .map(|v| scalar_to_string(v))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| InvalidFilters::NonScalarValue(field.clone()))?;
                    FilterValue::Many(scalars)
                }
                other => FilterValue::One(
                    scalar_to_string(other)
                        .ok_or_else(|| InvalidFilters::NonScalarValue(field.clone()))?,
                ),
            };

            map.insert(field.clone(), parsed);
        }

        Ok(Self(map))
    }

    /// Insert a criterion, replacing any existing one for the same field.
    pub fn insert(&mut self, field: impl Into<String>, value: FilterValue) {
        self.0.insert(field.into(), value);
    }

    /// Iterate criteria in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of criteria in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map contains no criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Render a JSON scalar as its string form; `None` for arrays and objects.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
