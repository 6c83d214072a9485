//! The canonical, engine-agnostic filter DSL.
//!
//! A [`FilterDsl`] carries up to two buckets, `contact` and `company`; each
//! bucket maps a filter id to a value. Filter ids are unique per bucket.
//! Unknown ids are ignored during compilation, never errors; malformed value
//! shapes are rejected at deserialization time, before any engine call.

use std::collections::BTreeMap;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One bucket of the DSL: filter id to value.
///
/// Ordered map so compilation (and the last-write-wins dedup) is
/// deterministic.
pub type FilterBucket = BTreeMap<String, FilterValue>;

/// The top-level filter DSL, partitioned by entity bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterDsl {
    /// Filters against the contact index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contact: FilterBucket,
    /// Filters against the company index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub company: FilterBucket,
}

impl FilterDsl {
    /// Create an empty DSL.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when neither bucket carries any filter.
    pub fn is_empty(&self) -> bool {
        self.contact.is_empty() && self.company.is_empty()
    }

    /// True when either bucket constrains the given filter id.
    pub fn constrains(&self, id: &str) -> bool {
        self.contact.contains_key(id) || self.company.contains_key(id)
    }
}

/// A single filter value, one of the canonical shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Nested location shape with include/exclude sets per geo level.
    Location(LocationFilter),
    /// Set membership: include and/or exclude lists.
    Set {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        include: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
    /// Inclusive numeric range; either bound optional.
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Legacy scalar equality shorthand.
    Scalar(Value),
}

/// Geo include/exclude lists at three levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<String>,
}

impl LocationSet {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.states.is_empty() && self.cities.is_empty()
    }
}

/// The nested `location` filter shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFilter {
    #[serde(default)]
    pub include: LocationSet,
    #[serde(default)]
    pub exclude: LocationSet,
    /// Constrain to documents whose location is known.
    #[serde(default)]
    pub known: bool,
    /// Constrain to documents whose location is unknown.
    #[serde(default)]
    pub unknown: bool,
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        classify(value).map_err(D::Error::custom)
    }
}

/// Classify a raw JSON value into one of the canonical filter shapes.
///
/// Objects are disambiguated by their keys: include/exclude objects (or
/// known/unknown flags) mean location, include/exclude arrays mean set
/// membership, min/max mean range. Anything else object-shaped is a
/// wrong-shape error; non-objects are legacy scalars.
fn classify(value: Value) -> Result<FilterValue, String> {
    let obj = match value {
        Value::Object(obj) => obj,
        scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            return Ok(FilterValue::Scalar(scalar));
        }
        other => return Err(format!("unsupported filter value shape: {other}")),
    };

    let has_set_lists = obj
        .get("include")
        .or_else(|| obj.get("exclude"))
        .is_some_and(Value::is_array);
    let has_location_sets = obj
        .get("include")
        .or_else(|| obj.get("exclude"))
        .is_some_and(Value::is_object)
        || obj.contains_key("known")
        || obj.contains_key("unknown");
    let has_bounds = obj.contains_key("min") || obj.contains_key("max");

    let value = Value::Object(obj);
    if has_location_sets {
        let location: LocationFilter =
            serde_json::from_value(value).map_err(|e| format!("malformed location filter: {e}"))?;
        Ok(FilterValue::Location(location))
    } else if has_set_lists {
        #[derive(Deserialize)]
        struct SetShape {
            #[serde(default)]
            include: Vec<String>,
            #[serde(default)]
            exclude: Vec<String>,
        }
        let set: SetShape =
            serde_json::from_value(value).map_err(|e| format!("malformed set filter: {e}"))?;
        Ok(FilterValue::Set {
            include: set.include,
            exclude: set.exclude,
        })
    } else if has_bounds {
        #[derive(Deserialize)]
        struct RangeShape {
            min: Option<f64>,
            max: Option<f64>,
        }
        let range: RangeShape =
            serde_json::from_value(value).map_err(|e| format!("malformed range filter: {e}"))?;
        Ok(FilterValue::Range {
            min: range.min,
            max: range.max,
        })
    } else if value.as_object().is_some_and(|o| o.is_empty()) {
        Ok(FilterValue::Set {
            include: Vec::new(),
            exclude: Vec::new(),
        })
    } else {
        Err(format!("unsupported filter value shape: {value}"))
    }
}
