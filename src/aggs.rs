//! Facet aggregation request building.
//!
//! Driven entirely by the [`FilterRegistry`](crate::filter::FilterRegistry):
//! every active, aggregation-enabled entry applicable to the current search
//! contributes one aggregation, unless the current DSL already constrains
//! that dimension (either bucket). Misconfigured entries are silently
//! omitted, never fatal.

use serde_json::{Map, Value, json};

use crate::entity::EntityType;
use crate::filter::{AggregationKind, FilterDsl, FilterRegistry};

/// Builds the aggregation portion of a compiled query.
#[derive(Debug)]
pub struct AggregationBuilder<'a> {
    registry: &'a FilterRegistry,
}

impl<'a> AggregationBuilder<'a> {
    /// Create a builder over an explicit registry.
    pub fn new(registry: &'a FilterRegistry) -> Self {
        AggregationBuilder { registry }
    }

    /// Create a builder over the built-in registry.
    pub fn builtin() -> AggregationBuilder<'static> {
        AggregationBuilder {
            registry: FilterRegistry::builtin(),
        }
    }

    /// Build the aggregation map for a search against `entity` with the
    /// given DSL already applied.
    ///
    /// Company facets are also permitted on contact searches, but contact
    /// facets never appear on company searches.
    pub fn build(&self, entity: EntityType, dsl: &FilterDsl) -> Map<String, Value> {
        let mut aggs = Map::new();

        for entry in self.registry.iter() {
            let Some(kind) = &entry.aggregation else {
                continue;
            };
            let permitted = match entity {
                EntityType::Contact => true,
                EntityType::Company => entry.applies_to(EntityType::Company),
            };
            if !permitted {
                continue;
            }
            // Already constrained in either bucket: the facet would only
            // echo the filter back.
            if dsl.constrains(entry.id) {
                continue;
            }
            let Some(field) = entry.primary_field(entity) else {
                continue;
            };

            let body = match kind {
                AggregationKind::Terms { size } => json!({
                    "terms": {
                        "field": field,
                        "size": size,
                        "min_doc_count": 0,
                    }
                }),
                AggregationKind::Range { ranges } => {
                    let buckets: Vec<Value> = ranges
                        .iter()
                        .map(|r| {
                            let mut bucket = Map::new();
                            bucket.insert("key".to_string(), json!(r.key));
                            if let Some(from) = r.from {
                                bucket.insert("from".to_string(), json!(from));
                            }
                            if let Some(to) = r.to {
                                bucket.insert("to".to_string(), json!(to));
                            }
                            Value::Object(bucket)
                        })
                        .collect();
                    if buckets.is_empty() {
                        continue; // misconfigured: no declared boundaries
                    }
                    json!({ "range": { "field": field, "ranges": buckets } })
                }
                AggregationKind::Presence => json!({
                    "filters": {
                        "filters": {
                            "known": { "exists": { "field": field } },
                            "unknown": { "bool": { "must_not": [{ "exists": { "field": field } }] } },
                        }
                    }
                }),
            };
            aggs.insert(entry.id.to_string(), body);
        }

        aggs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterRegistryEntry, RangeBucket, ValueKind};

    fn build(entity: EntityType, dsl: Value) -> Map<String, Value> {
        let dsl: FilterDsl = serde_json::from_value(dsl).unwrap();
        AggregationBuilder::builtin().build(entity, &dsl)
    }

    #[test]
    fn test_constrained_dimension_skipped() {
        let aggs = build(
            EntityType::Contact,
            json!({ "contact": { "job_title": { "include": ["cto"] } } }),
        );
        assert!(!aggs.contains_key("job_title"));
        assert!(aggs.contains_key("seniority"));
    }

    #[test]
    fn test_constraint_in_either_bucket_skips() {
        let aggs = build(
            EntityType::Contact,
            json!({ "company": { "industry": { "include": ["saas"] } } }),
        );
        assert!(!aggs.contains_key("industry"));
    }

    #[test]
    fn test_company_facets_on_contact_search_but_not_reverse() {
        let contact_aggs = build(EntityType::Contact, json!({}));
        assert!(contact_aggs.contains_key("industry"));
        assert!(contact_aggs.contains_key("employee_count"));
        assert!(contact_aggs.contains_key("job_title"));

        let company_aggs = build(EntityType::Company, json!({}));
        assert!(company_aggs.contains_key("industry"));
        assert!(!company_aggs.contains_key("job_title"));
        assert!(!company_aggs.contains_key("has_email"));
    }

    #[test]
    fn test_terms_agg_surfaces_zero_count_buckets() {
        let aggs = build(EntityType::Contact, json!({}));
        assert_eq!(aggs["seniority"]["terms"]["min_doc_count"], json!(0));
        assert_eq!(aggs["seniority"]["terms"]["size"], json!(15));
    }

    #[test]
    fn test_range_agg_from_registry_boundaries() {
        let aggs = build(EntityType::Company, json!({}));
        let ranges = aggs["employee_count"]["range"]["ranges"].as_array().unwrap();
        assert_eq!(ranges[0]["key"], json!("1-10"));
        assert!(ranges.last().unwrap().get("to").is_none());
    }

    #[test]
    fn test_presence_agg_shape() {
        let aggs = build(EntityType::Contact, json!({}));
        let filters = &aggs["has_email"]["filters"]["filters"];
        assert_eq!(filters["known"], json!({ "exists": { "field": "email" } }));
        assert!(filters["unknown"]["bool"]["must_not"].is_array());
    }

    #[test]
    fn test_misconfigured_entry_omitted() {
        let registry = FilterRegistry::new(vec![FilterRegistryEntry {
            id: "broken_range",
            applies_to: &[EntityType::Company],
            fields: &[(EntityType::Company, &["broken"])],
            value_kind: ValueKind::Range,
            aggregation: Some(AggregationKind::Range { ranges: Vec::<RangeBucket>::new() }),
            active: true,
        }]);
        let aggs = AggregationBuilder::new(&registry).build(EntityType::Company, &FilterDsl::new());
        assert!(aggs.is_empty());
    }
}
