//! Lowering the canonical filter DSL into engine-native filter clauses.
//!
//! The compiler walks the two DSL buckets and consults the
//! [`FilterRegistry`] for every id; unknown ids are skipped, never errors.
//! Cross-entity behavior is asymmetric and fixed contract: a contact search
//! applies company-bucket filters through cross-index resolution (company
//! constraint, then domain set, then contact-side terms filter), while a
//! company search ignores the contact bucket entirely.

use ahash::AHashSet;

use crate::backend::DomainResolver;
use crate::entity::EntityType;
use crate::error::Result;
use crate::filter::dsl::{FilterBucket, FilterDsl, FilterValue, LocationFilter};
use crate::filter::registry::{FilterRegistry, FilterRegistryEntry, ValueKind};
use crate::query::{BoolClause, Clause};
use serde_json::Value;

/// Page size used when resolving company filters to a domain set.
pub const DOMAIN_RESOLUTION_LIMIT: usize = 10_000;

/// An intermediate compiled filter item. Items are deduplicated before
/// lowering so a heuristic and an explicit filter targeting the same field
/// collapse deterministically.
#[derive(Debug, Clone, PartialEq)]
enum FilterItem {
    Include { field: String, values: Vec<String> },
    Exclude { field: String, values: Vec<String> },
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    Exists { field: String },
    Missing { field: String },
}

impl FilterItem {
    fn field(&self) -> &str {
        match self {
            FilterItem::Include { field, .. }
            | FilterItem::Exclude { field, .. }
            | FilterItem::Range { field, .. }
            | FilterItem::Exists { field }
            | FilterItem::Missing { field } => field,
        }
    }
}

/// Compiles filter DSL buckets into a [`BoolClause`] fragment.
#[derive(Debug)]
pub struct FilterCompiler<'a> {
    registry: &'a FilterRegistry,
}

impl<'a> FilterCompiler<'a> {
    /// Create a compiler over an explicit registry.
    pub fn new(registry: &'a FilterRegistry) -> Self {
        FilterCompiler { registry }
    }

    /// Create a compiler over the built-in registry.
    pub fn builtin() -> FilterCompiler<'static> {
        FilterCompiler {
            registry: FilterRegistry::builtin(),
        }
    }

    /// Compile the DSL for a search against `entity`.
    ///
    /// For contact searches the company bucket is resolved to a domain
    /// allow-list via `resolver`; an empty resolution still emits an empty
    /// terms filter so the contact query returns zero results rather than
    /// going unfiltered.
    pub fn compile(
        &self,
        dsl: &FilterDsl,
        entity: EntityType,
        resolver: &dyn DomainResolver,
    ) -> Result<BoolClause> {
        let mut items = match entity {
            EntityType::Company => {
                // Contact-bucket filters are dropped on company searches.
                self.bucket_items(&dsl.company, EntityType::Company)
            }
            EntityType::Contact => {
                let mut items = self.bucket_items(&dsl.contact, EntityType::Contact);

                // Resolution only runs when the bucket compiles to a real
                // company constraint. A bucket of unknown or inapplicable
                // ids behaves like an empty one; resolving it would turn a
                // match-all company query into a domain allow-list.
                let company_bucket = self.company_bucket_for_resolution(dsl);
                if !self.bucket_items(&company_bucket, EntityType::Company).is_empty() {
                    let domains = resolver.resolve_domains(&company_bucket)?;
                    items.push(FilterItem::Include {
                        field: entity.domain_field().to_string(),
                        values: domains,
                    });
                }
                items
            }
        };

        items = dedup_items(items);
        Ok(lower_items(items))
    }

    /// Compile a single bucket directly, without cross-index resolution.
    ///
    /// Used for the company-side resolution query and by tests.
    pub fn compile_bucket(&self, bucket: &FilterBucket, context: EntityType) -> BoolClause {
        lower_items(dedup_items(self.bucket_items(bucket, context)))
    }

    /// The company bucket as used for cross-index resolution: when both
    /// buckets carry a location filter under the same id, the contact-scoped
    /// one wins and the company-scoped one is dropped, so the same semantic
    /// dimension is not constrained twice.
    fn company_bucket_for_resolution(&self, dsl: &FilterDsl) -> FilterBucket {
        dsl.company
            .iter()
            .filter(|(id, value)| {
                let contested = dsl.contact.contains_key(*id);
                let location_kind = matches!(value, FilterValue::Location(_))
                    || matches!(dsl.contact.get(*id), Some(FilterValue::Location(_)));
                !(contested && location_kind)
            })
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    /// Resolve one bucket into filter items, in bucket order. Field names
    /// resolve against the bucket's own entity context, not the overall
    /// search entity type.
    fn bucket_items(&self, bucket: &FilterBucket, context: EntityType) -> Vec<FilterItem> {
        let mut items = Vec::new();
        for (id, value) in bucket {
            let Some(entry) = self.registry.get(id) else {
                continue; // unknown id: skipped, never an error
            };
            if !entry.applies_to(context) {
                continue;
            }
            self.entry_items(entry, value, context, &mut items);
        }
        items
    }

    fn entry_items(
        &self,
        entry: &FilterRegistryEntry,
        value: &FilterValue,
        context: EntityType,
        items: &mut Vec<FilterItem>,
    ) {
        match (entry.value_kind, value) {
            (ValueKind::Terms, FilterValue::Set { include, exclude }) => {
                let Some(field) = entry.primary_field(context) else {
                    return;
                };
                if !include.is_empty() {
                    items.push(FilterItem::Include {
                        field: field.to_string(),
                        values: include.clone(),
                    });
                }
                if !exclude.is_empty() {
                    items.push(FilterItem::Exclude {
                        field: field.to_string(),
                        values: exclude.clone(),
                    });
                }
            }
            (ValueKind::Terms, FilterValue::Scalar(scalar)) => {
                let Some(field) = entry.primary_field(context) else {
                    return;
                };
                if let Some(value) = scalar_to_string(scalar) {
                    items.push(FilterItem::Include {
                        field: field.to_string(),
                        values: vec![value],
                    });
                }
            }
            (ValueKind::Terms, FilterValue::Location(location)) => {
                let Some(fields) = entry.fields_for(context) else {
                    return;
                };
                self.location_items(location, fields, items);
            }
            (ValueKind::Range, FilterValue::Range { min, max }) => {
                if min.is_none() && max.is_none() {
                    return;
                }
                let Some(field) = entry.primary_field(context) else {
                    return;
                };
                items.push(FilterItem::Range {
                    field: field.to_string(),
                    min: *min,
                    max: *max,
                });
            }
            (ValueKind::Range, FilterValue::Scalar(scalar)) => {
                // Legacy equality shorthand on a numeric field.
                let (Some(field), Some(n)) = (entry.primary_field(context), scalar.as_f64())
                else {
                    return;
                };
                items.push(FilterItem::Range {
                    field: field.to_string(),
                    min: Some(n),
                    max: Some(n),
                });
            }
            (ValueKind::Exists, FilterValue::Scalar(scalar)) => {
                let (Some(field), Some(wanted)) =
                    (entry.primary_field(context), scalar.as_bool())
                else {
                    return;
                };
                items.push(if wanted {
                    FilterItem::Exists {
                        field: field.to_string(),
                    }
                } else {
                    FilterItem::Missing {
                        field: field.to_string(),
                    }
                });
            }
            // Mismatched kind/shape combinations are skipped, same as
            // unknown ids.
            _ => {}
        }
    }

    /// Expand a location shape over the entry's (country, state, city)
    /// field triple. Every set is independently optional.
    fn location_items(
        &self,
        location: &LocationFilter,
        fields: &[&str],
        items: &mut Vec<FilterItem>,
    ) {
        let levels = [
            (&location.include.countries, &location.exclude.countries, 0),
            (&location.include.states, &location.exclude.states, 1),
            (&location.include.cities, &location.exclude.cities, 2),
        ];
        for (include, exclude, idx) in levels {
            let Some(field) = fields.get(idx) else {
                continue;
            };
            if !include.is_empty() {
                items.push(FilterItem::Include {
                    field: field.to_string(),
                    values: include.clone(),
                });
            }
            if !exclude.is_empty() {
                items.push(FilterItem::Exclude {
                    field: field.to_string(),
                    values: exclude.clone(),
                });
            }
        }
        // Presence toggles anchor on the country field.
        if let Some(country) = fields.first() {
            if location.known {
                items.push(FilterItem::Exists {
                    field: country.to_string(),
                });
            }
            if location.unknown {
                items.push(FilterItem::Missing {
                    field: country.to_string(),
                });
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Deduplicate compiled items: first by `(field, value)` pair, then collapse
/// to at most one entry per field within each item kind, last write wins.
/// An include written later for a field replaces an earlier include entirely,
/// even a multi-value one.
fn dedup_items(items: Vec<FilterItem>) -> Vec<FilterItem> {
    let mut seen_include_pairs: AHashSet<(String, String)> = AHashSet::new();
    let mut seen_exclude_pairs: AHashSet<(String, String)> = AHashSet::new();
    let mut result: Vec<FilterItem> = Vec::new();

    for item in items {
        match item {
            FilterItem::Include { field, values } => {
                let values: Vec<String> = values
                    .into_iter()
                    .filter(|v| seen_include_pairs.insert((field.clone(), v.clone())))
                    .collect();
                replace_or_push(
                    &mut result,
                    FilterItem::Include {
                        field: field.clone(),
                        values,
                    },
                    |existing| matches!(existing, FilterItem::Include { field: f, .. } if *f == field),
                );
            }
            FilterItem::Exclude { field, values } => {
                let values: Vec<String> = values
                    .into_iter()
                    .filter(|v| seen_exclude_pairs.insert((field.clone(), v.clone())))
                    .collect();
                if values.is_empty() {
                    continue;
                }
                replace_or_push(
                    &mut result,
                    FilterItem::Exclude {
                        field: field.clone(),
                        values,
                    },
                    |existing| matches!(existing, FilterItem::Exclude { field: f, .. } if *f == field),
                );
            }
            FilterItem::Range { field, min, max } => {
                replace_or_push(
                    &mut result,
                    FilterItem::Range {
                        field: field.clone(),
                        min,
                        max,
                    },
                    |existing| matches!(existing, FilterItem::Range { field: f, .. } if *f == field),
                );
            }
            other => {
                if !result.contains(&other) {
                    result.push(other);
                }
            }
        }
    }
    result
}

fn replace_or_push<F>(items: &mut Vec<FilterItem>, item: FilterItem, matches: F)
where
    F: Fn(&FilterItem) -> bool,
{
    if let Some(existing) = items.iter_mut().find(|i| matches(i)) {
        *existing = item;
    } else {
        items.push(item);
    }
}

fn lower_items(items: Vec<FilterItem>) -> BoolClause {
    let mut clause = BoolClause::new();
    for item in items {
        match item {
            // An empty include still compiles to an empty terms filter:
            // cross-index resolution with zero domains must force zero
            // results, not fall back to "no filter".
            FilterItem::Include { field, values } => {
                clause.add_filter(Clause::terms(field, values));
            }
            FilterItem::Exclude { field, values } => {
                clause.add_must_not(Clause::terms(field, values));
            }
            FilterItem::Range { field, min, max } => {
                clause.add_filter(Clause::Range {
                    field,
                    gte: min,
                    lte: max,
                });
            }
            FilterItem::Exists { field } => {
                clause.add_filter(Clause::exists(field));
            }
            FilterItem::Missing { field } => {
                clause.add_must_not(Clause::exists(field));
            }
        }
    }
    clause
}

/// The source fields requested by the company-side resolution query.
pub fn resolution_source_fields() -> Vec<String> {
    vec!["company_domain".to_string(), "website".to_string()]
}

/// Extract the distinct domain set from company resolution hits.
pub fn collect_domains(sources: &[serde_json::Map<String, Value>]) -> Vec<String> {
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut domains = Vec::new();
    for source in sources {
        let candidate = source
            .get("company_domain")
            .or_else(|| source.get("website"))
            .and_then(Value::as_str);
        if let Some(domain) = candidate {
            let domain = domain.trim().to_ascii_lowercase();
            if !domain.is_empty() && seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
    }
    domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StaticDomainResolver;
    use serde_json::json;

    fn dsl(value: Value) -> FilterDsl {
        serde_json::from_value(value).unwrap()
    }

    fn compile(dsl_value: Value, entity: EntityType, domains: Vec<String>) -> BoolClause {
        let resolver = StaticDomainResolver::new(domains);
        FilterCompiler::builtin()
            .compile(&dsl(dsl_value), entity, &resolver)
            .unwrap()
    }

    #[test]
    fn test_include_exclude_sets() {
        let clause = compile(
            json!({ "contact": { "job_title": { "include": ["cto"], "exclude": ["intern"] } } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(
            clause.filter,
            vec![Clause::terms("job_title.keyword", vec!["cto".into()])]
        );
        assert_eq!(
            clause.must_not,
            vec![Clause::terms("job_title.keyword", vec!["intern".into()])]
        );
    }

    #[test]
    fn test_range_bounds_optional() {
        let clause = compile(
            json!({ "company": { "employee_count": { "min": 500 } } }),
            EntityType::Company,
            vec![],
        );
        assert_eq!(
            clause.filter,
            vec![Clause::Range {
                field: "employee_count".to_string(),
                gte: Some(500.0),
                lte: None,
            }]
        );
    }

    #[test]
    fn test_unknown_id_skipped() {
        let clause = compile(
            json!({ "contact": { "shoe_size": { "include": ["44"] } } }),
            EntityType::Contact,
            vec![],
        );
        assert!(clause.is_empty());
    }

    #[test]
    fn test_company_search_drops_contact_bucket() {
        let clause = compile(
            json!({
                "contact": { "job_title": { "include": ["cto"] } },
                "company": { "industry": { "include": ["saas"] } }
            }),
            EntityType::Company,
            vec![],
        );
        assert_eq!(clause.filter, vec![Clause::terms("industry", vec!["saas".into()])]);
        assert!(clause.must_not.is_empty());
    }

    #[test]
    fn test_cross_index_resolution_injects_domain_filter() {
        let clause = compile(
            json!({ "company": { "employee_count": { "min": 500 } } }),
            EntityType::Contact,
            vec!["a.com".into(), "b.com".into()],
        );
        assert_eq!(
            clause.filter,
            vec![Clause::terms("domain", vec!["a.com".into(), "b.com".into()])]
        );
    }

    #[test]
    fn test_empty_resolution_forces_zero_results() {
        let clause = compile(
            json!({ "company": { "employee_count": { "min": 500 } } }),
            EntityType::Contact,
            vec![],
        );
        // Empty terms filter, not "no filter".
        assert_eq!(clause.filter, vec![Clause::terms("domain", Vec::new())]);
    }

    #[test]
    fn test_location_expansion_per_bucket_context() {
        let clause = compile(
            json!({ "contact": { "location": {
                "include": { "countries": ["DE"], "cities": ["Berlin"] },
                "exclude": { "states": ["Bavaria"] }
            } } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(
            clause.filter,
            vec![
                Clause::terms("contact_country", vec!["DE".into()]),
                Clause::terms("contact_city", vec!["Berlin".into()]),
            ]
        );
        assert_eq!(
            clause.must_not,
            vec![Clause::terms("contact_state", vec!["Bavaria".into()])]
        );
    }

    #[test]
    fn test_location_known_unknown() {
        let clause = compile(
            json!({ "contact": { "location": { "known": true } } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(clause.filter, vec![Clause::exists("contact_country")]);

        let clause = compile(
            json!({ "contact": { "location": { "unknown": true } } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(clause.must_not, vec![Clause::exists("contact_country")]);
    }

    #[test]
    fn test_contact_location_wins_over_company_location() {
        // Same id in both buckets with a location shape: the company-scoped
        // one is dropped, so no resolution call is made at all.
        struct PanicResolver;
        impl DomainResolver for PanicResolver {
            fn resolve_domains(&self, _: &FilterBucket) -> Result<Vec<String>> {
                panic!("company location should have been dropped");
            }
        }

        let clause = FilterCompiler::builtin()
            .compile(
                &dsl(json!({
                    "contact": { "location": { "include": { "countries": ["DE"] } } },
                    "company": { "location": { "include": { "countries": ["US"] } } }
                })),
                EntityType::Contact,
                &PanicResolver,
            )
            .unwrap();
        assert_eq!(
            clause.filter,
            vec![Clause::terms("contact_country", vec!["DE".into()])]
        );
    }

    #[test]
    fn test_unknown_only_company_bucket_skips_resolution() {
        // A company bucket of unknown ids constrains nothing, so it must
        // behave exactly like an empty bucket: no resolution call, no
        // domain filter.
        struct PanicResolver;
        impl DomainResolver for PanicResolver {
            fn resolve_domains(&self, _: &FilterBucket) -> Result<Vec<String>> {
                panic!("unconstrained company bucket should not resolve");
            }
        }

        let clause = FilterCompiler::builtin()
            .compile(
                &dsl(json!({
                    "company": { "definitely_unknown_filter": { "include": ["x"] } }
                })),
                EntityType::Contact,
                &PanicResolver,
            )
            .unwrap();
        assert!(clause.is_empty());

        // Same for ids that exist but do not apply to companies.
        let clause = FilterCompiler::builtin()
            .compile(
                &dsl(json!({
                    "company": { "seniority": { "include": ["vp"] } }
                })),
                EntityType::Contact,
                &PanicResolver,
            )
            .unwrap();
        assert!(clause.is_empty());
    }

    #[test]
    fn test_dedup_last_write_wins_per_field() {
        // "countries" and "location" both resolve to contact_country;
        // BTreeMap iterates "countries" before "location", so the location
        // value wins.
        let clause = compile(
            json!({ "contact": {
                "countries": { "include": ["US"] },
                "location": { "include": { "countries": ["DE"] } }
            } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(
            clause.filter,
            vec![Clause::terms("contact_country", vec!["DE".into()])]
        );
    }

    #[test]
    fn test_dedup_drops_repeated_pairs() {
        let clause = compile(
            json!({ "contact": {
                "countries": { "include": ["DE", "US"] },
                "location": { "include": { "countries": ["DE", "FR"] } }
            } }),
            EntityType::Contact,
            vec![],
        );
        // Pair (contact_country, DE) was already seen, so the surviving
        // last-writer entry keeps only FR.
        assert_eq!(
            clause.filter,
            vec![Clause::terms("contact_country", vec!["FR".into()])]
        );
    }

    #[test]
    fn test_exists_kind_from_scalar() {
        let clause = compile(
            json!({ "contact": { "has_email": true } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(clause.filter, vec![Clause::exists("email")]);

        let clause = compile(
            json!({ "contact": { "has_phone": false } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(clause.must_not, vec![Clause::exists("phone_number")]);
    }

    #[test]
    fn test_scalar_shorthand_on_terms_kind() {
        let clause = compile(
            json!({ "contact": { "seniority": "vp" } }),
            EntityType::Contact,
            vec![],
        );
        assert_eq!(clause.filter, vec![Clause::terms("seniority", vec!["vp".into()])]);
    }

    #[test]
    fn test_collect_domains_distinct_and_normalized() {
        let sources = vec![
            serde_json::from_value(json!({ "company_domain": "Acme.com" })).unwrap(),
            serde_json::from_value(json!({ "website": "acme.com" })).unwrap(),
            serde_json::from_value(json!({ "website": "beta.io" })).unwrap(),
            serde_json::from_value(json!({ "name": "no domain" })).unwrap(),
        ];
        assert_eq!(collect_domains(&sources), vec!["acme.com", "beta.io"]);
    }
}
