//! Declarative catalog of every supported filter.
//!
//! The registry is the single source of truth consulted by both the filter
//! compiler and the aggregation builder: adding a filter is a new entry
//! here, never a compiler change. Entries are static configuration, loaded
//! once per process and shared read-only across requests.

use lazy_static::lazy_static;

use crate::entity::EntityType;

/// How a filter's value compiles into engine clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Set membership (`terms` filter / must_not). Also accepts the nested
    /// location shape, expanded over the entry's field triple.
    Terms,
    /// Inclusive numeric range.
    Range,
    /// Field presence toggled by a boolean scalar.
    Exists,
}

/// One named bucket of a range aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBucket {
    pub key: &'static str,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

impl RangeBucket {
    pub const fn new(key: &'static str, from: Option<f64>, to: Option<f64>) -> Self {
        RangeBucket { key, from, to }
    }
}

/// Aggregation configuration for a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    /// Distinct-value buckets; zero-count buckets still surface so the UI
    /// can keep unselected options visible.
    Terms { size: usize },
    /// Buckets over registry-declared numeric boundaries.
    Range { ranges: Vec<RangeBucket> },
    /// Two-bucket known/unknown presence counts.
    Presence,
}

/// One filter definition.
#[derive(Debug, Clone)]
pub struct FilterRegistryEntry {
    /// Stable filter id used in the DSL and the aggregation response.
    pub id: &'static str,
    /// Entity types this filter applies to.
    pub applies_to: &'static [EntityType],
    /// Field mapping per entity context. For location-kind entries the list
    /// is the (country, state, city) triple, in that order.
    pub fields: &'static [(EntityType, &'static [&'static str])],
    /// How values compile.
    pub value_kind: ValueKind,
    /// Facet configuration, when this filter is faceted.
    pub aggregation: Option<AggregationKind>,
    /// Inactive entries are ignored everywhere.
    pub active: bool,
}

impl FilterRegistryEntry {
    /// Resolve the fields for an entity context.
    pub fn fields_for(&self, entity: EntityType) -> Option<&'static [&'static str]> {
        self.fields
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, fields)| *fields)
    }

    /// The primary field for an entity context.
    pub fn primary_field(&self, entity: EntityType) -> Option<&'static str> {
        self.fields_for(entity).and_then(|fields| fields.first().copied())
    }

    /// Whether this filter applies to the given entity type.
    pub fn applies_to(&self, entity: EntityType) -> bool {
        self.applies_to.contains(&entity)
    }
}

/// The filter catalog.
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    entries: Vec<FilterRegistryEntry>,
}

impl FilterRegistry {
    /// Create a registry from explicit entries (used by tests and by hosts
    /// that load the catalog from an external store).
    pub fn new(entries: Vec<FilterRegistryEntry>) -> Self {
        FilterRegistry { entries }
    }

    /// The built-in catalog.
    pub fn builtin() -> &'static FilterRegistry {
        &BUILTIN_REGISTRY
    }

    /// Look up an entry by id. Unknown ids yield `None`, never an error.
    pub fn get(&self, id: &str) -> Option<&FilterRegistryEntry> {
        self.entries.iter().find(|e| e.id == id && e.active)
    }

    /// Iterate over all active entries.
    pub fn iter(&self) -> impl Iterator<Item = &FilterRegistryEntry> {
        self.entries.iter().filter(|e| e.active)
    }
}

const BOTH: &[EntityType] = &[EntityType::Contact, EntityType::Company];
const CONTACT_ONLY: &[EntityType] = &[EntityType::Contact];
const COMPANY_ONLY: &[EntityType] = &[EntityType::Company];

lazy_static! {
    static ref BUILTIN_REGISTRY: FilterRegistry = FilterRegistry::new(vec![
        FilterRegistryEntry {
            id: "job_title",
            applies_to: CONTACT_ONLY,
            fields: &[(EntityType::Contact, &["job_title.keyword"])],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 25 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "seniority",
            applies_to: CONTACT_ONLY,
            fields: &[(EntityType::Contact, &["seniority"])],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 15 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "department",
            applies_to: CONTACT_ONLY,
            fields: &[(EntityType::Contact, &["department"])],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 20 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "skills",
            applies_to: CONTACT_ONLY,
            fields: &[(EntityType::Contact, &["skills"])],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 25 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "has_email",
            applies_to: CONTACT_ONLY,
            fields: &[(EntityType::Contact, &["email"])],
            value_kind: ValueKind::Exists,
            aggregation: Some(AggregationKind::Presence),
            active: true,
        },
        FilterRegistryEntry {
            id: "has_phone",
            applies_to: CONTACT_ONLY,
            fields: &[(EntityType::Contact, &["phone_number"])],
            value_kind: ValueKind::Exists,
            aggregation: Some(AggregationKind::Presence),
            active: true,
        },
        FilterRegistryEntry {
            id: "location",
            applies_to: BOTH,
            fields: &[
                (
                    EntityType::Contact,
                    &["contact_country", "contact_state", "contact_city"],
                ),
                (
                    EntityType::Company,
                    &["company_country", "company_state", "company_city"],
                ),
            ],
            value_kind: ValueKind::Terms,
            aggregation: None,
            active: true,
        },
        FilterRegistryEntry {
            id: "countries",
            applies_to: BOTH,
            fields: &[
                (EntityType::Contact, &["contact_country"]),
                (EntityType::Company, &["company_country"]),
            ],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 50 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "industry",
            applies_to: BOTH,
            fields: &[
                (EntityType::Contact, &["industry"]),
                (EntityType::Company, &["industry"]),
            ],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 25 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "company_type",
            applies_to: COMPANY_ONLY,
            fields: &[
                (EntityType::Contact, &["company_type"]),
                (EntityType::Company, &["company_type"]),
            ],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 10 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "technologies",
            applies_to: COMPANY_ONLY,
            fields: &[(EntityType::Company, &["technologies"])],
            value_kind: ValueKind::Terms,
            aggregation: Some(AggregationKind::Terms { size: 25 }),
            active: true,
        },
        FilterRegistryEntry {
            id: "domain",
            applies_to: BOTH,
            fields: &[
                (EntityType::Contact, &["domain"]),
                (EntityType::Company, &["company_domain"]),
            ],
            value_kind: ValueKind::Terms,
            aggregation: None,
            active: true,
        },
        FilterRegistryEntry {
            id: "employee_count",
            applies_to: BOTH,
            fields: &[
                (EntityType::Contact, &["employee_count"]),
                (EntityType::Company, &["employee_count"]),
            ],
            value_kind: ValueKind::Range,
            aggregation: Some(AggregationKind::Range {
                ranges: vec![
                    RangeBucket::new("1-10", Some(1.0), Some(11.0)),
                    RangeBucket::new("11-50", Some(11.0), Some(51.0)),
                    RangeBucket::new("51-200", Some(51.0), Some(201.0)),
                    RangeBucket::new("201-500", Some(201.0), Some(501.0)),
                    RangeBucket::new("501-1000", Some(501.0), Some(1001.0)),
                    RangeBucket::new("1001-5000", Some(1001.0), Some(5001.0)),
                    RangeBucket::new("5001+", Some(5001.0), None),
                ],
            }),
            active: true,
        },
        FilterRegistryEntry {
            id: "revenue",
            applies_to: COMPANY_ONLY,
            fields: &[
                (EntityType::Contact, &["revenue"]),
                (EntityType::Company, &["revenue"]),
            ],
            value_kind: ValueKind::Range,
            aggregation: Some(AggregationKind::Range {
                ranges: vec![
                    RangeBucket::new("<1M", None, Some(1_000_000.0)),
                    RangeBucket::new("1M-10M", Some(1_000_000.0), Some(10_000_000.0)),
                    RangeBucket::new("10M-100M", Some(10_000_000.0), Some(100_000_000.0)),
                    RangeBucket::new("100M+", Some(100_000_000.0), None),
                ],
            }),
            active: true,
        },
        FilterRegistryEntry {
            id: "founding_year",
            applies_to: COMPANY_ONLY,
            fields: &[(EntityType::Company, &["founding_year"])],
            value_kind: ValueKind::Range,
            aggregation: None,
            active: true,
        },
        FilterRegistryEntry {
            id: "funding_total",
            applies_to: COMPANY_ONLY,
            fields: &[(EntityType::Company, &["funding_total"])],
            value_kind: ValueKind::Range,
            aggregation: Some(AggregationKind::Range {
                ranges: vec![
                    RangeBucket::new("<1M", None, Some(1_000_000.0)),
                    RangeBucket::new("1M-10M", Some(1_000_000.0), Some(10_000_000.0)),
                    RangeBucket::new("10M+", Some(10_000_000.0), None),
                ],
            }),
            active: true,
        },
    ]);
}
