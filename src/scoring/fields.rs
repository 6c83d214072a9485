//! Per-entity field boost registry.
//!
//! Each entity type declares which fields participate in free-text
//! relevance and at what relative weight, partitioned into four disjoint
//! buckets. The registry is static configuration, loaded once and shared
//! read-only across requests.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// One field participating in relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringField {
    /// Index field name.
    pub field: String,
    /// Relative boost; always positive.
    pub boost: f32,
}

impl ScoringField {
    pub fn new<F: Into<String>>(field: F, boost: f32) -> Self {
        debug_assert!(boost > 0.0);
        ScoringField {
            field: field.into(),
            boost,
        }
    }

    /// The `field^boost` annotation used by multi-field clauses.
    pub fn annotated(&self) -> String {
        format!("{}^{}", self.field, self.boost)
    }
}

/// The four scoring buckets for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldScoreRegistry {
    /// Keyword-equality fields.
    pub exact: Vec<ScoringField>,
    /// Slop-tolerant phrase fields.
    pub phrase: Vec<ScoringField>,
    /// Edge-ngram prefix fields.
    pub prefix: Vec<ScoringField>,
    /// Broad relevance fields used by the fuzzy fallback clause.
    pub fuzzy: Vec<ScoringField>,
}

impl FieldScoreRegistry {
    /// The built-in registry for an entity type.
    pub fn for_entity(entity: EntityType) -> &'static FieldScoreRegistry {
        match entity {
            EntityType::Contact => &CONTACT_FIELDS,
            EntityType::Company => &COMPANY_FIELDS,
        }
    }
}

lazy_static! {
    static ref CONTACT_FIELDS: FieldScoreRegistry = FieldScoreRegistry {
        exact: vec![
            ScoringField::new("full_name.keyword", 5.0),
            ScoringField::new("job_title.keyword", 4.0),
            ScoringField::new("company.keyword", 3.0),
            ScoringField::new("contact_city.keyword", 2.0),
            ScoringField::new("contact_country.keyword", 2.0),
        ],
        phrase: vec![
            ScoringField::new("full_name", 4.0),
            ScoringField::new("job_title", 3.0),
            ScoringField::new("company", 2.0),
        ],
        prefix: vec![
            ScoringField::new("full_name.prefix", 3.0),
            ScoringField::new("company.prefix", 2.0),
        ],
        fuzzy: vec![
            ScoringField::new("full_name", 3.0),
            ScoringField::new("job_title", 2.0),
            ScoringField::new("company", 2.0),
            ScoringField::new("skills", 1.0),
        ],
    };
    static ref COMPANY_FIELDS: FieldScoreRegistry = FieldScoreRegistry {
        exact: vec![
            ScoringField::new("name.keyword", 5.0),
            ScoringField::new("industry.keyword", 3.0),
            ScoringField::new("company_city.keyword", 2.0),
            ScoringField::new("company_country.keyword", 2.0),
        ],
        phrase: vec![
            ScoringField::new("name", 4.0),
            ScoringField::new("industry", 2.0),
            ScoringField::new("description", 1.0),
        ],
        prefix: vec![ScoringField::new("name.prefix", 3.0)],
        fuzzy: vec![
            ScoringField::new("name", 3.0),
            ScoringField::new("industry", 2.0),
            ScoringField::new("description", 1.0),
        ],
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_buckets_nonempty() {
        for entity in [EntityType::Contact, EntityType::Company] {
            let registry = FieldScoreRegistry::for_entity(entity);
            assert!(!registry.exact.is_empty());
            assert!(!registry.phrase.is_empty());
            assert!(!registry.prefix.is_empty());
            assert!(!registry.fuzzy.is_empty());
        }
    }

    #[test]
    fn test_boosts_positive() {
        for entity in [EntityType::Contact, EntityType::Company] {
            let registry = FieldScoreRegistry::for_entity(entity);
            for bucket in [
                &registry.exact,
                &registry.phrase,
                &registry.prefix,
                &registry.fuzzy,
            ] {
                assert!(bucket.iter().all(|f| f.boost > 0.0));
            }
        }
    }

    #[test]
    fn test_annotated_field() {
        let field = ScoringField::new("full_name", 3.0);
        assert_eq!(field.annotated(), "full_name^3");
    }
}
