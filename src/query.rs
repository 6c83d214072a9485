//! Engine-agnostic compiled query representation.
//!
//! [`CompiledQuery`] is the only artifact handed to the execution layer. It
//! serializes to the engine's native JSON query language without any further
//! business logic, so everything upstream (filter compilation, scoring,
//! aggregations) stays unit-testable as pure structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A single engine clause.
///
/// Clauses form a closed tree: leaf match/filter clauses plus the `Bool`
/// combinator. Lowering to the native JSON body is a structural recursion in
/// [`Clause::to_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact keyword equality on one field.
    Term {
        field: String,
        value: Value,
        boost: Option<f32>,
    },
    /// Set membership on one field.
    Terms { field: String, values: Vec<String> },
    /// Inclusive numeric range; either bound optional.
    Range {
        field: String,
        gte: Option<f64>,
        lte: Option<f64>,
    },
    /// Field presence.
    Exists { field: String },
    /// Analyzed full-text match (also used for edge-ngram prefix fields).
    Match {
        field: String,
        value: String,
        boost: Option<f32>,
    },
    /// Slop-tolerant phrase match.
    MatchPhrase {
        field: String,
        value: String,
        slop: u32,
        boost: Option<f32>,
    },
    /// One clause across several `field^boost` annotated fields with fuzzy
    /// expansion. The fallback net for bare terms.
    MultiMatch {
        fields: Vec<String>,
        value: String,
        fuzziness: String,
        prefix_length: u32,
        tie_breaker: f32,
    },
    /// Substring/wildcard pattern match.
    Wildcard {
        field: String,
        pattern: String,
        boost: Option<f32>,
    },
    /// Vector-similarity clause appended alongside the lexical query.
    Knn {
        field: String,
        vector: Vec<f32>,
        k: usize,
        boost: Option<f32>,
    },
    /// Matches every document.
    MatchAll,
    /// Nested boolean combinator.
    Bool(BoolClause),
}

impl Clause {
    /// Create a term clause without boost.
    pub fn term<F: Into<String>>(field: F, value: Value) -> Self {
        Clause::Term {
            field: field.into(),
            value,
            boost: None,
        }
    }

    /// Create a term clause with a boost factor.
    pub fn boosted_term<F: Into<String>>(field: F, value: Value, boost: f32) -> Self {
        Clause::Term {
            field: field.into(),
            value,
            boost: Some(boost),
        }
    }

    /// Create a terms (set membership) clause.
    pub fn terms<F: Into<String>>(field: F, values: Vec<String>) -> Self {
        Clause::Terms {
            field: field.into(),
            values,
        }
    }

    /// Create an exists clause.
    pub fn exists<F: Into<String>>(field: F) -> Self {
        Clause::Exists {
            field: field.into(),
        }
    }

    /// Lower this clause to the engine-native JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Clause::Term {
                field,
                value,
                boost,
            } => match boost {
                Some(b) => json!({ "term": { field: { "value": value, "boost": b } } }),
                None => json!({ "term": { field: value } }),
            },
            Clause::Terms { field, values } => json!({ "terms": { field: values } }),
            Clause::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), json!(gte));
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), json!(lte));
                }
                json!({ "range": { field: Value::Object(bounds) } })
            }
            Clause::Exists { field } => json!({ "exists": { "field": field } }),
            Clause::Match {
                field,
                value,
                boost,
            } => match boost {
                Some(b) => json!({ "match": { field: { "query": value, "boost": b } } }),
                None => json!({ "match": { field: value } }),
            },
            Clause::MatchPhrase {
                field,
                value,
                slop,
                boost,
            } => {
                let mut body = Map::new();
                body.insert("query".to_string(), json!(value));
                body.insert("slop".to_string(), json!(slop));
                if let Some(b) = boost {
                    body.insert("boost".to_string(), json!(b));
                }
                json!({ "match_phrase": { field: Value::Object(body) } })
            }
            Clause::MultiMatch {
                fields,
                value,
                fuzziness,
                prefix_length,
                tie_breaker,
            } => json!({
                "multi_match": {
                    "query": value,
                    "fields": fields,
                    "fuzziness": fuzziness,
                    "prefix_length": prefix_length,
                    "tie_breaker": tie_breaker,
                }
            }),
            Clause::Wildcard {
                field,
                pattern,
                boost,
            } => match boost {
                Some(b) => {
                    json!({ "wildcard": { field: { "value": pattern, "boost": b } } })
                }
                None => json!({ "wildcard": { field: pattern } }),
            },
            Clause::Knn {
                field,
                vector,
                k,
                boost,
            } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                body.insert("query_vector".to_string(), json!(vector));
                body.insert("k".to_string(), json!(k));
                if let Some(b) = boost {
                    body.insert("boost".to_string(), json!(b));
                }
                json!({ "knn": Value::Object(body) })
            }
            Clause::MatchAll => json!({ "match_all": {} }),
            Clause::Bool(inner) => inner.to_value(),
        }
    }
}

/// A boolean combinator over clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolClause {
    /// All of these must match and contribute to scoring.
    pub must: Vec<Clause>,
    /// None of these may match.
    pub must_not: Vec<Clause>,
    /// All of these must match; non-scoring.
    pub filter: Vec<Clause>,
    /// At least `minimum_should_match` of these must match.
    pub should: Vec<Clause>,
    /// Minimum number of should clauses that must match.
    pub minimum_should_match: Option<u32>,
}

impl BoolClause {
    /// Create a new empty boolean clause.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause.
    pub fn add_must(&mut self, clause: Clause) {
        self.must.push(clause);
    }

    /// Add a must_not clause.
    pub fn add_must_not(&mut self, clause: Clause) {
        self.must_not.push(clause);
    }

    /// Add a non-scoring filter clause.
    pub fn add_filter(&mut self, clause: Clause) {
        self.filter.push(clause);
    }

    /// Add a should clause.
    pub fn add_should(&mut self, clause: Clause) {
        self.should.push(clause);
    }

    /// Set the minimum number of should clauses that must match.
    pub fn with_minimum_should_match(mut self, minimum: u32) -> Self {
        self.minimum_should_match = Some(minimum);
        self
    }

    /// Check if this clause has no content at all.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
    }

    /// Merge another bool clause's content into this one.
    pub fn absorb(&mut self, other: BoolClause) {
        self.must.extend(other.must);
        self.must_not.extend(other.must_not);
        self.filter.extend(other.filter);
        self.should.extend(other.should);
        if other.minimum_should_match.is_some() {
            self.minimum_should_match = other.minimum_should_match;
        }
    }

    /// Lower to the engine-native `bool` JSON form.
    pub fn to_value(&self) -> Value {
        let mut body = Map::new();
        if !self.must.is_empty() {
            let clauses: Vec<Value> = self.must.iter().map(Clause::to_value).collect();
            body.insert("must".to_string(), json!(clauses));
        }
        if !self.must_not.is_empty() {
            let clauses: Vec<Value> = self.must_not.iter().map(Clause::to_value).collect();
            body.insert("must_not".to_string(), json!(clauses));
        }
        if !self.filter.is_empty() {
            let clauses: Vec<Value> = self.filter.iter().map(Clause::to_value).collect();
            body.insert("filter".to_string(), json!(clauses));
        }
        if !self.should.is_empty() {
            let clauses: Vec<Value> = self.should.iter().map(Clause::to_value).collect();
            body.insert("should".to_string(), json!(clauses));
            if let Some(msm) = self.minimum_should_match {
                body.insert("minimum_should_match".to_string(), json!(msm));
            }
        }
        json!({ "bool": Value::Object(body) })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One requested sort dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new<F: Into<String>>(field: F, direction: SortDirection) -> Self {
        SortSpec {
            field: field.into(),
            direction,
        }
    }
}

/// The complete compiled query handed to the execution layer.
#[derive(Debug, Clone, Default)]
pub struct CompiledQuery {
    /// The root boolean query.
    pub root: BoolClause,
    /// Floor relevance score; near-zero matches are dropped. Kept as `f64`
    /// so the serialized body carries the literal value, not a widened
    /// single-precision approximation.
    pub min_score: Option<f64>,
    /// Resolved sort entries, already mapped to sortable fields.
    pub sort: Vec<(String, SortDirection)>,
    /// Aggregation request bodies keyed by filter id.
    pub aggregations: Map<String, Value>,
    /// Offset into the result set.
    pub from: usize,
    /// Page size.
    pub size: usize,
    /// Restrict returned source fields (used by cross-index resolution).
    pub source_fields: Option<Vec<String>>,
}

impl CompiledQuery {
    /// Create a new empty compiled query.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this query with aggregations removed, for the degraded
    /// retry.
    pub fn without_aggregations(&self) -> Self {
        let mut degraded = self.clone();
        degraded.aggregations = Map::new();
        degraded
    }

    /// Serialize to the engine-native request body.
    pub fn body(&self) -> Value {
        let query = if self.root.is_empty() {
            Clause::MatchAll.to_value()
        } else {
            self.root.to_value()
        };

        let mut body = Map::new();
        body.insert("query".to_string(), query);
        if let Some(min_score) = self.min_score {
            body.insert("min_score".to_string(), json!(min_score));
        }
        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|(field, direction)| {
                    json!({ field: { "order": match direction {
                        SortDirection::Asc => "asc",
                        SortDirection::Desc => "desc",
                    } } })
                })
                .collect();
            body.insert("sort".to_string(), json!(sort));
        }
        if !self.aggregations.is_empty() {
            body.insert("aggs".to_string(), Value::Object(self.aggregations.clone()));
        }
        body.insert("from".to_string(), json!(self.from));
        body.insert("size".to_string(), json!(self.size));
        if let Some(fields) = &self.source_fields {
            body.insert("_source".to_string(), json!(fields));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_clause_to_value() {
        let clause = Clause::term("domain", json!("acme.com"));
        assert_eq!(clause.to_value(), json!({ "term": { "domain": "acme.com" } }));

        let boosted = Clause::boosted_term("domain", json!("acme.com"), 10.0);
        assert_eq!(
            boosted.to_value(),
            json!({ "term": { "domain": { "value": "acme.com", "boost": 10.0 } } })
        );
    }

    #[test]
    fn test_range_clause_omits_absent_bounds() {
        let clause = Clause::Range {
            field: "employee_count".to_string(),
            gte: Some(500.0),
            lte: None,
        };
        assert_eq!(
            clause.to_value(),
            json!({ "range": { "employee_count": { "gte": 500.0 } } })
        );
    }

    #[test]
    fn test_bool_clause_minimum_should_match() {
        let mut root = BoolClause::new().with_minimum_should_match(1);
        root.add_should(Clause::term("a", json!("x")));
        root.add_should(Clause::term("b", json!("y")));

        let value = root.to_value();
        assert_eq!(value["bool"]["minimum_should_match"], json!(1));
        assert_eq!(value["bool"]["should"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_minimum_should_match_omitted_without_should() {
        let mut root = BoolClause::new().with_minimum_should_match(1);
        root.add_filter(Clause::exists("domain"));

        let value = root.to_value();
        assert!(value["bool"].get("minimum_should_match").is_none());
    }

    #[test]
    fn test_empty_query_body_is_match_all() {
        let query = CompiledQuery::new();
        let body = query.body();
        assert_eq!(body["query"], json!({ "match_all": {} }));
    }

    #[test]
    fn test_without_aggregations_preserves_query() {
        let mut query = CompiledQuery::new();
        query.root.add_filter(Clause::terms("domain", vec!["a.com".into()]));
        query
            .aggregations
            .insert("industry".to_string(), json!({ "terms": { "field": "industry" } }));

        let degraded = query.without_aggregations();
        assert!(degraded.aggregations.is_empty());
        assert_eq!(degraded.root, query.root);
    }

    #[test]
    fn test_min_score_serializes_exactly() {
        let mut query = CompiledQuery::new();
        query.min_score = Some(0.1);
        assert_eq!(query.body()["min_score"], json!(0.1));
    }

    #[test]
    fn test_body_pagination_and_sort() {
        let mut query = CompiledQuery::new();
        query.from = 20;
        query.size = 10;
        query
            .sort
            .push(("employee_count".to_string(), SortDirection::Desc));

        let body = query.body();
        assert_eq!(body["from"], json!(20));
        assert_eq!(body["size"], json!(10));
        assert_eq!(
            body["sort"],
            json!([{ "employee_count": { "order": "desc" } }])
        );
    }
}
