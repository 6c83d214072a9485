//! Lowering free text into engine-native scoring clauses.
//!
//! Three strategies, chosen by input shape:
//!
//! - domain literal: exact/wildcard matches on canonical URL fields,
//! - general relevance: weighted exact + phrase clauses with a score floor,
//! - structured boolean: structural recursion over the parsed term tree.
//!
//! All strategies share one fuzzy multi-field clause as the fallback net so
//! bare terms always produce some relevance signal.

use serde_json::json;

use crate::entity::EntityType;
use crate::query::{BoolClause, Clause};
use crate::scoring::fields::FieldScoreRegistry;
use crate::term::{ParsedTerm, TermParser, TextStrategy};

/// Boost for the exact-term match on the website field in domain search.
const DOMAIN_WEBSITE_BOOST: f32 = 10.0;
/// Boost for the exact-term match on the LinkedIn-URL field.
const DOMAIN_LINKEDIN_BOOST: f32 = 8.0;
/// Boost for the wildcard fallback on the website field.
const DOMAIN_WILDCARD_BOOST: f32 = 5.0;

/// Multiplier over registry boost for exact-bucket clauses.
const EXACT_MULTIPLIER: f32 = 3.0;
/// Multiplier over registry boost for phrase-bucket clauses.
const PHRASE_MULTIPLIER: f32 = 2.0;
/// Slop applied to phrase clauses.
const PHRASE_SLOP: u32 = 1;
/// Floor relevance score for general searches.
const GENERAL_MIN_SCORE: f64 = 0.1;

/// The lexical portion of a compiled query.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    /// The scoring clause to merge into the root query.
    pub clause: Clause,
    /// Score floor, when the strategy applies one.
    pub min_score: Option<f64>,
}

/// Builds scoring clauses from raw query strings.
#[derive(Debug, Default)]
pub struct ScoringClauseBuilder {
    parser: TermParser,
}

impl ScoringClauseBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        ScoringClauseBuilder {
            parser: TermParser::new(),
        }
    }

    /// Build the lexical query for a raw free-text input, choosing the
    /// strategy by input shape.
    pub fn build(&self, entity: EntityType, text: &str) -> TextQuery {
        match TextStrategy::detect(text) {
            TextStrategy::Domain => TextQuery {
                clause: self.domain_clauses(entity, text),
                min_score: None,
            },
            TextStrategy::Structured => {
                // Malformed boolean input degrades to a bare term.
                let term = self.parser.parse_or_bare(text);
                TextQuery {
                    clause: self.lower(entity, &term),
                    min_score: None,
                }
            }
            TextStrategy::General => TextQuery {
                clause: self.general_clauses(entity, text),
                min_score: Some(GENERAL_MIN_SCORE),
            },
        }
    }

    /// Normalize a domain-like input: strip scheme and `www.`, drop any
    /// path, lowercase.
    pub fn normalize_domain(text: &str) -> String {
        let mut s = text.trim().to_ascii_lowercase();
        if let Some(idx) = s.find("://") {
            s = s[idx + 3..].to_string();
        }
        if let Some(stripped) = s.strip_prefix("www.") {
            s = stripped.to_string();
        }
        if let Some(idx) = s.find('/') {
            s.truncate(idx);
        }
        s
    }

    /// Strategy (a): domain-literal search over canonical URL fields.
    pub fn domain_clauses(&self, entity: EntityType, text: &str) -> Clause {
        let domain = Self::normalize_domain(text);
        if domain.is_empty() {
            return Clause::MatchAll;
        }

        let mut group = BoolClause::new().with_minimum_should_match(1);
        group.add_should(Clause::boosted_term(
            entity.website_field(),
            json!(domain),
            DOMAIN_WEBSITE_BOOST,
        ));
        group.add_should(Clause::boosted_term(
            entity.linkedin_field(),
            json!(domain),
            DOMAIN_LINKEDIN_BOOST,
        ));
        group.add_should(Clause::Wildcard {
            field: entity.website_field().to_string(),
            pattern: format!("*{domain}*"),
            boost: Some(DOMAIN_WILDCARD_BOOST),
        });
        Clause::Bool(group)
    }

    /// Strategy (b): general relevance search over the exact and phrase
    /// buckets plus the fuzzy fallback clause.
    pub fn general_clauses(&self, entity: EntityType, text: &str) -> Clause {
        let registry = FieldScoreRegistry::for_entity(entity);
        let mut group = BoolClause::new().with_minimum_should_match(1);

        for field in &registry.exact {
            group.add_should(Clause::boosted_term(
                field.field.clone(),
                json!(text),
                field.boost * EXACT_MULTIPLIER,
            ));
        }
        for field in &registry.phrase {
            group.add_should(Clause::MatchPhrase {
                field: field.field.clone(),
                value: text.to_string(),
                slop: PHRASE_SLOP,
                boost: Some(field.boost * PHRASE_MULTIPLIER),
            });
        }
        group.add_should(self.fuzzy_clause(entity, text));
        Clause::Bool(group)
    }

    /// Strategy (c): structural lowering of a parsed boolean query.
    pub fn lower(&self, entity: EntityType, term: &ParsedTerm) -> Clause {
        match term {
            ParsedTerm::And(children) => {
                let mut group = BoolClause::new();
                for child in children {
                    group.add_must(self.lower(entity, child));
                }
                Clause::Bool(group)
            }
            ParsedTerm::Or(children) => {
                let mut group = BoolClause::new().with_minimum_should_match(1);
                for child in children {
                    group.add_should(self.lower(entity, child));
                }
                Clause::Bool(group)
            }
            ParsedTerm::Phrase(phrase) => {
                let registry = FieldScoreRegistry::for_entity(entity);
                let mut group = BoolClause::new().with_minimum_should_match(1);
                for field in &registry.phrase {
                    group.add_should(Clause::MatchPhrase {
                        field: field.field.clone(),
                        value: phrase.clone(),
                        slop: PHRASE_SLOP,
                        boost: Some(field.boost * PHRASE_MULTIPLIER),
                    });
                }
                Clause::Bool(group)
            }
            ParsedTerm::Term(text) => {
                let registry = FieldScoreRegistry::for_entity(entity);
                let mut group = BoolClause::new().with_minimum_should_match(1);
                for field in &registry.exact {
                    group.add_should(Clause::boosted_term(
                        field.field.clone(),
                        json!(text),
                        field.boost * EXACT_MULTIPLIER,
                    ));
                }
                for field in &registry.prefix {
                    group.add_should(Clause::Match {
                        field: field.field.clone(),
                        value: text.clone(),
                        boost: Some(field.boost),
                    });
                }
                group.add_should(self.fuzzy_clause(entity, text));
                Clause::Bool(group)
            }
        }
    }

    /// The single multi-field fuzzy clause across the fuzzy bucket.
    pub fn fuzzy_clause(&self, entity: EntityType, text: &str) -> Clause {
        let registry = FieldScoreRegistry::for_entity(entity);
        Clause::MultiMatch {
            fields: registry.fuzzy.iter().map(|f| f.annotated()).collect(),
            value: text.to_string(),
            fuzziness: "AUTO".to_string(),
            prefix_length: 2,
            tie_breaker: 0.3,
        }
    }
}
