//! Relevance scoring: per-entity field boosts and clause construction.

pub mod clauses;
pub mod fields;

pub use self::clauses::{ScoringClauseBuilder, TextQuery};
pub use self::fields::{FieldScoreRegistry, ScoringField};
