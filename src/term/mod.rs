//! Free-text query classification and parsing.

pub mod parser;

pub use self::parser::{TermParser, is_domain_like, is_structured};

/// A parsed free-text query.
///
/// Closed AST produced by [`TermParser`]: quoted substrings become `Phrase`
/// leaves, `AND`/`OR` become the two combinators, and everything else is a
/// bare `Term`. Lowering to engine clauses is a structural recursion over
/// this tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTerm {
    /// A bare term (one or more adjacent words without operators).
    Term(String),
    /// A quoted phrase.
    Phrase(String),
    /// All children must match.
    And(Vec<ParsedTerm>),
    /// At least one child must match.
    Or(Vec<ParsedTerm>),
}

/// Which text-search strategy a raw query string calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStrategy {
    /// The input looks like a domain or URL; search canonical URL fields.
    Domain,
    /// The input uses boolean syntax; parse and lower structurally.
    Structured,
    /// Plain words; weighted relevance search.
    General,
}

impl TextStrategy {
    /// Classify a raw query string. Evaluated in priority order: domain
    /// literal, then structured syntax, then general relevance.
    pub fn detect(text: &str) -> Self {
        if is_domain_like(text) {
            TextStrategy::Domain
        } else if is_structured(text) {
            TextStrategy::Structured
        } else {
            TextStrategy::General
        }
    }
}
