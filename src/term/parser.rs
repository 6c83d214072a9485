//! Recursive-descent parser for the boolean query grammar.
//!
//! Supported syntax:
//! - Bare terms: `data engineer`
//! - Phrases: `"head of sales"`
//! - Boolean operators: `java AND berlin`, `cto OR founder`
//! - Parentheses: `(java OR python) AND berlin`
//!
//! Malformed input (unbalanced quotes or parentheses, dangling operators)
//! fails with a syntax error. Callers fall back to treating the whole input
//! as a bare term; the error never reaches the end user.

use std::iter::Peekable;
use std::str::Chars;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SearchError};
use crate::term::ParsedTerm;

lazy_static! {
    static ref DOMAIN_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9-]+\.[a-zA-Z]{2,}$").expect("domain regex");
}

/// True when the raw query looks like a domain or URL rather than words.
///
/// Checked before any parsing; domain literals bypass the grammar entirely.
pub fn is_domain_like(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("www") || lower.contains("http") {
        return true;
    }
    if DOMAIN_RE.is_match(trimmed) {
        return true;
    }
    // A single whitespace-free token with an interior dot still reads as a
    // host name ("app.acme.co.uk").
    trimmed.contains('.') && !trimmed.contains(char::is_whitespace)
}

/// True when the raw query uses boolean syntax (quotes, parens, AND/OR).
pub fn is_structured(text: &str) -> bool {
    if text.contains('"') || text.contains('(') || text.contains(')') {
        return true;
    }
    text.split_whitespace().any(|w| w == "AND" || w == "OR")
}

/// Parser for free-text boolean queries.
#[derive(Debug, Default)]
pub struct TermParser;

impl TermParser {
    /// Create a new parser.
    pub fn new() -> Self {
        TermParser
    }

    /// Parse a query string into a [`ParsedTerm`] tree.
    ///
    /// Empty input is a syntax error; so is any unbalanced quote or paren.
    pub fn parse(&self, text: &str) -> Result<ParsedTerm> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SearchError::syntax("empty query"));
        }

        let mut parser = TermStringParser::new(trimmed);
        let term = parser.parse_or_expression()?;
        parser.skip_whitespace();
        if parser.chars.peek().is_some() {
            return Err(SearchError::syntax(format!(
                "unexpected trailing input in query: {trimmed:?}"
            )));
        }
        Ok(term)
    }

    /// Parse with the fallback contract from the detection policy: malformed
    /// structured input degrades to a single bare term of the whole string.
    pub fn parse_or_bare(&self, text: &str) -> ParsedTerm {
        match self.parse(text) {
            Ok(term) => term,
            Err(_) => ParsedTerm::Term(text.trim().to_string()),
        }
    }
}

/// Internal character-level parser.
struct TermStringParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> TermStringParser<'a> {
    fn new(text: &'a str) -> Self {
        TermStringParser {
            chars: text.chars().peekable(),
        }
    }

    /// OR has the lowest precedence.
    fn parse_or_expression(&mut self) -> Result<ParsedTerm> {
        let mut children = vec![self.parse_and_expression()?];

        while self.peek_operator() == Some("OR") {
            self.consume_operator("OR");
            children.push(self.parse_and_expression()?);
        }

        if children.len() == 1 {
            Ok(children.pop().expect("one child"))
        } else {
            Ok(ParsedTerm::Or(children))
        }
    }

    fn parse_and_expression(&mut self) -> Result<ParsedTerm> {
        let mut children = vec![self.parse_primary()?];

        while self.peek_operator() == Some("AND") {
            self.consume_operator("AND");
            children.push(self.parse_primary()?);
        }

        if children.len() == 1 {
            Ok(children.pop().expect("one child"))
        } else {
            Ok(ParsedTerm::And(children))
        }
    }

    fn parse_primary(&mut self) -> Result<ParsedTerm> {
        self.skip_whitespace();

        match self.chars.peek() {
            None => Err(SearchError::syntax("expected a term, found end of input")),
            Some('(') => {
                self.chars.next();
                let inner = self.parse_or_expression()?;
                self.skip_whitespace();
                if self.chars.next() != Some(')') {
                    return Err(SearchError::syntax("unbalanced parenthesis"));
                }
                Ok(inner)
            }
            Some(')') => Err(SearchError::syntax("unexpected closing parenthesis")),
            Some('"') => self.parse_phrase(),
            Some(_) => self.parse_bare_term(),
        }
    }

    fn parse_phrase(&mut self) -> Result<ParsedTerm> {
        // Consume opening quote
        self.chars.next();

        let mut phrase = String::new();
        let mut closed = false;
        for ch in self.chars.by_ref() {
            if ch == '"' {
                closed = true;
                break;
            }
            phrase.push(ch);
        }

        if !closed {
            return Err(SearchError::syntax("unbalanced quote"));
        }
        let phrase = phrase.trim().to_string();
        if phrase.is_empty() {
            return Err(SearchError::syntax("empty phrase"));
        }
        Ok(ParsedTerm::Phrase(phrase))
    }

    /// Accumulate adjacent bare words into a single term, stopping at an
    /// operator, a paren, or a quote.
    fn parse_bare_term(&mut self) -> Result<ParsedTerm> {
        let mut words: Vec<String> = Vec::new();

        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                None | Some('(') | Some(')') | Some('"') => break,
                Some(_) => {}
            }
            if self.peek_operator().is_some() {
                break;
            }

            let mut word = String::new();
            while let Some(ch) = self.chars.peek() {
                if ch.is_whitespace() || *ch == '(' || *ch == ')' || *ch == '"' {
                    break;
                }
                word.push(self.chars.next().expect("peeked"));
            }
            if word.is_empty() {
                break;
            }
            words.push(word);
        }

        if words.is_empty() {
            return Err(SearchError::syntax("expected a term"));
        }
        Ok(ParsedTerm::Term(words.join(" ")))
    }

    fn peek_operator(&mut self) -> Option<&'static str> {
        self.skip_whitespace();
        let remaining: String = self.chars.clone().collect();

        for op in ["AND", "OR"] {
            if remaining.starts_with(op) {
                let boundary = remaining.chars().nth(op.len());
                if boundary.is_none_or(|c| c.is_whitespace() || c == '(' || c == '"') {
                    return Some(op);
                }
            }
        }
        None
    }

    fn consume_operator(&mut self, op: &str) {
        for _ in 0..op.len() {
            self.chars.next();
        }
        self.skip_whitespace();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_detection() {
        assert!(is_domain_like("example.com"));
        assert!(is_domain_like("www.acme.io"));
        assert!(is_domain_like("http://foo.dev"));
        assert!(is_domain_like("app.acme.co.uk"));
        assert!(!is_domain_like("software engineer"));
        assert!(!is_domain_like("Sr. Engineer"));
        assert!(!is_domain_like(""));
    }

    #[test]
    fn test_structured_detection() {
        assert!(is_structured("\"head of sales\""));
        assert!(is_structured("java AND berlin"));
        assert!(is_structured("(cto OR founder)"));
        assert!(!is_structured("android developer"));
        // Lowercase operators are plain words.
        assert!(!is_structured("sales and marketing"));
    }

    #[test]
    fn test_parse_bare_term() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("data engineer").unwrap(),
            ParsedTerm::Term("data engineer".to_string())
        );
    }

    #[test]
    fn test_parse_phrase() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("\"head of sales\"").unwrap(),
            ParsedTerm::Phrase("head of sales".to_string())
        );
    }

    #[test]
    fn test_parse_and_of_phrases() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("\"A\" AND \"B\"").unwrap(),
            ParsedTerm::And(vec![
                ParsedTerm::Phrase("A".to_string()),
                ParsedTerm::Phrase("B".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_or() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("cto OR founder").unwrap(),
            ParsedTerm::Or(vec![
                ParsedTerm::Term("cto".to_string()),
                ParsedTerm::Term("founder".to_string()),
            ])
        );
    }

    #[test]
    fn test_parens_resolve_before_and() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("(A OR B) AND C").unwrap(),
            ParsedTerm::And(vec![
                ParsedTerm::Or(vec![
                    ParsedTerm::Term("A".to_string()),
                    ParsedTerm::Term("B".to_string()),
                ]),
                ParsedTerm::Term("C".to_string()),
            ])
        );
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("A AND B OR C").unwrap(),
            ParsedTerm::Or(vec![
                ParsedTerm::And(vec![
                    ParsedTerm::Term("A".to_string()),
                    ParsedTerm::Term("B".to_string()),
                ]),
                ParsedTerm::Term("C".to_string()),
            ])
        );
    }

    #[test]
    fn test_unbalanced_quote_is_syntax_error() {
        let parser = TermParser::new();
        assert!(matches!(
            parser.parse("\"head of sales"),
            Err(SearchError::QuerySyntax(_))
        ));
    }

    #[test]
    fn test_unbalanced_paren_is_syntax_error() {
        let parser = TermParser::new();
        assert!(parser.parse("(cto OR founder").is_err());
        assert!(parser.parse("cto OR founder)").is_err());
    }

    #[test]
    fn test_dangling_operator_is_syntax_error() {
        let parser = TermParser::new();
        assert!(parser.parse("cto AND").is_err());
        assert!(parser.parse("OR cto").is_err());
    }

    #[test]
    fn test_parse_or_bare_fallback() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse_or_bare("\"unterminated"),
            ParsedTerm::Term("\"unterminated".to_string())
        );
    }

    #[test]
    fn test_adjacent_words_around_operator() {
        let parser = TermParser::new();
        assert_eq!(
            parser.parse("big data AND london").unwrap(),
            ParsedTerm::And(vec![
                ParsedTerm::Term("big data".to_string()),
                ParsedTerm::Term("london".to_string()),
            ])
        );
    }

    #[test]
    fn test_strategy_detection_priority() {
        use crate::term::TextStrategy;

        // Domain wins over structured-looking content.
        assert_eq!(TextStrategy::detect("www.acme.io"), TextStrategy::Domain);
        assert_eq!(
            TextStrategy::detect("java AND berlin"),
            TextStrategy::Structured
        );
        assert_eq!(
            TextStrategy::detect("data engineer"),
            TextStrategy::General
        );
    }
}
