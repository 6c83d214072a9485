//! Entity types searchable by the product.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// The two independently-indexed entity types.
///
/// The relationship is asymmetric: a contact search can be constrained by
/// company attributes (via cross-index resolution), but a company search
/// ignores contact-bucket filters. This is fixed contract behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Contact,
    Company,
}

impl EntityType {
    /// The read alias of the backing index for this entity type.
    pub fn read_alias(&self) -> &'static str {
        match self {
            EntityType::Contact => "contacts_read",
            EntityType::Company => "companies_read",
        }
    }

    /// The canonical domain field on this entity's index.
    ///
    /// Contacts carry their employer's domain in `domain`; companies store
    /// theirs in `company_domain`.
    pub fn domain_field(&self) -> &'static str {
        match self {
            EntityType::Contact => "domain",
            EntityType::Company => "company_domain",
        }
    }

    /// The normalized website field used by domain-literal search.
    pub fn website_field(&self) -> &'static str {
        match self {
            EntityType::Contact => "domain",
            EntityType::Company => "website",
        }
    }

    /// The LinkedIn-URL field used by domain-literal search.
    pub fn linkedin_field(&self) -> &'static str {
        match self {
            EntityType::Contact => "linkedin_url",
            EntityType::Company => "company_linkedin_url",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Contact => write!(f, "contact"),
            EntityType::Company => write!(f, "company"),
        }
    }
}

impl FromStr for EntityType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contact" | "contacts" => Ok(EntityType::Contact),
            "company" | "companies" => Ok(EntityType::Company),
            other => Err(SearchError::invalid_request(format!(
                "unknown entity type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_type() {
        assert_eq!("contact".parse::<EntityType>().unwrap(), EntityType::Contact);
        assert_eq!("Companies".parse::<EntityType>().unwrap(), EntityType::Company);
        assert!("widget".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_domain_fields() {
        assert_eq!(EntityType::Contact.domain_field(), "domain");
        assert_eq!(EntityType::Company.domain_field(), "company_domain");
    }
}
