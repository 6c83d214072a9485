//! Normalizing raw engine hits into the stable response contract.
//!
//! Besides field cleanup (synonym merges, address derivation, email/phone
//! flattening) the formatter applies a secondary in-memory stable sort:
//! within a page, hits with a phone number come before hits without, then
//! hits with an email before hits without. Engine relevance order is
//! preserved otherwise. Data completeness matters more to end users here
//! than raw score.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::backend::{RawHit, RawHits};
use crate::entity::EntityType;
use crate::filter::FilterDsl;
use crate::request::SearchRequest;

/// One normalized hit.
#[derive(Debug, Clone, Serialize)]
pub struct FormattedHit {
    pub id: String,
    /// Legacy duplicate of `id` kept for existing consumers.
    #[serde(rename = "_id")]
    pub raw_id: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Value>,
    #[serde(skip_serializing)]
    has_email: bool,
    #[serde(skip_serializing)]
    has_phone: bool,
}

/// Pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: usize,
    pub per_page: usize,
    pub total: u64,
    pub last_page: u64,
}

/// Compiled-query details returned only when debug mode is explicitly
/// requested; leaks field-boost internals otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub query: Value,
    pub index: String,
}

/// The stable outbound contract.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub data: Vec<FormattedHit>,
    pub meta: PageMeta,
    /// The filter DSL echoed back.
    pub filters: FilterDsl,
    pub aggregations: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

/// Formats raw hits into the response contract.
#[derive(Debug, Default)]
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn new() -> Self {
        ResultFormatter
    }

    /// Build the full response for a request.
    pub fn format(
        &self,
        request: &SearchRequest,
        raw: RawHits,
        debug: Option<DebugInfo>,
    ) -> SearchResponse {
        let mut data: Vec<FormattedHit> = raw
            .hits
            .into_iter()
            .map(|hit| self.format_hit(request.entity_type, hit))
            .collect();
        secondary_sort(&mut data);

        let last_page = if raw.total == 0 {
            1
        } else {
            raw.total.div_ceil(request.per_page as u64)
        };

        SearchResponse {
            data,
            meta: PageMeta {
                current_page: request.page,
                per_page: request.per_page,
                total: raw.total,
                last_page,
            },
            filters: request.filters.clone(),
            aggregations: format_aggregations(raw.aggregations),
            debug,
        }
    }

    /// Normalize one hit.
    pub fn format_hit(&self, entity: EntityType, hit: RawHit) -> FormattedHit {
        let mut attributes = hit.source;

        merge_synonyms(entity, &mut attributes);
        derive_address(entity, &mut attributes);
        let (has_email, has_phone) = flatten_contact_channels(&mut attributes);

        attributes.insert("has_contact_email".to_string(), json!(has_email));
        attributes.insert("has_contact_phone".to_string(), json!(has_phone));

        FormattedHit {
            id: hit.id.clone(),
            raw_id: hit.id,
            attributes,
            highlights: hit.highlights,
            has_email,
            has_phone,
        }
    }
}

/// Merge synonymous fields: `company`/`name`, `domain`/`company_domain`,
/// and the `website` <- `domain` fallback chain.
fn merge_synonyms(entity: EntityType, attributes: &mut Map<String, Value>) {
    fill_from(attributes, "domain", &["company_domain"]);
    fill_from(attributes, "website", &["domain"]);
    match entity {
        EntityType::Contact => fill_from(attributes, "company", &["name"]),
        EntityType::Company => fill_from(attributes, "name", &["company"]),
    }
}

/// Set `key` from the first non-empty fallback when it is absent or empty.
fn fill_from(attributes: &mut Map<String, Value>, key: &str, fallbacks: &[&str]) {
    let present = attributes
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if present {
        return;
    }
    for fallback in fallbacks {
        if let Some(value) = attributes.get(*fallback).cloned() {
            if value.as_str().is_some_and(|s| !s.trim().is_empty()) {
                attributes.insert(key.to_string(), value);
                return;
            }
        }
    }
}

/// Derive `address` from component parts when the engine did not store a
/// precomposed one.
fn derive_address(entity: EntityType, attributes: &mut Map<String, Value>) {
    let present = attributes
        .get("address")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if present {
        return;
    }

    let prefix = match entity {
        EntityType::Contact => "contact",
        EntityType::Company => "company",
    };
    let parts: Vec<String> = ["street", "city", "state", "country"]
        .iter()
        .filter_map(|part| {
            let prefixed = format!("{prefix}_{part}");
            attributes
                .get(&prefixed)
                .or_else(|| attributes.get(*part))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();

    if !parts.is_empty() {
        attributes.insert("address".to_string(), json!(parts.join(", ")));
    }
}

/// Flatten nested `emails[]` / `phone_numbers[]` into typed convenience
/// fields with first-match-by-type semantics, and report presence.
fn flatten_contact_channels(attributes: &mut Map<String, Value>) -> (bool, bool) {
    let mut work_email = None;
    let mut personal_email = None;
    let mut any_email = attributes
        .get("email")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());

    if let Some(emails) = attributes.get("emails").and_then(Value::as_array) {
        for entry in emails {
            let Some(address) = entry.get("email").and_then(Value::as_str) else {
                continue;
            };
            if address.trim().is_empty() {
                continue;
            }
            any_email = true;
            match entry.get("type").and_then(Value::as_str) {
                Some("work") if work_email.is_none() => {
                    work_email = Some(address.to_string());
                }
                Some("personal") if personal_email.is_none() => {
                    personal_email = Some(address.to_string());
                }
                _ => {}
            }
        }
    }

    let mut mobile_phone = None;
    let mut any_phone = attributes
        .get("phone_number")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());

    if let Some(phones) = attributes.get("phone_numbers").and_then(Value::as_array) {
        for entry in phones {
            let Some(number) = entry.get("number").and_then(Value::as_str) else {
                continue;
            };
            if number.trim().is_empty() {
                continue;
            }
            any_phone = true;
            if mobile_phone.is_none()
                && entry.get("type").and_then(Value::as_str) == Some("mobile")
            {
                mobile_phone = Some(number.to_string());
            }
        }
    }

    if let Some(email) = work_email {
        attributes.insert("work_email".to_string(), json!(email));
    }
    if let Some(email) = personal_email {
        attributes.insert("personal_email".to_string(), json!(email));
    }
    if let Some(phone) = mobile_phone {
        attributes.insert("mobile_phone".to_string(), json!(phone));
    }

    (any_email, any_phone)
}

/// Stable: phone-holders first, then email-holders; engine order otherwise
/// preserved.
fn secondary_sort(hits: &mut [FormattedHit]) {
    hits.sort_by_key(|hit| (!hit.has_phone, !hit.has_email));
}

/// Format raw aggregation results by shape: bucket lists to `[{key, count}]`
/// in engine order, known/unknown filter buckets to `{known, unknown}`,
/// single-filter results to a bare count.
fn format_aggregations(raw: Map<String, Value>) -> Map<String, Value> {
    let mut formatted = Map::new();
    for (id, value) in raw {
        let entry = match value.get("buckets") {
            Some(Value::Array(buckets)) => {
                let list: Vec<Value> = buckets
                    .iter()
                    .map(|bucket| {
                        json!({
                            "key": bucket.get("key").cloned().unwrap_or(Value::Null),
                            "count": bucket.get("doc_count").cloned().unwrap_or(json!(0)),
                        })
                    })
                    .collect();
                json!(list)
            }
            Some(Value::Object(named)) => {
                let count_of = |name: &str| {
                    named
                        .get(name)
                        .and_then(|b| b.get("doc_count"))
                        .cloned()
                        .unwrap_or(json!(0))
                };
                json!({ "known": count_of("known"), "unknown": count_of("unknown") })
            }
            _ => match value.get("doc_count") {
                Some(count) => count.clone(),
                None => continue,
            },
        };
        formatted.insert(id, entry);
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, source: Value) -> RawHit {
        RawHit {
            id: id.to_string(),
            score: Some(1.0),
            source: source.as_object().unwrap().clone(),
            highlights: None,
        }
    }

    fn formatted(entity: EntityType, source: Value) -> FormattedHit {
        ResultFormatter::new().format_hit(entity, hit("1", source))
    }

    #[test]
    fn test_synonym_merges() {
        let hit = formatted(
            EntityType::Contact,
            json!({ "name": "Acme", "company_domain": "acme.com" }),
        );
        assert_eq!(hit.attributes["company"], json!("Acme"));
        assert_eq!(hit.attributes["domain"], json!("acme.com"));
        assert_eq!(hit.attributes["website"], json!("acme.com"));
    }

    #[test]
    fn test_existing_fields_not_overwritten() {
        let hit = formatted(
            EntityType::Contact,
            json!({ "company": "Beta", "name": "Acme", "website": "beta.io", "domain": "acme.com" }),
        );
        assert_eq!(hit.attributes["company"], json!("Beta"));
        assert_eq!(hit.attributes["website"], json!("beta.io"));
    }

    #[test]
    fn test_address_derived_from_parts() {
        let hit = formatted(
            EntityType::Contact,
            json!({ "contact_city": "Berlin", "contact_country": "DE" }),
        );
        assert_eq!(hit.attributes["address"], json!("Berlin, DE"));
    }

    #[test]
    fn test_email_phone_flattening_first_match_by_type() {
        let hit = formatted(
            EntityType::Contact,
            json!({
                "emails": [
                    { "email": "first@work.com", "type": "work" },
                    { "email": "second@work.com", "type": "work" },
                    { "email": "me@home.com", "type": "personal" }
                ],
                "phone_numbers": [
                    { "number": "+49 30 1", "type": "office" },
                    { "number": "+49 171 2", "type": "mobile" }
                ]
            }),
        );
        assert_eq!(hit.attributes["work_email"], json!("first@work.com"));
        assert_eq!(hit.attributes["personal_email"], json!("me@home.com"));
        assert_eq!(hit.attributes["mobile_phone"], json!("+49 171 2"));
        assert_eq!(hit.attributes["has_contact_email"], json!(true));
        assert_eq!(hit.attributes["has_contact_phone"], json!(true));
    }

    #[test]
    fn test_presence_flags_false_when_empty() {
        let hit = formatted(EntityType::Contact, json!({ "full_name": "Jo" }));
        assert_eq!(hit.attributes["has_contact_email"], json!(false));
        assert_eq!(hit.attributes["has_contact_phone"], json!(false));
    }

    #[test]
    fn test_secondary_sort_phone_then_email_stable() {
        let formatter = ResultFormatter::new();
        let mut hits = vec![
            formatter.format_hit(EntityType::Contact, hit("no-channels", json!({}))),
            formatter.format_hit(
                EntityType::Contact,
                hit("email-only", json!({ "email": "a@b.c" })),
            ),
            formatter.format_hit(
                EntityType::Contact,
                hit("phone-1", json!({ "phone_number": "+1" })),
            ),
            formatter.format_hit(
                EntityType::Contact,
                hit("phone-2", json!({ "phone_number": "+2" })),
            ),
        ];
        secondary_sort(&mut hits);
        let order: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        // Phones first (engine order preserved between them), then email,
        // then the rest.
        assert_eq!(order, vec!["phone-1", "phone-2", "email-only", "no-channels"]);
    }

    #[test]
    fn test_aggregation_formatting_shapes() {
        let raw: Map<String, Value> = serde_json::from_value(json!({
            "industry": { "buckets": [
                { "key": "saas", "doc_count": 12 },
                { "key": "fintech", "doc_count": 3 }
            ] },
            "has_email": { "buckets": {
                "known": { "doc_count": 9 },
                "unknown": { "doc_count": 6 }
            } },
            "premium": { "doc_count": 4 }
        }))
        .unwrap();

        let formatted = format_aggregations(raw);
        assert_eq!(
            formatted["industry"],
            json!([{ "key": "saas", "count": 12 }, { "key": "fintech", "count": 3 }])
        );
        assert_eq!(formatted["has_email"], json!({ "known": 9, "unknown": 6 }));
        assert_eq!(formatted["premium"], json!(4));
    }

    #[test]
    fn test_meta_last_page() {
        let request = SearchRequest::new(EntityType::Contact).with_pagination(2, 10);
        let raw = RawHits {
            hits: vec![],
            total: 25,
            aggregations: Map::new(),
        };
        let response = ResultFormatter::new().format(&request, raw, None);
        assert_eq!(response.meta.current_page, 2);
        assert_eq!(response.meta.last_page, 3);
        assert_eq!(response.meta.total, 25);

        let empty = RawHits::default();
        let response = ResultFormatter::new().format(&request, empty, None);
        assert_eq!(response.meta.last_page, 1);
    }
}
