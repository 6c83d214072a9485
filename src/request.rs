//! Inbound search parameters.
//!
//! The core consumes a plain parameter map, not a specific transport. A
//! [`SearchRequest`] is the validated, clamped form: page bounds are always
//! clamped rather than rejected, and an empty search term is normalized to
//! absent.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::EntityType;
use crate::error::{Result, SearchError};
use crate::filter::FilterDsl;
use crate::query::{SortDirection, SortSpec};

/// Default page number.
pub const DEFAULT_PAGE: usize = 1;
/// Default page size.
pub const DEFAULT_PER_PAGE: usize = 10;
/// Upper bound on page size; larger requests are clamped, never rejected.
pub const MAX_PER_PAGE: usize = 100;

/// A validated search request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Which entity collection to search.
    pub entity_type: EntityType,
    /// Free-text query; empty input is normalized to `None`.
    pub free_text: Option<String>,
    /// Canonical filter DSL.
    pub filters: FilterDsl,
    /// Requested sort dimensions, applied before relevance order.
    pub sort: Vec<SortSpec>,
    /// 1-based page number, clamped to `[1, ∞)`.
    pub page: usize,
    /// Page size, clamped to `[1, 100]`.
    pub per_page: usize,
    /// Natural-language query for the vector clause.
    pub semantic_query: Option<String>,
    /// Opt-in: include the compiled native body and resolved index name in
    /// the response. Never enabled by default.
    pub debug: bool,
}

impl SearchRequest {
    /// Create a request with defaults.
    pub fn new(entity_type: EntityType) -> Self {
        SearchRequest {
            entity_type,
            free_text: None,
            filters: FilterDsl::new(),
            sort: Vec::new(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            semantic_query: None,
            debug: false,
        }
    }

    /// Set the free-text query.
    pub fn with_free_text<S: Into<String>>(mut self, text: S) -> Self {
        self.free_text = normalize_text(Some(text.into()));
        self
    }

    /// Set the filter DSL.
    pub fn with_filters(mut self, filters: FilterDsl) -> Self {
        self.filters = filters;
        self
    }

    /// Set pagination; both values are clamped.
    pub fn with_pagination(mut self, page: i64, per_page: i64) -> Self {
        self.page = clamp_page(page);
        self.per_page = clamp_per_page(per_page);
        self
    }

    /// Add a sort dimension.
    pub fn with_sort<F: Into<String>>(mut self, field: F, direction: SortDirection) -> Self {
        self.sort.push(SortSpec::new(field, direction));
        self
    }

    /// Set the semantic query.
    pub fn with_semantic_query<S: Into<String>>(mut self, query: S) -> Self {
        self.semantic_query = normalize_text(Some(query.into()));
        self
    }

    /// Enable debug output.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Offset of the first hit for this page.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.per_page
    }

    /// Parse a request from a transport-agnostic parameter map.
    ///
    /// `type` is required; everything else is optional with clamped
    /// defaults. Malformed filter DSL is an [`SearchError::InvalidRequest`],
    /// rejected before any engine call.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
        let entity_type: EntityType = params
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::invalid_request("missing required `type` parameter"))?
            .parse()?;

        let free_text = normalize_text(
            params
                .get("searchTerm")
                .or_else(|| params.get("q"))
                .and_then(Value::as_str)
                .map(str::to_string),
        );

        let filters = match params.get("filter_dsl") {
            None | Some(Value::Null) => FilterDsl::new(),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|e| SearchError::invalid_request(format!("malformed filter_dsl: {e}")))?,
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map_err(|e| SearchError::invalid_request(format!("malformed filter_dsl: {e}")))?,
            Some(other) => {
                return Err(SearchError::invalid_request(format!(
                    "filter_dsl must be an object, got: {other}"
                )));
            }
        };

        let semantic_query = normalize_text(
            params
                .get("semantic_query")
                .and_then(Value::as_str)
                .map(str::to_string),
        );

        let sort = params
            .get("sort")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(parse_sort_entry).collect())
            .unwrap_or_default();

        let page = clamp_page(int_param(params, "page").unwrap_or(DEFAULT_PAGE as i64));
        let per_page =
            clamp_per_page(int_param(params, "count").unwrap_or(DEFAULT_PER_PAGE as i64));

        let debug = matches!(params.get("debug"), Some(Value::Bool(true)))
            || params.get("debug").and_then(Value::as_str) == Some("true");

        Ok(SearchRequest {
            entity_type,
            free_text,
            filters,
            sort,
            page,
            per_page,
            semantic_query,
            debug,
        })
    }

    /// Deterministic cache key over the fully resolved request.
    pub fn cache_key(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let serialized = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = ahash::AHasher::default();
        serialized.hash(&mut hasher);
        hasher.finish()
    }
}

fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn clamp_page(page: i64) -> usize {
    page.max(1) as usize
}

fn clamp_per_page(per_page: i64) -> usize {
    per_page.clamp(1, MAX_PER_PAGE as i64) as usize
}

/// Integers may arrive as JSON numbers or numeric strings depending on the
/// transport.
fn int_param(params: &Map<String, Value>, key: &str) -> Option<i64> {
    match params.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_sort_entry(entry: &Value) -> Option<SortSpec> {
    let field = entry.get("field")?.as_str()?.to_string();
    let direction = match entry.get("direction").and_then(Value::as_str) {
        Some("desc") | Some("DESC") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };
    Some(SortSpec { field, direction })
}
