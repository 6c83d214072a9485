//! Collaborator seams at the boundary of the search core.
//!
//! The core never talks to a concrete engine client: it hands an
//! engine-native JSON body to an [`EntityIndex`], asks an
//! [`EmbeddingProvider`] for vectors, and reports diagnostics through an
//! injected [`SearchObserver`] instead of ambient global logging.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::EntityType;
use crate::error::Result;
use crate::filter::FilterBucket;

/// One raw hit as returned by the engine.
#[derive(Debug, Clone)]
pub struct RawHit {
    /// Document id.
    pub id: String,
    /// Engine relevance score, absent for pure filter queries.
    pub score: Option<f32>,
    /// The document source object.
    pub source: Map<String, Value>,
    /// Engine-provided highlight fragments, passed through verbatim.
    pub highlights: Option<Value>,
}

/// Raw engine results for one executed query.
#[derive(Debug, Clone, Default)]
pub struct RawHits {
    /// Hits in engine order.
    pub hits: Vec<RawHit>,
    /// Total matching documents.
    pub total: u64,
    /// Raw aggregation results keyed by filter id.
    pub aggregations: Map<String, Value>,
}

/// An entity index: one per entity type, independently indexed.
pub trait EntityIndex: Send + Sync {
    /// The read alias this index answers on.
    fn read_alias(&self) -> &str;

    /// Execute a native query body. Server-side aggregation failures must
    /// surface as [`crate::error::SearchError::BackendAggregation`];
    /// unreachable/5xx conditions as `BackendUnavailable`.
    fn execute(&self, body: &Value) -> Result<RawHits>;
}

/// Embedding collaborator for semantic queries. Failures degrade the search
/// to lexical-only; they never fail the request.
pub trait EmbeddingProvider: Send + Sync {
    fn generate(&self, text: &str) -> Result<Vec<f32>>;
}

/// Resolves a company filter bucket into the distinct set of domains the
/// matching companies own. Injected into the contact-side compiler so
/// cross-index resolution stays a pure, mockable seam.
pub trait DomainResolver {
    fn resolve_domains(&self, company_filters: &FilterBucket) -> Result<Vec<String>>;
}

/// A resolver over a fixed domain set. Useful in tests and for hosts that
/// precompute the set.
#[derive(Debug, Clone, Default)]
pub struct StaticDomainResolver {
    domains: Vec<String>,
}

impl StaticDomainResolver {
    pub fn new(domains: Vec<String>) -> Self {
        StaticDomainResolver { domains }
    }
}

impl DomainResolver for StaticDomainResolver {
    fn resolve_domains(&self, _company_filters: &FilterBucket) -> Result<Vec<String>> {
        Ok(self.domains.clone())
    }
}

/// A diagnostic event emitted during one search request.
#[derive(Debug, Clone)]
pub struct SearchEvent {
    /// Correlates every event of one request.
    pub request_id: Uuid,
    /// When the event occurred.
    pub at: DateTime<Utc>,
    pub kind: SearchEventKind,
}

impl SearchEvent {
    pub fn new(request_id: Uuid, kind: SearchEventKind) -> Self {
        SearchEvent {
            request_id,
            at: Utc::now(),
            kind,
        }
    }
}

/// The diagnostic event vocabulary.
#[derive(Debug, Clone)]
pub enum SearchEventKind {
    /// A search request entered the orchestrator.
    SearchRequested {
        entity: EntityType,
        free_text: Option<String>,
    },
    /// Cross-index resolution produced a domain set.
    DomainsResolved { count: usize },
    /// A query executed successfully.
    SearchExecuted { total: u64, degraded: bool },
    /// The aggregation-free retry was triggered.
    AggregationRetry { reason: String },
    /// The embedding collaborator failed; search degraded to lexical-only.
    EmbeddingFailed { reason: String },
    /// A cached response was served.
    CacheHit,
}

/// Observer for diagnostic events.
pub trait SearchObserver: Send + Sync {
    fn observe(&self, event: &SearchEvent);
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {
    fn observe(&self, _event: &SearchEvent) {}
}

/// Default observer forwarding events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SearchObserver for LogObserver {
    fn observe(&self, event: &SearchEvent) {
        let id = event.request_id;
        match &event.kind {
            SearchEventKind::SearchRequested { entity, free_text } => {
                log::debug!("[{id}] search requested: entity={entity} free_text={free_text:?}");
            }
            SearchEventKind::DomainsResolved { count } => {
                log::debug!("[{id}] cross-index resolution produced {count} domains");
            }
            SearchEventKind::SearchExecuted { total, degraded } => {
                log::debug!("[{id}] search executed: total={total} degraded={degraded}");
            }
            SearchEventKind::AggregationRetry { reason } => {
                log::warn!("[{id}] aggregation retry triggered: {reason}");
            }
            SearchEventKind::EmbeddingFailed { reason } => {
                log::warn!("[{id}] embedding failed, falling back to lexical search: {reason}");
            }
            SearchEventKind::CacheHit => {
                log::debug!("[{id}] response served from cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver_ignores_filters() {
        let resolver = StaticDomainResolver::new(vec!["a.com".into(), "b.com".into()]);
        let domains = resolver.resolve_domains(&FilterBucket::new()).unwrap();
        assert_eq!(domains, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_event_carries_request_id() {
        let id = Uuid::new_v4();
        let event = SearchEvent::new(id, SearchEventKind::CacheHit);
        assert_eq!(event.request_id, id);
    }
}
