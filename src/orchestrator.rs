//! Request orchestration: compose, execute, degrade, format.
//!
//! One search request is one synchronous, stateless pass: compile filters
//! (with an optional cross-index resolution call), build scoring and
//! aggregations, execute, and on an aggregation-class backend error retry
//! exactly once without aggregations. Any other failure propagates. The
//! registries are read-only configuration shared across concurrent requests
//! without locking; the only mutable state is the optional response cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::aggs::AggregationBuilder;
use crate::backend::{
    DomainResolver, EmbeddingProvider, EntityIndex, LogObserver, SearchEvent, SearchEventKind,
    SearchObserver,
};
use crate::entity::EntityType;
use crate::error::{Result, SearchError};
use crate::filter::compiler::{DOMAIN_RESOLUTION_LIMIT, collect_domains, resolution_source_fields};
use crate::filter::{FilterBucket, FilterCompiler, FilterRegistry};
use crate::format::{DebugInfo, ResultFormatter, SearchResponse};
use crate::query::{Clause, CompiledQuery, SortDirection};
use crate::request::SearchRequest;
use crate::scoring::ScoringClauseBuilder;

/// Fields that sort on the raw value. Everything else sorts on a `.sort`
/// normalized-keyword sub-field because free-text fields are not directly
/// sortable.
const NUMERIC_SORT_FIELDS: &[&str] = &[
    "employee_count",
    "revenue",
    "founding_year",
    "funding_amount",
    "funding_total",
];

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Response cache TTL; `None` disables caching. Only enable for
    /// anonymous callers.
    pub cache_ttl: Option<Duration>,
    /// Vector field targeted by semantic clauses.
    pub knn_field: String,
    /// Neighbor count requested from the vector clause.
    pub knn_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            cache_ttl: None,
            knn_field: "embedding".to_string(),
            knn_k: 100,
        }
    }
}

struct CacheEntry {
    response: SearchResponse,
    stored_at: Instant,
}

/// Composes the compiler, scoring builder and aggregation builder into one
/// request, executes it, and formats the result.
pub struct SearchOrchestrator {
    contact_index: Arc<dyn EntityIndex>,
    company_index: Arc<dyn EntityIndex>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    observer: Arc<dyn SearchObserver>,
    registry: Arc<FilterRegistry>,
    config: OrchestratorConfig,
    cache: RwLock<AHashMap<u64, CacheEntry>>,
}

impl SearchOrchestrator {
    /// Create an orchestrator over the two entity indexes with the built-in
    /// filter catalog.
    pub fn new(contact_index: Arc<dyn EntityIndex>, company_index: Arc<dyn EntityIndex>) -> Self {
        SearchOrchestrator {
            contact_index,
            company_index,
            embedding: None,
            observer: Arc::new(LogObserver),
            registry: Arc::new(FilterRegistry::builtin().clone()),
            config: OrchestratorConfig::default(),
            cache: RwLock::new(AHashMap::new()),
        }
    }

    /// Wire an embedding provider for semantic queries.
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding = Some(provider);
        self
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the filter catalog.
    pub fn with_registry(mut self, registry: Arc<FilterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute one search request end to end.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let request_id = Uuid::new_v4();
        self.emit(
            request_id,
            SearchEventKind::SearchRequested {
                entity: request.entity_type,
                free_text: request.free_text.clone(),
            },
        );

        let cache_key = request.cache_key();
        if let Some(cached) = self.cache_lookup(cache_key) {
            self.emit(request_id, SearchEventKind::CacheHit);
            return Ok(cached);
        }

        let query = self.compile(request, request_id)?;
        let index = self.index_for(request.entity_type);
        let primary_body = query.body();

        // Keep the body that actually produced the hits; debug output must
        // reflect the degraded retry when one ran.
        let (raw, executed_body) = match index.execute(&primary_body) {
            Ok(raw) => {
                self.emit(
                    request_id,
                    SearchEventKind::SearchExecuted {
                        total: raw.total,
                        degraded: false,
                    },
                );
                (raw, primary_body)
            }
            Err(error) if error.is_aggregation_error() => {
                self.emit(
                    request_id,
                    SearchEventKind::AggregationRetry {
                        reason: error.to_string(),
                    },
                );
                let degraded_body = query.without_aggregations().body();
                let raw = index
                    .execute(&degraded_body)
                    .map_err(|retry_error| SearchError::backend(retry_error.to_string()))?;
                self.emit(
                    request_id,
                    SearchEventKind::SearchExecuted {
                        total: raw.total,
                        degraded: true,
                    },
                );
                (raw, degraded_body)
            }
            Err(error) => return Err(error),
        };

        let debug = request.debug.then(|| DebugInfo {
            query: executed_body,
            index: index.read_alias().to_string(),
        });

        let response = ResultFormatter::new().format(request, raw, debug);
        self.cache_store(cache_key, &response);
        Ok(response)
    }

    /// Build the full compiled query for a request.
    pub fn compile(&self, request: &SearchRequest, request_id: Uuid) -> Result<CompiledQuery> {
        let compiler = FilterCompiler::new(&self.registry);
        let resolver = EngineDomainResolver {
            index: self.company_index.as_ref(),
            registry: &self.registry,
            observer: self.observer.as_ref(),
            request_id,
        };

        let mut query = CompiledQuery::new();
        query.root = compiler.compile(&request.filters, request.entity_type, &resolver)?;

        if let Some(text) = &request.free_text {
            let text_query = ScoringClauseBuilder::new().build(request.entity_type, text);
            query.root.add_must(text_query.clause);
            query.min_score = text_query.min_score;
        }

        if let Some(semantic) = &request.semantic_query {
            if let Some(provider) = &self.embedding {
                match provider.generate(semantic) {
                    Ok(vector) => query.root.add_should(Clause::Knn {
                        field: self.config.knn_field.clone(),
                        vector,
                        k: self.config.knn_k,
                        boost: None,
                    }),
                    Err(error) => {
                        // Lexical-only fallback; the request itself never
                        // fails on embedding problems.
                        self.emit(
                            request_id,
                            SearchEventKind::EmbeddingFailed {
                                reason: error.to_string(),
                            },
                        );
                    }
                }
            }
        }

        query.sort = request
            .sort
            .iter()
            .map(|spec| (sortable_field(&spec.field), spec.direction))
            .collect();
        query.aggregations = AggregationBuilder::new(&self.registry)
            .build(request.entity_type, &request.filters);
        query.from = request.offset();
        query.size = request.per_page;
        Ok(query)
    }

    fn index_for(&self, entity: EntityType) -> &dyn EntityIndex {
        match entity {
            EntityType::Contact => self.contact_index.as_ref(),
            EntityType::Company => self.company_index.as_ref(),
        }
    }

    fn emit(&self, request_id: Uuid, kind: SearchEventKind) {
        self.observer.observe(&SearchEvent::new(request_id, kind));
    }

    fn cache_lookup(&self, key: u64) -> Option<SearchResponse> {
        let ttl = self.config.cache_ttl?;
        let cache = self.cache.read();
        let entry = cache.get(&key)?;
        if entry.stored_at.elapsed() <= ttl {
            Some(entry.response.clone())
        } else {
            None
        }
    }

    fn cache_store(&self, key: u64, response: &SearchResponse) {
        let Some(ttl) = self.config.cache_ttl else {
            return;
        };
        let mut cache = self.cache.write();
        // Expired entries piggyback on writes; duplicate concurrent
        // computation is acceptable, corruption is not.
        cache.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        cache.insert(
            key,
            CacheEntry {
                response: response.clone(),
                stored_at: Instant::now(),
            },
        );
    }
}

/// Map a requested sort field to its sortable form.
fn sortable_field(field: &str) -> String {
    if NUMERIC_SORT_FIELDS.contains(&field) {
        field.to_string()
    } else {
        format!("{field}.sort")
    }
}

/// Cross-index resolution against the live company index: compile the
/// company bucket, fetch only domain fields with a large bounded page, and
/// collect the distinct domain set.
struct EngineDomainResolver<'a> {
    index: &'a dyn EntityIndex,
    registry: &'a FilterRegistry,
    observer: &'a dyn SearchObserver,
    request_id: Uuid,
}

impl DomainResolver for EngineDomainResolver<'_> {
    fn resolve_domains(&self, company_filters: &FilterBucket) -> Result<Vec<String>> {
        let compiler = FilterCompiler::new(self.registry);
        let mut query = CompiledQuery::new();
        query.root = compiler.compile_bucket(company_filters, EntityType::Company);
        query.from = 0;
        query.size = DOMAIN_RESOLUTION_LIMIT;
        query.source_fields = Some(resolution_source_fields());

        let raw = self.index.execute(&query.body())?;
        let sources: Vec<_> = raw.hits.into_iter().map(|hit| hit.source).collect();
        let domains = collect_domains(&sources);
        self.observer.observe(&SearchEvent::new(
            self.request_id,
            SearchEventKind::DomainsResolved {
                count: domains.len(),
            },
        ));
        Ok(domains)
    }
}
