//! # Prospector
//!
//! The query-compilation core of a B2B contact/company lookup product.
//!
//! Prospector turns a canonical, entity-agnostic filter DSL (plus an optional
//! free-text query and an optional semantic query) into an engine-native
//! search request, executes it with bounded degradation on partial backend
//! failure, and reshapes the raw hits into a stable response contract.
//!
//! ## Features
//!
//! - Declarative filter registry shared by the compiler and facet builder
//! - Three free-text strategies chosen by input shape (domain literal,
//!   boolean query, general relevance)
//! - Cross-index resolution (company constraints become contact-side
//!   domain filters)
//! - One-shot degraded retry on aggregation-class backend errors

pub mod aggs;
pub mod backend;
pub mod entity;
pub mod error;
pub mod filter;
pub mod format;
pub mod orchestrator;
pub mod query;
pub mod request;
pub mod scoring;
pub mod term;

pub mod prelude {
    pub use crate::backend::{EntityIndex, RawHit, RawHits, SearchObserver};
    pub use crate::entity::EntityType;
    pub use crate::error::{Result, SearchError};
    pub use crate::filter::FilterDsl;
    pub use crate::format::SearchResponse;
    pub use crate::orchestrator::{OrchestratorConfig, SearchOrchestrator};
    pub use crate::request::SearchRequest;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
