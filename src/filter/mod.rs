//! Canonical filter DSL, the declarative filter registry, and the compiler
//! that lowers DSL buckets into engine-native filter clauses.

pub mod compiler;
pub mod dsl;
pub mod registry;

pub use self::compiler::FilterCompiler;
pub use self::dsl::{FilterBucket, FilterDsl, FilterValue, LocationFilter, LocationSet};
pub use self::registry::{AggregationKind, FilterRegistry, FilterRegistryEntry, RangeBucket, ValueKind};
