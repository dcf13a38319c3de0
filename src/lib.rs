pub mod batch;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod prefix;
pub mod query_front;
pub mod verdict;

pub use batch::{split_terms, BatchCoordinator, BatchOutcome, BatchRequest, TermOutcome};
pub use cache::ResolutionCache;
pub use classifier::{ClassificationInput, MatchClassifier, Rule};
pub use config::ResolverConfig;
pub use engine::TermResolutionEngine;
pub use error::{ResolveError, Result};
pub use normalize::{is_subsequence, normalize};
pub use prefix::PrefixResolver;
pub use query_front::{
    CandidateRow, CatalogRecord, HttpQueryFrontProvider, InMemoryCatalog, ProbeResult,
    QueryFront, QueryFrontProvider, ResultsSummary,
};
pub use verdict::MatchVerdict;
