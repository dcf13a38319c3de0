//! Batch Coordinator
//!
//! Fans a list of terms out to concurrent resolutions bounded by a permit pool,
//! sharing one cancellation token, and collects every outcome in request order.

use crate::cache::ResolutionCache;
use crate::engine::TermResolutionEngine;
use crate::query_front::QueryFrontProvider;
use crate::verdict::MatchVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Delimiter between terms in a free-text term list.
pub const TERM_DELIMITER: char = ';';

/// Split a `;`-separated term list, trimming entries and dropping empty ones.
pub fn split_terms(input: &str) -> Vec<String> {
    input
        .split(TERM_DELIMITER)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub terms: Vec<String>,
    pub concurrency_limit: usize,
    pub cancel: CancellationToken,
}

impl BatchRequest {
    pub fn new(terms: Vec<String>, concurrency_limit: usize) -> Self {
        Self {
            terms,
            concurrency_limit,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermOutcome {
    pub term: String,
    pub verdict: MatchVerdict,
    /// Human-readable form of the verdict
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// One entry per requested term, in request order
    pub results: Vec<TermOutcome>,
    pub elapsed_secs: f64,
    /// Message of the first failed term, in request order
    pub first_error: Option<String>,
}

impl BatchOutcome {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs)
    }

    pub fn verdict(&self, term: &str) -> Option<&MatchVerdict> {
        self.results
            .iter()
            .find(|outcome| outcome.term == term)
            .map(|outcome| &outcome.verdict)
    }

    /// Term to display string. Repeated terms keep their last outcome.
    pub fn as_display_map(&self) -> HashMap<String, String> {
        self.results
            .iter()
            .map(|outcome| (outcome.term.clone(), outcome.display.clone()))
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|o| o.verdict.is_error()).count()
    }
}

pub struct BatchCoordinator {
    engine: Arc<TermResolutionEngine>,
}

impl BatchCoordinator {
    pub fn new(engine: TermResolutionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_provider(provider: Arc<dyn QueryFrontProvider>, probe_timeout: Duration) -> Self {
        Self::new(TermResolutionEngine::new(provider, probe_timeout))
    }

    pub async fn resolve_all(
        &self,
        terms: &[String],
        concurrency_limit: usize,
        cache: &ResolutionCache,
    ) -> BatchOutcome {
        self.run(BatchRequest::new(terms.to_vec(), concurrency_limit), cache)
            .await
    }

    pub async fn run(&self, request: BatchRequest, cache: &ResolutionCache) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let limit = if request.concurrency_limit == 0 {
            warn!("Batch {}: concurrency limit 0, using 1", batch_id);
            1
        } else {
            request.concurrency_limit
        };
        info!(
            "Batch {} started: {} terms, concurrency {}",
            batch_id,
            request.terms.len(),
            limit
        );

        let permits = Arc::new(Semaphore::new(limit));
        let handles: Vec<(String, JoinHandle<(String, MatchVerdict)>)> = request
            .terms
            .iter()
            .map(|term| {
                let engine = Arc::clone(&self.engine);
                let cache = cache.clone();
                let cancel = request.cancel.clone();
                let permits = Arc::clone(&permits);
                let owned_term = term.clone();
                let handle = tokio::spawn(async move {
                    engine.resolve(&owned_term, &cache, &cancel, &permits).await
                });
                (term.clone(), handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut first_error: Option<String> = None;
        for (term, handle) in handles {
            let verdict = match handle.await {
                Ok((_, verdict)) => verdict,
                Err(e) => {
                    warn!("Batch {}: task for '{}' failed: {}", batch_id, term, e);
                    MatchVerdict::error(format!("resolution task failed: {}", e))
                }
            };
            if let MatchVerdict::Error { message } = &verdict {
                first_error.get_or_insert_with(|| message.clone());
            }
            results.push(TermOutcome {
                display: verdict.to_string(),
                term,
                verdict,
            });
        }

        let elapsed = start.elapsed();
        let outcome = BatchOutcome {
            batch_id,
            started_at,
            results,
            elapsed_secs: elapsed.as_secs_f64(),
            first_error,
        };
        info!(
            "Batch {} finished in {:.2}s: {} terms, {} errors",
            batch_id,
            elapsed.as_secs_f64(),
            outcome.results.len(),
            outcome.error_count()
        );
        outcome
    }
}
