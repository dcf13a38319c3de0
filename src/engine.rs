//! Term Resolution Engine
//!
//! Resolves one term: cache lookup, full-term probe, prefix fallback,
//! classification, cache population. Remote failures become an `Error` verdict
//! for that term and are not cached.

use crate::cache::ResolutionCache;
use crate::classifier::{ClassificationInput, MatchClassifier};
use crate::error::{ResolveError, Result};
use crate::prefix::PrefixResolver;
use crate::query_front::{probe, QueryFrontProvider};
use crate::verdict::MatchVerdict;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct TermResolutionEngine {
    provider: Arc<dyn QueryFrontProvider>,
    classifier: MatchClassifier,
    prefix_resolver: PrefixResolver,
    probe_timeout: Duration,
}

impl TermResolutionEngine {
    pub fn new(provider: Arc<dyn QueryFrontProvider>, probe_timeout: Duration) -> Self {
        Self {
            provider,
            classifier: MatchClassifier::new(),
            prefix_resolver: PrefixResolver::new(probe_timeout),
            probe_timeout,
        }
    }

    /// Resolve `term` to a verdict.
    ///
    /// Cancellation is checked on entry and again once a permit is held;
    /// probes already in flight are not interrupted.
    pub async fn resolve(
        &self,
        term: &str,
        cache: &ResolutionCache,
        cancel: &CancellationToken,
        permits: &Semaphore,
    ) -> (String, MatchVerdict) {
        if cancel.is_cancelled() {
            return (term.to_string(), MatchVerdict::cancelled());
        }
        if let Some(verdict) = cache.get(term) {
            debug!("Cache hit for '{}'", term);
            return (term.to_string(), verdict);
        }

        let _permit = match permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("No permit for '{}': {}", term, e);
                return (term.to_string(), MatchVerdict::error(e.to_string()));
            }
        };

        // Another task may have resolved the same term while we waited.
        if let Some(verdict) = cache.get(term) {
            debug!("Cache hit for '{}' after waiting for a permit", term);
            return (term.to_string(), verdict);
        }
        if cancel.is_cancelled() {
            return (term.to_string(), MatchVerdict::cancelled());
        }

        let verdict = match self.resolve_remote(term, cancel).await {
            Ok(verdict) => {
                cache.insert(term, &verdict);
                verdict
            }
            Err(ResolveError::Cancelled) => MatchVerdict::cancelled(),
            Err(e) => {
                warn!("Resolution of '{}' failed: {}", term, e);
                MatchVerdict::error(e.to_string())
            }
        };

        (term.to_string(), verdict)
    }

    async fn resolve_remote(&self, term: &str, cancel: &CancellationToken) -> Result<MatchVerdict> {
        // One session per term, closed when it goes out of scope
        let mut front = self.provider.open().await?;

        let full_probe = probe(front.as_mut(), term, self.probe_timeout).await?;
        if let Some(verdict) = self.classifier.classify_direct(term, &full_probe) {
            return Ok(verdict);
        }

        let prefix = self
            .prefix_resolver
            .find_longest_matching_prefix(term, front.as_mut(), cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let input = ClassificationInput::new(term, &full_probe);
        let verdict = match prefix {
            Some(prefix) => {
                let prefix_probe = probe(front.as_mut(), &prefix, self.probe_timeout).await?;
                self.classifier
                    .classify(&input.with_prefix(&prefix, &prefix_probe))
            }
            None => self.classifier.classify(&input),
        };

        Ok(verdict)
    }
}
