//! Prefix Resolver
//!
//! Binary search over word-count prefixes of a term for the longest prefix the
//! catalog still reports results for. This assumes "has any result" is
//! monotonic in prefix length; a search engine with stemming or synonyms can
//! break that, in which case the answer is a matching prefix but not
//! necessarily the longest one.

use crate::error::Result;
use crate::query_front::{probe_summary, QueryFront};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct PrefixResolver {
    probe_timeout: Duration,
}

impl PrefixResolver {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Longest word prefix of `term` with at least one result.
    ///
    /// Returns `Ok(None)` when even the first word finds nothing, or when
    /// cancellation is observed at any point of the search.
    pub async fn find_longest_matching_prefix(
        &self,
        term: &str,
        front: &mut dyn QueryFront,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let words: Vec<&str> = term.split_whitespace().collect();
        let mut lo = 1usize;
        let mut hi = words.len();
        let mut best: Option<String> = None;

        while lo <= hi {
            if cancel.is_cancelled() {
                debug!("Prefix search for '{}' cancelled", term);
                return Ok(None);
            }

            let mid = lo + (hi - lo) / 2;
            let prefix = words[..mid].join(" ");
            let summary = probe_summary(front, &prefix, self.probe_timeout).await?;

            if summary.has_any_result {
                best = Some(prefix);
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }

        if cancel.is_cancelled() {
            debug!("Prefix search for '{}' cancelled", term);
            return Ok(None);
        }
        debug!("Longest matching prefix for '{}': {:?}", term, best);
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::query_front::{CandidateRow, ResultsSummary};
    use async_trait::async_trait;

    /// Reports results for every query of at most `k` words.
    struct PrefixOracle {
        k: usize,
        submitted: String,
        probes: usize,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl PrefixOracle {
        fn new(k: usize) -> Self {
            Self {
                k,
                submitted: String::new(),
                probes: 0,
                cancel_after: None,
            }
        }
    }

    #[async_trait]
    impl QueryFront for PrefixOracle {
        async fn submit_query(&mut self, text: &str) -> Result<()> {
            self.probes += 1;
            self.submitted = text.to_string();
            if let Some((after, token)) = &self.cancel_after {
                if self.probes >= *after {
                    token.cancel();
                }
            }
            Ok(())
        }

        async fn await_results(&mut self, _timeout: Duration) -> Result<ResultsSummary> {
            let has_any_result = self.submitted.split_whitespace().count() <= self.k;
            Ok(ResultsSummary {
                has_any_result,
                raw_text: String::new(),
            })
        }

        async fn list_candidate_rows(&mut self) -> Result<Vec<CandidateRow>> {
            Ok(Vec::new())
        }
    }

    fn term(n: usize) -> String {
        (1..=n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn max_probes(n: usize) -> usize {
        (n as f64).log2().ceil() as usize + 1
    }

    #[tokio::test]
    async fn test_finds_k_word_prefix_within_log_probes() {
        let resolver = PrefixResolver::new(Duration::from_secs(1));
        let cancel = CancellationToken::new();

        for n in 2..=17 {
            for k in 1..n {
                let mut oracle = PrefixOracle::new(k);
                let found = resolver
                    .find_longest_matching_prefix(&term(n), &mut oracle, &cancel)
                    .await
                    .unwrap();
                assert_eq!(found, Some(term(k)), "n={} k={}", n, k);
                assert!(
                    oracle.probes <= max_probes(n),
                    "n={} k={} used {} probes",
                    n,
                    k,
                    oracle.probes
                );
            }
        }
    }

    #[tokio::test]
    async fn test_no_prefix_matches() {
        let resolver = PrefixResolver::new(Duration::from_secs(1));
        let mut oracle = PrefixOracle::new(0);
        let found = resolver
            .find_longest_matching_prefix("alpha beta gamma", &mut oracle, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let resolver = PrefixResolver::new(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut oracle = PrefixOracle::new(3);
        let found = resolver
            .find_longest_matching_prefix("a b c d", &mut oracle, &cancel)
            .await
            .unwrap();
        assert_eq!(found, None);
        assert_eq!(oracle.probes, 0);
    }

    #[tokio::test]
    async fn test_cancelled_mid_search_returns_nothing() {
        let resolver = PrefixResolver::new(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let mut oracle = PrefixOracle::new(7);
        oracle.cancel_after = Some((1, cancel.clone()));
        let found = resolver
            .find_longest_matching_prefix(&term(8), &mut oracle, &cancel)
            .await
            .unwrap();
        assert_eq!(found, None);
        assert_eq!(oracle.probes, 1);
    }

    #[tokio::test]
    async fn test_probe_errors_propagate() {
        struct Down;

        #[async_trait]
        impl QueryFront for Down {
            async fn submit_query(&mut self, text: &str) -> Result<()> {
                Err(ResolveError::RemoteUnavailable(text.to_string()))
            }
            async fn await_results(&mut self, _timeout: Duration) -> Result<ResultsSummary> {
                unreachable!()
            }
            async fn list_candidate_rows(&mut self) -> Result<Vec<CandidateRow>> {
                unreachable!()
            }
        }

        let resolver = PrefixResolver::new(Duration::from_secs(1));
        let result = resolver
            .find_longest_matching_prefix("a b", &mut Down, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ResolveError::RemoteUnavailable(_))));
    }
}
