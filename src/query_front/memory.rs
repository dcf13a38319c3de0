//! In-memory catalog
//!
//! Deterministic stand-in for the remote search page. A query matches a record
//! when every normalized query word occurs among the record's description words.

use super::{CandidateRow, QueryFront, QueryFrontProvider, ResultsSummary, RESULTS_MARKER};
use crate::error::{ResolveError, Result};
use crate::normalize::normalized_words;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub record_id: String,
}

impl CatalogRecord {
    pub fn new(description: &str, notes: &str, record_id: &str) -> Self {
        Self {
            description: description.to_string(),
            notes: notes.to_string(),
            record_id: record_id.to_string(),
        }
    }

    fn matches(&self, query_words: &[String]) -> bool {
        if query_words.is_empty() {
            return false;
        }
        let description_words = normalized_words(&self.description);
        query_words.iter().all(|w| description_words.contains(w))
    }
}

struct CatalogState {
    records: Vec<CatalogRecord>,
    latency: Duration,
    summary_overrides: HashMap<String, String>,
    timeouts: HashSet<String>,
    failures: Mutex<HashMap<String, usize>>,
    probes: AtomicUsize,
    active_sessions: AtomicUsize,
    max_active_sessions: AtomicUsize,
}

/// Catalog fake. Builder methods only take effect before the catalog is cloned.
#[derive(Clone)]
pub struct InMemoryCatalog {
    state: Arc<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            state: Arc::new(CatalogState {
                records,
                latency: Duration::ZERO,
                summary_overrides: HashMap::new(),
                timeouts: HashSet::new(),
                failures: Mutex::new(HashMap::new()),
                probes: AtomicUsize::new(0),
                active_sessions: AtomicUsize::new(0),
                max_active_sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Load records from a JSON array of `{description, notes, record_id}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<CatalogRecord> = serde_json::from_str(&content)?;
        Ok(Self::new(records))
    }

    fn state_mut(&mut self) -> Option<&mut CatalogState> {
        Arc::get_mut(&mut self.state)
    }

    /// Delay applied before every results summary.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        if let Some(state) = self.state_mut() {
            state.latency = latency;
        }
        self
    }

    /// Replace the summary text shown for one exact query.
    pub fn with_summary(mut self, query: &str, summary: &str) -> Self {
        if let Some(state) = self.state_mut() {
            state.summary_overrides.insert(query.to_string(), summary.to_string());
        }
        self
    }

    /// The results summary for this query never arrives.
    pub fn with_timeout(mut self, query: &str) -> Self {
        if let Some(state) = self.state_mut() {
            state.timeouts.insert(query.to_string());
        }
        self
    }

    /// Submitting this query fails as unavailable the next `times` times.
    pub fn with_failures(mut self, query: &str, times: usize) -> Self {
        if let Some(state) = self.state_mut() {
            state
                .failures
                .get_mut()
                .unwrap_or_else(|e| e.into_inner())
                .insert(query.to_string(), times);
        }
        self
    }

    /// Number of queries submitted so far.
    pub fn probe_count(&self) -> usize {
        self.state.probes.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were open at the same time.
    pub fn max_active_sessions(&self) -> usize {
        self.state.max_active_sessions.load(Ordering::SeqCst)
    }

    pub fn active_sessions(&self) -> usize {
        self.state.active_sessions.load(Ordering::SeqCst)
    }

    fn search(&self, query: &str) -> Vec<CandidateRow> {
        let query_words = normalized_words(query);
        self.state
            .records
            .iter()
            .filter(|r| r.matches(&query_words))
            .map(|r| CandidateRow::new(&r.description, &r.notes, &r.record_id))
            .collect()
    }

    fn take_failure(&self, query: &str) -> bool {
        let mut failures = self
            .state
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match failures.get_mut(query) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl QueryFrontProvider for InMemoryCatalog {
    async fn open(&self) -> Result<Box<dyn QueryFront>> {
        let active = self.state.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_active_sessions
            .fetch_max(active, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            catalog: self.clone(),
            submitted: None,
        }))
    }
}

/// One open session; closing it (drop) frees the slot.
struct InMemorySession {
    catalog: InMemoryCatalog,
    submitted: Option<String>,
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.catalog
            .state
            .active_sessions
            .fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryFront for InMemorySession {
    async fn submit_query(&mut self, text: &str) -> Result<()> {
        self.catalog.state.probes.fetch_add(1, Ordering::SeqCst);
        if self.catalog.take_failure(text) {
            self.submitted = None;
            return Err(ResolveError::RemoteUnavailable(format!(
                "catalog refused query '{}'",
                text
            )));
        }
        self.submitted = Some(text.to_string());
        Ok(())
    }

    async fn await_results(&mut self, timeout: Duration) -> Result<ResultsSummary> {
        let query = self.submitted.clone().ok_or_else(|| {
            ResolveError::RemoteUnavailable("no query submitted".to_string())
        })?;
        let state = &self.catalog.state;

        if state.timeouts.contains(&query) {
            tokio::time::sleep(timeout).await;
            return Err(ResolveError::RemoteTimeout(format!(
                "no results for '{}' within {:?}",
                query, timeout
            )));
        }
        if !state.latency.is_zero() {
            if state.latency > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ResolveError::RemoteTimeout(format!(
                    "no results for '{}' within {:?}",
                    query, timeout
                )));
            }
            tokio::time::sleep(state.latency).await;
        }

        let raw_text = match state.summary_overrides.get(&query) {
            Some(text) => text.clone(),
            None if self.catalog.search(&query).is_empty() => "No results found".to_string(),
            None => format!("Displaying search results for: \"{}\"", query),
        };

        Ok(ResultsSummary {
            has_any_result: raw_text.contains(RESULTS_MARKER),
            raw_text,
        })
    }

    async fn list_candidate_rows(&mut self) -> Result<Vec<CandidateRow>> {
        Ok(self
            .submitted
            .as_deref()
            .map(|q| self.catalog.search(q))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_front::probe;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(vec![
            CatalogRecord::new("Athletic running gear", "", "001"),
            CatalogRecord::new("Running shoes", "Deleted 2021", "002"),
        ])
    }

    #[tokio::test]
    async fn test_search_matches_all_words() {
        let catalog = catalog();
        let mut session = catalog.open().await.unwrap();

        let result = probe(session.as_mut(), "running", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(result.has_any_result);
        assert_eq!(result.candidate_rows.len(), 2);
        assert_eq!(
            result.raw_summary_text,
            "Displaying search results for: \"running\""
        );

        let result = probe(session.as_mut(), "running boots", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!result.has_any_result);
        assert!(result.candidate_rows.is_empty());
        assert_eq!(catalog.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_sessions_are_tracked() {
        let catalog = catalog();
        let first = catalog.open().await.unwrap();
        let second = catalog.open().await.unwrap();
        assert_eq!(catalog.active_sessions(), 2);
        drop(first);
        drop(second);
        assert_eq!(catalog.active_sessions(), 0);
        assert_eq!(catalog.max_active_sessions(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_and_timeouts() {
        let catalog = catalog()
            .with_failures("running", 1)
            .with_timeout("gear");
        let mut session = catalog.open().await.unwrap();

        let err = probe(session.as_mut(), "running", Duration::from_secs(1)).await;
        assert!(matches!(err, Err(ResolveError::RemoteUnavailable(_))));
        assert!(probe(session.as_mut(), "running", Duration::from_secs(1))
            .await
            .is_ok());

        let err = probe(session.as_mut(), "gear", Duration::from_millis(10)).await;
        assert!(matches!(err, Err(ResolveError::RemoteTimeout(_))));
    }
}
