//! Query Front - the interactive search surface of the remote catalog
//!
//! The catalog only supports literal keyword search. A session submits one query
//! at a time, waits for the results summary, and can then enumerate the
//! candidate rows currently on display.

pub mod http;
pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub use http::{HttpQueryFront, HttpQueryFrontProvider};
pub use memory::{CatalogRecord, InMemoryCatalog};

/// Record id reported when a row carries no id link.
pub const NOT_FOUND: &str = "Not found";

/// Summary text contains this whenever the catalog found anything.
pub const RESULTS_MARKER: &str = "Displaying";

/// One record surfaced by a probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub record_id: String,
}

impl CandidateRow {
    pub fn new(
        description: impl Into<String>,
        notes: impl Into<String>,
        record_id: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            notes: notes.into(),
            record_id: record_id.into(),
        }
    }
}

/// Results-ready signal payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsSummary {
    pub has_any_result: bool,
    pub raw_text: String,
}

/// Outcome of one literal query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResult {
    pub has_any_result: bool,
    pub raw_summary_text: String,
    pub candidate_rows: Vec<CandidateRow>,
}

/// One interactive session against the catalog search page
#[async_trait]
pub trait QueryFront: Send {
    /// Submit a literal query string, replacing whatever is on display.
    async fn submit_query(&mut self, text: &str) -> Result<()>;

    /// Wait for the results summary of the last submitted query.
    /// Fails with `RemoteTimeout` when nothing arrives within `timeout`.
    async fn await_results(&mut self, timeout: Duration) -> Result<ResultsSummary>;

    /// Rows currently on display, in page order.
    async fn list_candidate_rows(&mut self) -> Result<Vec<CandidateRow>>;
}

/// Opens sessions; one session is used per resolved term.
#[async_trait]
pub trait QueryFrontProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn QueryFront>>;
}

/// Run one full probe: submit, wait, list rows.
pub async fn probe(
    front: &mut dyn QueryFront,
    text: &str,
    timeout: Duration,
) -> Result<ProbeResult> {
    front.submit_query(text).await?;
    let summary = front.await_results(timeout).await?;
    let candidate_rows = front.list_candidate_rows().await?;
    debug!(
        "Probe '{}': has_any_result={}, {} rows",
        text,
        summary.has_any_result,
        candidate_rows.len()
    );

    Ok(ProbeResult {
        has_any_result: summary.has_any_result,
        raw_summary_text: summary.raw_text,
        candidate_rows,
    })
}

/// Probe that only reads the summary; enough for the prefix search.
pub async fn probe_summary(
    front: &mut dyn QueryFront,
    text: &str,
    timeout: Duration,
) -> Result<ResultsSummary> {
    front.submit_query(text).await?;
    let summary = front.await_results(timeout).await?;
    debug!("Summary probe '{}': has_any_result={}", text, summary.has_any_result);
    Ok(summary)
}
