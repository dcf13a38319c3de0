//! HTTP Query Front
//!
//! Talks to a server-rendered catalog search page. The page shows a results
//! summary in `span.page-results` and one table row per record, with the
//! description and notes in `td[data-column=...]` cells and the record id in
//! an `a.view-record` link.

use super::{CandidateRow, QueryFront, QueryFrontProvider, ResultsSummary, NOT_FOUND, RESULTS_MARKER};
use crate::error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

const SUMMARY_SELECTOR: &str = "span.page-results";
const ROW_SELECTOR: &str = "tr";
const DESCRIPTION_SELECTOR: &str = "td[data-column='description']";
const NOTES_SELECTOR: &str = "td[data-column='notes']";
const RECORD_ID_SELECTOR: &str = "a.view-record";

/// Opens HTTP sessions sharing one connection pool
#[derive(Clone)]
pub struct HttpQueryFrontProvider {
    client: Client,
    base_url: String,
}

impl HttpQueryFrontProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ResolveError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QueryFrontProvider for HttpQueryFrontProvider {
    async fn open(&self) -> Result<Box<dyn QueryFront>> {
        Ok(Box::new(HttpQueryFront {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            query: None,
            page: None,
        }))
    }
}

pub struct HttpQueryFront {
    client: Client,
    base_url: String,
    query: Option<String>,
    page: Option<String>,
}

impl HttpQueryFront {
    async fn fetch(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ResolveError::RemoteUnavailable(format!("{}: {}", self.base_url, e)))?;

        if !response.status().is_success() {
            return Err(ResolveError::RemoteUnavailable(format!(
                "{} returned {}",
                self.base_url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ResolveError::RemoteUnavailable(format!("Failed to read page: {}", e)))
    }
}

#[async_trait]
impl QueryFront for HttpQueryFront {
    async fn submit_query(&mut self, text: &str) -> Result<()> {
        self.query = Some(text.to_string());
        self.page = None;
        Ok(())
    }

    async fn await_results(&mut self, timeout: Duration) -> Result<ResultsSummary> {
        let query = self.query.clone().ok_or_else(|| {
            ResolveError::RemoteUnavailable("no query submitted".to_string())
        })?;

        let page = tokio::time::timeout(timeout, self.fetch(&query))
            .await
            .map_err(|_| {
                ResolveError::RemoteTimeout(format!(
                    "no results for '{}' within {:?}",
                    query, timeout
                ))
            })??;

        let raw_text = parse_summary(&page);
        debug!("Results summary for '{}': {}", query, raw_text);
        self.page = Some(page);

        Ok(ResultsSummary {
            has_any_result: raw_text.contains(RESULTS_MARKER),
            raw_text,
        })
    }

    async fn list_candidate_rows(&mut self) -> Result<Vec<CandidateRow>> {
        Ok(self.page.as_deref().map(parse_rows).unwrap_or_default())
    }
}

fn selector(css: &str) -> Selector {
    // Selectors are compile-time constants
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid selector: {}", css))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the results summary, empty when the page has none.
pub fn parse_summary(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&selector(SUMMARY_SELECTOR))
        .next()
        .map(text_of)
        .unwrap_or_default()
}

/// Every row that has a description cell, in page order.
pub fn parse_rows(html: &str) -> Vec<CandidateRow> {
    let document = Html::parse_document(html);
    let description_sel = selector(DESCRIPTION_SELECTOR);
    let notes_sel = selector(NOTES_SELECTOR);
    let id_sel = selector(RECORD_ID_SELECTOR);

    document
        .select(&selector(ROW_SELECTOR))
        .filter_map(|row| {
            let description = row.select(&description_sel).next().map(text_of)?;
            let notes = row.select(&notes_sel).next().map(text_of).unwrap_or_default();
            let record_id = row
                .select(&id_sel)
                .next()
                .map(text_of)
                .unwrap_or_else(|| NOT_FOUND.to_string());
            Some(CandidateRow {
                description,
                notes,
                record_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="main-search"><input class="search-term"></div>
          <span class="page-results"> Displaying search results for: "running shoes" </span>
          <table>
            <tr><th>Description</th><th>Notes</th><th>ID</th></tr>
            <tr>
              <td data-column="description"> Running shoes </td>
              <td data-column="notes">Deleted in 2020</td>
              <td><a class="view-record">025-1234</a></td>
            </tr>
            <tr>
              <td data-column="description">Athletic running shoes, leather</td>
              <td data-column="notes"></td>
            </tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_summary() {
        assert_eq!(
            parse_summary(PAGE),
            "Displaying search results for: \"running shoes\""
        );
        assert_eq!(parse_summary("<html></html>"), "");
    }

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows(PAGE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], CandidateRow::new("Running shoes", "Deleted in 2020", "025-1234"));
        assert_eq!(rows[1].description, "Athletic running shoes, leather");
        assert_eq!(rows[1].record_id, NOT_FOUND);
    }
}
